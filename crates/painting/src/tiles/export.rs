//! Compositing tiles into a flat image and chunking an image into tiles

use image::RgbaImage;
use tracing::debug;

use super::{SparseCanvas, TileAddress};
use crate::device::RenderDevice;
use crate::types::Colour;

impl SparseCanvas {
    /// Composite every tile into one image covering the canvas bounds.
    ///
    /// Each tile lands at `address × tile_size − bounds.origin`. Output pixels
    /// are straight (unpremultiplied) RGBA. Returns `None` for an empty canvas.
    pub fn export_image(&self, device: &dyn RenderDevice) -> Option<RgbaImage> {
        self.bounds.rect()?;
        // Tiles are only released all at once, so the address span matches the
        // bounds. Measuring in addresses keeps offsets exact far from the origin.
        let first_x = i64::from(self.tiles.keys().map(|a| a.x).min()?);
        let first_y = i64::from(self.tiles.keys().map(|a| a.y).min()?);
        let last_x = i64::from(self.tiles.keys().map(|a| a.x).max()?);
        let last_y = i64::from(self.tiles.keys().map(|a| a.y).max()?);

        let size = self.tile_size as usize;
        let width = u32::try_from((last_x - first_x + 1) as usize * size).ok()?;
        let height = u32::try_from((last_y - first_y + 1) as usize * size).ok()?;

        let mut buffer = vec![Colour::TRANSPARENT; width as usize * height as usize];
        for (address, id) in self.iter() {
            let pixels = device.read_surface(self.pool.surface(id));
            let offset_x = (i64::from(address.x) - first_x) as usize * size;
            let offset_y = (i64::from(address.y) - first_y) as usize * size;
            for (row, line) in pixels.chunks_exact(size).enumerate() {
                let start = (offset_y + row) * width as usize + offset_x;
                for (dst, src) in buffer[start..start + size].iter_mut().zip(line) {
                    *dst = src.unpremultiplied();
                }
            }
        }

        debug!("Exported {} tiles into {}x{} image", self.tiles.len(), width, height);
        RgbaImage::from_raw(width, height, bytemuck::cast_slice(buffer.as_slice()).to_vec())
    }

    /// Chunk a straight-alpha image into tiles, with its top-left pixel at world `(0, 0)`.
    ///
    /// Fully transparent blocks are skipped. Blocks whose tile cannot be
    /// materialized are dropped. Returns the number of tiles written.
    pub fn import_image(&mut self, device: &mut dyn RenderDevice, image: &RgbaImage) -> usize {
        let size = self.tile_size;
        let pixels: &[Colour] = bytemuck::cast_slice(image.as_raw().as_slice());
        let (width, height) = image.dimensions();

        let mut written = 0;
        for ty in 0..height.div_ceil(size) {
            for tx in 0..width.div_ceil(size) {
                let mut block = vec![Colour::TRANSPARENT; (size * size) as usize];
                let mut opaque = false;
                for y in 0..size.min(height - ty * size) {
                    for x in 0..size.min(width - tx * size) {
                        let src = pixels[((ty * size + y) * width + tx * size + x) as usize];
                        if src.a > 0 {
                            block[(y * size + x) as usize] = src.premultiplied();
                            opaque = true;
                        }
                    }
                }
                if !opaque {
                    continue;
                }

                let address = TileAddress::new(tx as i32, ty as i32);
                let Some(id) = self.materialize(device, address) else {
                    continue;
                };
                match device.write_surface(self.pool.surface(id), &block) {
                    Ok(()) => {
                        self.mark_dirty(address);
                        written += 1;
                    }
                    Err(e) => debug!("Import of tile {} failed: {}", address, e),
                }
            }
        }

        debug!("Imported {}x{} image into {} tiles", width, height, written);
        written
    }
}
