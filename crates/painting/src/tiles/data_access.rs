//! Pixel addressing and region queries

use glam::{UVec2, Vec2};

use super::{SparseCanvas, TileAddress, TileId};
use crate::bounds::{BoundingBox, TileRange};
use crate::device::RenderDevice;
use crate::types::Colour;

impl SparseCanvas {
    /// Split a world position into its tile address and position inside the tile.
    ///
    /// `0 <= local < tile_size` holds on both axes, including for negative positions.
    pub fn address_of(&self, world: Vec2) -> (TileAddress, Vec2) {
        let size = self.tile_size as f32;
        let (x, local_x) = split_axis(world.x, size);
        let (y, local_y) = split_axis(world.y, size);
        (TileAddress::new(x, y), Vec2::new(local_x, local_y))
    }

    /// Tile address and integer pixel inside the tile for a world position
    pub fn pixel_address(&self, world: Vec2) -> (TileAddress, UVec2) {
        let (address, local) = self.address_of(world);
        let max = self.tile_size - 1;
        let pixel = local.floor().as_uvec2().min(UVec2::splat(max));
        (address, pixel)
    }

    /// Stored (premultiplied) colour at a world position.
    ///
    /// Absent tiles read as transparent; reading never materializes a tile.
    pub fn get_pixel(&self, device: &dyn RenderDevice, world: Vec2) -> Colour {
        let (address, pixel) = self.pixel_address(world);
        match self.surface_at(address) {
            Some(surface) => device.read_pixel(surface, pixel.x, pixel.y),
            None => Colour::TRANSPARENT,
        }
    }

    /// Overwrite the stored (premultiplied) colour at a world position.
    ///
    /// The owning tile is materialized first; if the pool is exhausted the
    /// write is dropped.
    pub fn set_pixel(&mut self, device: &mut dyn RenderDevice, world: Vec2, colour: Colour) {
        let (address, pixel) = self.pixel_address(world);
        let Some(id) = self.materialize(device, address) else {
            return;
        };
        device.write_pixel(self.pool.surface(id), pixel.x, pixel.y, colour);
        self.mark_dirty(address);
    }

    /// Tile addresses touched by a world-space box, rounded outward
    pub fn tile_range_for_bounds(&self, bounds: &BoundingBox) -> TileRange {
        bounds.scaled(1.0 / self.tile_size as f32).to_integer_range()
    }

    /// Materialized tiles inside the tile range of `bounds`, in row-major order.
    ///
    /// The iterator borrows the canvas and can be cloned to restart it.
    pub fn tiles_intersecting(
        &self,
        bounds: &BoundingBox,
    ) -> impl Iterator<Item = (TileAddress, TileId)> + Clone + '_ {
        let range = self.tile_range_for_bounds(bounds);
        let entries = (!range.is_empty()).then(|| {
            let first = TileAddress::new(range.min.x, range.min.y);
            let last = TileAddress::new(range.max.x - 1, range.max.y - 1);
            self.tiles.range(first..=last)
        });
        entries
            .into_iter()
            .flatten()
            .filter(move |(address, _)| range.contains(address.as_ivec2()))
            .map(|(address, id)| (*address, *id))
    }
}

/// Floor-divide one coordinate, keeping the remainder in `[0, size)` even
/// when rounding would push it onto the upper edge
///
/// Works in `f64` so the remainder stays exact for far-away positions. Cells
/// beyond the `i32` range saturate.
fn split_axis(value: f32, size: f32) -> (i32, f32) {
    let (value, size_f64) = (f64::from(value), f64::from(size));
    let mut cell = (value / size_f64).floor();
    let mut local = (value - cell * size_f64) as f32;
    if local >= size {
        cell += 1.0;
        local = 0.0;
    }
    (cell as i32, local.clamp(0.0, size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SoftwareDevice;

    fn canvas(device: &mut SoftwareDevice, capacity: usize) -> SparseCanvas {
        SparseCanvas::new(device, 64, capacity)
    }

    #[test]
    fn test_address_of_examples() {
        let mut device = SoftwareDevice::new();
        let canvas = canvas(&mut device, 1);
        assert_eq!(canvas.address_of(Vec2::new(0.0, 0.0)), (TileAddress::new(0, 0), Vec2::ZERO));
        assert_eq!(
            canvas.address_of(Vec2::new(-1.0, 64.0)),
            (TileAddress::new(-1, 1), Vec2::new(63.0, 0.0))
        );
        assert_eq!(
            canvas.address_of(Vec2::new(130.5, -128.0)),
            (TileAddress::new(2, -2), Vec2::new(2.5, 0.0))
        );
    }

    #[test]
    fn test_address_round_trip() {
        let mut device = SoftwareDevice::new();
        let canvas = canvas(&mut device, 1);
        let samples = [
            -1.0e-7, -0.5, -63.99, -64.0, -64.01, 0.0, 1.0e-7, 63.999_99, 64.0, 1000.25, -4097.75,
            123_456.8, -98_765.4,
        ];
        for &x in &samples {
            for &y in &samples {
                let world = Vec2::new(x, y);
                let (address, local) = canvas.address_of(world);
                assert!(local.x >= 0.0 && local.x < 64.0, "{world} -> {local}");
                assert!(local.y >= 0.0 && local.y < 64.0, "{world} -> {local}");
                let back = address.origin(64) + local;
                let tolerance = 1e-3 * world.abs().max_element().max(1.0);
                assert!((back - world).abs().max_element() <= tolerance, "{world} -> {back}");
            }
        }
    }

    #[test]
    fn test_pixels_far_from_origin() {
        let mut device = SoftwareDevice::new();
        let mut canvas = canvas(&mut device, 4);
        for world in [Vec2::new(3.0e9, 0.0), Vec2::new(-3.0e9, 5.0), Vec2::new(-2.5e9, 5.0)] {
            canvas.set_pixel(&mut device, world, Colour::WHITE);
            assert_eq!(canvas.get_pixel(&device, world), Colour::WHITE, "{world}");
        }
        assert_eq!(canvas.len(), 3);

        let (address, local) = canvas.address_of(Vec2::new(3.0e9, 0.0));
        assert_eq!(address, TileAddress::new(46_875_000, 0));
        assert_eq!(local, Vec2::ZERO);
        assert_eq!(address.origin(64), Vec2::new(3.0e9, 0.0));

        // Beyond the i32 address range the address saturates instead of wrapping
        let world = Vec2::new(1.0e12, 0.0);
        assert_eq!(canvas.address_of(world).0.x, i32::MAX);
        canvas.set_pixel(&mut device, world, Colour::WHITE);
        assert_eq!(canvas.get_pixel(&device, world), Colour::WHITE);
    }

    #[test]
    fn test_get_pixel_never_materializes() {
        let mut device = SoftwareDevice::new();
        let canvas = canvas(&mut device, 4);
        assert_eq!(canvas.get_pixel(&device, Vec2::new(-500.0, 12.0)), Colour::TRANSPARENT);
        assert!(canvas.is_empty());
        assert_eq!(canvas.pool().occupied_count(), 0);
    }

    #[test]
    fn test_set_then_get_pixel_negative_space() {
        let mut device = SoftwareDevice::new();
        let mut canvas = canvas(&mut device, 4);
        let world = Vec2::new(-0.5, -63.5);
        canvas.set_pixel(&mut device, world, Colour::rgb(1, 2, 3));
        assert_eq!(canvas.get_pixel(&device, world), Colour::rgb(1, 2, 3));
        assert!(canvas.contains(TileAddress::new(-1, -1)));
        // Neighbouring pixel in the same tile untouched
        assert_eq!(canvas.get_pixel(&device, Vec2::new(-1.5, -63.5)), Colour::TRANSPARENT);
    }

    #[test]
    fn test_set_pixel_dropped_on_exhaustion() {
        let mut device = SoftwareDevice::new();
        let mut canvas = canvas(&mut device, 1);
        canvas.set_pixel(&mut device, Vec2::new(1.0, 1.0), Colour::WHITE);
        canvas.set_pixel(&mut device, Vec2::new(100.0, 1.0), Colour::WHITE);
        assert_eq!(canvas.len(), 1);
        assert_eq!(canvas.get_pixel(&device, Vec2::new(100.0, 1.0)), Colour::TRANSPARENT);
    }

    #[test]
    fn test_tile_range_for_bounds() {
        let mut device = SoftwareDevice::new();
        let canvas = canvas(&mut device, 1);
        let range = canvas.tile_range_for_bounds(&BoundingBox::new(-10.0, 60.0, 80.0, 10.0));
        assert_eq!((range.min.x, range.min.y, range.max.x, range.max.y), (-1, 0, 2, 2));

        // Exactly one tile
        let range = canvas.tile_range_for_bounds(&BoundingBox::new(0.0, 0.0, 64.0, 64.0));
        assert_eq!(range.len(), 1);

        assert!(canvas.tile_range_for_bounds(&BoundingBox::Empty).is_empty());
    }

    #[test]
    fn test_tile_range_covers_every_touched_tile() {
        let mut device = SoftwareDevice::new();
        let canvas = canvas(&mut device, 1);
        for i in 0..50 {
            let x = -200.0 + i as f32 * 13.7;
            let y = 150.0 - i as f32 * 9.3;
            let w = (i % 9) as f32 * 17.1;
            let h = (i % 4) as f32 * 41.3;
            let bounds = BoundingBox::new(x, y, w, h);
            let range = canvas.tile_range_for_bounds(&bounds);
            for sy in 0..10 {
                for sx in 0..10 {
                    let p = Vec2::new(x + w * sx as f32 / 10.0, y + h * sy as f32 / 10.0);
                    let (address, _) = canvas.address_of(p);
                    assert!(range.contains(address.as_ivec2()), "{bounds:?} missed {address}");
                }
            }
        }
    }

    #[test]
    fn test_tiles_intersecting_only_existing() {
        let mut device = SoftwareDevice::new();
        let mut canvas = canvas(&mut device, 8);
        for address in [
            TileAddress::new(0, 0),
            TileAddress::new(3, 0),
            TileAddress::new(-1, 1),
            TileAddress::new(1, 1),
            TileAddress::new(0, 5),
        ] {
            canvas.materialize(&mut device, address);
        }

        let view = BoundingBox::new(-64.0, 0.0, 192.0, 128.0);
        let found: Vec<_> = canvas.tiles_intersecting(&view).map(|(a, _)| a).collect();
        assert_eq!(
            found,
            vec![TileAddress::new(0, 0), TileAddress::new(-1, 1), TileAddress::new(1, 1)]
        );

        // Restartable
        let iter = canvas.tiles_intersecting(&view);
        assert_eq!(iter.clone().count(), 3);
        assert_eq!(iter.count(), 3);

        assert_eq!(canvas.tiles_intersecting(&BoundingBox::Empty).count(), 0);
    }
}
