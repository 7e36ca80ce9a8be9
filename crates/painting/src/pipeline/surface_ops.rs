//! Surface operations for the painting pipeline

use glam::Vec2;
use image::RgbaImage;
use tracing::debug;

use crate::device::RenderDevice;
use crate::tiles::TileAddress;
use crate::types::Colour;

use super::PaintingPipeline;

impl<D: RenderDevice> PaintingPipeline<D> {
    /// Read the straight-alpha colour under a world position
    pub fn colour_at(&self, position: Vec2) -> Colour {
        self.canvas.get_pixel(&self.device, position).unpremultiplied()
    }

    /// Colour picker: make the colour under a world position the paint colour
    ///
    /// Empty canvas reads as transparent. Returns the new paint colour.
    pub fn pick_colour(&mut self, position: Vec2) -> Colour {
        self.set_colour(self.colour_at(position));
        self.context.colour
    }

    /// Take dirty tiles for presentation upload
    ///
    /// Returns the addresses modified since the last call. The dirty set is cleared.
    pub fn take_dirty_tiles(&mut self) -> Vec<TileAddress> {
        self.canvas.take_dirty_tiles()
    }

    /// Check if there are any dirty tiles
    pub fn has_dirty_tiles(&self) -> bool {
        self.canvas.has_dirty_tiles()
    }

    /// Composite the whole canvas into one straight-alpha image
    ///
    /// The image covers the cumulative canvas bounds; its pixel `(0, 0)` is
    /// the world position `bounds.min()`. Returns `None` for an empty canvas.
    pub fn export_image(&self) -> Option<RgbaImage> {
        self.canvas.export_image(&self.device)
    }

    /// Replace the canvas with an image whose top-left pixel lands on world `(0, 0)`
    ///
    /// Any active stroke is discarded and the camera is reset. Returns the
    /// number of tiles written.
    pub fn import_image(&mut self, image: &RgbaImage) -> usize {
        self.reset();
        self.canvas.import_image(&mut self.device, image)
    }

    /// Start over with an empty canvas and a default camera
    pub fn reset(&mut self) {
        if self.sampler.is_active() {
            debug!("reset: discarding active stroke");
            self.sampler.finish();
        }
        self.canvas.reset();
        *self.viewport.camera_mut() = Default::default();
        self.scheduler.request_redraw();
        self.scheduler.request_gui_update();
    }
}
