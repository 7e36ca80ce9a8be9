//! Camera control and frame scheduling for the presentation layer

use glam::{Affine2, UVec2, Vec2};
use tracing::trace;

use crate::device::{RenderDevice, SurfaceId};
use crate::schedule::FrameWork;
use crate::tiles::TileAddress;

use super::PaintingPipeline;

/// A materialized tile inside the viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleTile {
    pub address: TileAddress,
    pub surface: SurfaceId,
    /// Maps tile-local pixels to screen pixels
    pub tile_to_screen: Affine2,
}

impl<D: RenderDevice> PaintingPipeline<D> {
    /// Move the camera by a world-space delta
    pub fn pan(&mut self, delta: Vec2) {
        self.viewport.camera_mut().move_by(delta);
        self.request_redraw();
        self.request_gui_update();
    }

    /// Multiply the zoom by `factor`, keeping the world position `anchor` fixed on screen
    pub fn zoom_at(&mut self, factor: f32, anchor: Vec2) {
        self.viewport.camera_mut().zoom_at(factor, anchor);
        self.request_redraw();
        self.request_gui_update();
    }

    /// Zoom by whole wheel steps: each step halves (positive) or doubles (negative) the zoom
    pub fn zoom_steps(&mut self, steps: i32, anchor: Vec2) {
        self.zoom_at(2f32.powi(-steps), anchor);
    }

    /// Schedule a viewport resize; applied on the next tick
    pub fn resize(&mut self, width: u32, height: u32) {
        self.scheduler.request_resize(UVec2::new(width, height));
    }

    /// Ask for the visible tiles to be redrawn on the next tick
    pub fn request_redraw(&mut self) {
        self.scheduler.request_redraw();
    }

    /// Ask for the host GUI to be refreshed on the next tick
    pub fn request_gui_update(&mut self) {
        self.scheduler.request_gui_update();
    }

    /// Whether the next tick has work to hand out
    pub fn has_pending_frame(&self) -> bool {
        self.scheduler.has_pending()
    }

    /// Drain the work requested since the previous tick, applying any pending resize
    pub fn tick(&mut self) -> FrameWork {
        let work = self.scheduler.tick();
        if let Some(size) = work.resize {
            self.viewport.resize(size.x, size.y);
        }
        if !work.is_idle() {
            trace!("Frame tick: {:?}", work);
        }
        work
    }

    /// Materialized tiles intersecting the viewport, in row-major order
    pub fn visible_tiles(&self) -> Vec<VisibleTile> {
        let bounds = self.viewport.current_viewport_bounds_in_world_space();
        let world_to_screen = *self.viewport.world_to_screen_transform().forward();
        let tile_size = self.canvas.tile_size();
        self.canvas
            .tiles_intersecting(&bounds)
            .map(|(address, id)| VisibleTile {
                address,
                surface: self.canvas.pool().surface(id),
                tile_to_screen: world_to_screen
                    * Affine2::from_translation(address.origin(tile_size)),
            })
            .collect()
    }
}
