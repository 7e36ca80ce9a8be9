//! Complete painting pipeline
//!
//! This module connects the pieces of the storage engine:
//! - Input handling (world-space pointer positions from the host)
//! - Stroke sampler (dab generation)
//! - Tile rasterizer (hazard-safe dab application)
//! - Sparse canvas (tile storage, export, dirty tracking)
//! - Viewport and frame scheduling for the presentation layer
//!
//! Everything runs on the host's single UI thread; nothing here blocks.

mod stroke;
mod surface_ops;
mod view;

use std::collections::BTreeSet;

use tessera_config::{EngineConfig, StrokeConfig};

use crate::brush::{Brush, PaintContext};
use crate::device::{ProgramCache, RenderDevice, SoftwareDevice};
use crate::rasterizer::TileRasterizer;
use crate::schedule::FrameScheduler;
use crate::stroke::{StrokeSampler, XorShiftJitter};
use crate::tiles::SparseCanvas;
use crate::transform::Viewport;
use crate::types::{BlendMode, Colour};

pub use stroke::StrokeProgress;
pub use view::VisibleTile;

/// Seed offset separating brush-level jitter from stroke-level jitter
const BRUSH_JITTER_STREAM: u64 = 0xB705_4A11;

/// Number of colour levels when no quantisation is wanted
pub const FULL_COLOUR_LEVELS: u32 = 256;

/// Complete painting pipeline for one canvas
///
/// This struct manages the full painting workflow:
/// 1. Input comes in via `begin_stroke`, `stroke_to`, `end_stroke`
/// 2. The stroke sampler turns the path into evenly spaced dabs
/// 3. The rasterizer blends each dab into the tiles it overlaps
/// 4. Touched tiles are marked dirty and a redraw is requested
/// 5. The host drains frame work with `tick` and draws `visible_tiles`
pub struct PaintingPipeline<D: RenderDevice = SoftwareDevice> {
    /// Device owning every tile surface and brush program
    pub(crate) device: D,
    /// Compiled brush programs, looked up by variant name
    pub(crate) programs: ProgramCache,
    /// Tile storage
    pub(crate) canvas: SparseCanvas,
    /// Path to dab conversion for the active stroke
    pub(crate) sampler: StrokeSampler,
    /// Dab application with its own scratch surface
    pub(crate) rasterizer: TileRasterizer,
    /// Current brush, colour, and blend settings
    pub(crate) context: PaintContext,
    /// Spacing and jitter settings applied when a stroke begins
    pub(crate) stroke_config: StrokeConfig,
    /// Colour quantisation applied to the paint colour
    pub(crate) colour_levels: u32,
    /// Presentation viewport and camera
    pub(crate) viewport: Viewport,
    /// Coalesced frame work
    pub(crate) scheduler: FrameScheduler,
    /// Brush programs already reported missing, to warn once per name
    pub(crate) missing_programs: BTreeSet<String>,
}

impl PaintingPipeline<SoftwareDevice> {
    /// Create a pipeline on a CPU device with every brush program compiled
    pub fn new(config: &EngineConfig) -> Self {
        let mut device = SoftwareDevice::new();
        let programs = device.compile_brush_programs();
        Self::with_device(device, programs, config)
    }
}

impl<D: RenderDevice> PaintingPipeline<D> {
    /// Create a pipeline on an existing device with its compiled programs
    pub fn with_device(mut device: D, programs: ProgramCache, config: &EngineConfig) -> Self {
        let canvas = SparseCanvas::from_config(&mut device, &config.canvas);
        let rasterizer = TileRasterizer::new(&mut device, config.canvas.tile_size).with_jitter_source(
            Box::new(XorShiftJitter::new(config.stroke.jitter_seed ^ BRUSH_JITTER_STREAM)),
        );
        let context = PaintContext {
            brush_jitter: config.stroke.brush_jitter,
            ..PaintContext::default()
        };

        let mut scheduler = FrameScheduler::new();
        scheduler.request_redraw();
        scheduler.request_gui_update();

        Self {
            device,
            programs,
            canvas,
            sampler: StrokeSampler::from_config(&config.stroke),
            rasterizer,
            context,
            stroke_config: config.stroke,
            colour_levels: FULL_COLOUR_LEVELS,
            viewport: Viewport::new(config.display.width, config.display.height),
            scheduler,
            missing_programs: BTreeSet::new(),
        }
    }

    /// Get the canvas
    pub fn canvas(&self) -> &SparseCanvas {
        &self.canvas
    }

    /// Get the device
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Get the device mutably, e.g. to upload or present tiles
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Get the compiled brush programs
    pub fn programs(&self) -> &ProgramCache {
        &self.programs
    }

    /// Replace the compiled brush programs
    pub fn set_programs(&mut self, programs: ProgramCache) {
        self.programs = programs;
        self.missing_programs.clear();
    }

    /// Get the current painting context
    pub fn context(&self) -> &PaintContext {
        &self.context
    }

    /// Replace the painting context; the colour is quantised to the current levels
    pub fn set_context(&mut self, context: PaintContext) {
        self.context = context;
        self.set_colour(context.colour);
    }

    /// Set the brush; takes effect from the next stroke's spacing and the next dab's shape
    pub fn set_brush(&mut self, brush: Brush) {
        self.context.brush = brush;
        self.scheduler.request_gui_update();
    }

    /// Get the current brush
    pub fn brush(&self) -> &Brush {
        &self.context.brush
    }

    /// Set the paint colour (straight alpha), quantised to the current levels
    pub fn set_colour(&mut self, colour: Colour) {
        self.context.colour = colour.constrain_levels(self.colour_levels);
        self.scheduler.request_gui_update();
    }

    /// Get the paint colour
    pub fn colour(&self) -> Colour {
        self.context.colour
    }

    /// Set the number of levels per channel the paint colour is quantised to
    pub fn set_colour_levels(&mut self, levels: u32) {
        self.colour_levels = levels.clamp(2, FULL_COLOUR_LEVELS);
        self.set_colour(self.context.colour);
    }

    pub fn colour_levels(&self) -> u32 {
        self.colour_levels
    }

    /// Set the blend mode
    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.context.blend_mode = mode;
        self.scheduler.request_gui_update();
    }

    /// Get the blend mode
    pub fn blend_mode(&self) -> BlendMode {
        self.context.blend_mode
    }

    /// Get the stroke settings
    pub fn stroke_config(&self) -> &StrokeConfig {
        &self.stroke_config
    }

    /// Replace the stroke settings; takes effect from the next stroke
    pub fn set_stroke_config(&mut self, config: StrokeConfig) {
        self.stroke_config = config;
        self.context.brush_jitter = config.brush_jitter;
        self.sampler.set_min_point_distance(config.min_point_distance);
    }

    /// Get the viewport
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }
}

#[cfg(test)]
mod tests {
    use tessera_config::CanvasConfig;

    use super::*;

    pub(super) fn small_config(pool_capacity: usize) -> EngineConfig {
        EngineConfig {
            canvas: CanvasConfig::new(64, pool_capacity),
            stroke: StrokeConfig {
                spacing: 4.0,
                proportional_spacing: false,
                min_point_distance: 0.0,
                ..StrokeConfig::default()
            },
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_pipeline_creation() {
        let pipeline = PaintingPipeline::new(&small_config(16));
        assert!(pipeline.canvas().is_empty());
        assert_eq!(pipeline.canvas().tile_size(), 64);
        assert_eq!(pipeline.canvas().pool().capacity(), 16);
        // Every tile plus the scratch surface
        assert_eq!(pipeline.device().surface_count(), 17);
        assert_eq!(pipeline.device().allocated_surface_count(), 0);
        assert_eq!(pipeline.programs().len(), 3 * 5 * 6 * 2);
        assert_eq!(pipeline.colour(), Colour::BLACK);
    }

    #[test]
    fn test_colour_levels_quantise() {
        let mut pipeline = PaintingPipeline::new(&small_config(1));
        pipeline.set_colour(Colour::new(100, 200, 30, 255));
        assert_eq!(pipeline.colour(), Colour::new(100, 200, 30, 255));

        pipeline.set_colour_levels(2);
        assert_eq!(pipeline.colour(), Colour::new(0, 255, 0, 255));
    }

    #[test]
    fn test_stroke_config_updates_jitter() {
        let mut pipeline = PaintingPipeline::new(&small_config(1));
        pipeline.set_stroke_config(StrokeConfig {
            brush_jitter: 2.5,
            ..StrokeConfig::default()
        });
        assert_eq!(pipeline.context().brush_jitter, 2.5);
    }
}
