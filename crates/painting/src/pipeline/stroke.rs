//! Stroke handling for the painting pipeline

use glam::Vec2;
use tracing::{debug, warn};

use crate::device::RenderDevice;
use crate::stroke::pixel_line;
use crate::types::Colour;

use super::PaintingPipeline;

/// Totals for a batch of dabs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StrokeProgress {
    /// Dabs handed to the rasterizer
    pub dabs: usize,
    /// Tile draws that succeeded
    pub painted_tiles: usize,
    /// Tile draws skipped because the pool was exhausted
    pub skipped_tiles: usize,
    /// Dabs dropped because their brush program is missing or a draw failed
    pub dropped_dabs: usize,
}

impl StrokeProgress {
    fn merge(&mut self, other: StrokeProgress) {
        self.dabs += other.dabs;
        self.painted_tiles += other.painted_tiles;
        self.skipped_tiles += other.skipped_tiles;
        self.dropped_dabs += other.dropped_dabs;
    }
}

impl<D: RenderDevice> PaintingPipeline<D> {
    /// Begin a stroke at a world position
    ///
    /// Spacing is resolved from the current brush here, so brush changes
    /// during a stroke do not change its spacing.
    pub fn begin_stroke(&mut self, position: Vec2) {
        let spacing = self
            .context
            .brush
            .spacing_for(self.stroke_config.spacing, self.stroke_config.proportional_spacing);
        self.sampler.set_spacing(spacing);
        self.sampler.set_jitter_radius(self.stroke_config.stroke_jitter);
        self.sampler.start(position);
        debug!(
            "Stroke started at ({:.1}, {:.1}), spacing {:.2}",
            position.x, position.y, spacing
        );
    }

    /// Continue the active stroke to a world position
    pub fn stroke_to(&mut self, position: Vec2) -> StrokeProgress {
        if !self.sampler.is_active() {
            debug!("stroke_to: no active stroke, ignoring");
            return StrokeProgress::default();
        }
        let dabs = self.sampler.add_point(position);
        self.paint_dabs(&dabs)
    }

    /// End the active stroke, painting its final segment
    pub fn end_stroke(&mut self) -> StrokeProgress {
        let dabs = self.sampler.finish();
        let progress = self.paint_dabs(&dabs);
        debug!("Stroke finished: {:?}", progress);
        progress
    }

    /// Check if a stroke is currently in progress
    pub fn is_stroking(&self) -> bool {
        self.sampler.is_active()
    }

    /// Apply dabs in order
    pub(crate) fn paint_dabs(&mut self, dabs: &[Vec2]) -> StrokeProgress {
        let mut progress = StrokeProgress::default();
        for &position in dabs {
            progress.merge(self.paint_dab(position));
        }
        if progress.painted_tiles > 0 {
            self.scheduler.request_redraw();
            self.scheduler.request_gui_update();
        }
        progress
    }

    fn paint_dab(&mut self, position: Vec2) -> StrokeProgress {
        let outcome = self.rasterizer.apply_dab(
            &mut self.device,
            &mut self.canvas,
            &self.programs,
            &self.context,
            position,
        );

        if let Some(name) = &outcome.missing_program {
            if self.missing_programs.insert(name.clone()) {
                warn!("Brush program {} is not available; dabs using it are skipped", name);
            }
        }
        for (address, error) in &outcome.failed {
            warn!("Dab draw into tile {} failed: {}", address, error);
        }

        StrokeProgress {
            dabs: 1,
            painted_tiles: outcome.painted.len(),
            skipped_tiles: outcome.skipped.len(),
            dropped_dabs: usize::from(outcome.missing_program.is_some() || !outcome.failed.is_empty()),
        }
    }

    /// Exact-pixel pencil: composite the paint colour over every pixel on the
    /// integer line between two world positions, both ends included
    ///
    /// Returns the number of pixels written. Pixels whose tile cannot be
    /// materialized are dropped.
    pub fn plot_line(&mut self, start: Vec2, end: Vec2) -> usize {
        let [r, g, b, a] = self.context.colour.to_floats();
        let a = a * self.context.blend_strength.clamp(0.0, 1.0);
        let source = Colour::from_floats([r * a, g * a, b * a, a]);

        let mut written = 0;
        for pixel in pixel_line(start.floor().as_ivec2(), end.floor().as_ivec2()) {
            let world = pixel.as_vec2();
            let dest = self.canvas.get_pixel(&self.device, world);
            self.canvas.set_pixel(&mut self.device, world, source.over(dest));
            if self.canvas.surface_at(self.canvas.address_of(world).0).is_some() {
                written += 1;
            }
        }
        if written > 0 {
            self.scheduler.request_redraw();
            self.scheduler.request_gui_update();
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;
    use tessera_config::EngineConfig;

    use super::super::tests::small_config;
    use super::*;
    use crate::brush::Brush;
    use crate::device::ProgramCache;
    use crate::tiles::TileAddress;

    #[test]
    fn test_pipeline_stroke() {
        let mut pipeline = PaintingPipeline::new(&small_config(16));
        pipeline.set_colour(Colour::rgb(255, 0, 0));
        pipeline.set_brush(Brush::round(6.0));

        pipeline.begin_stroke(Vec2::new(10.0, 10.0));
        assert!(pipeline.is_stroking());

        let mut progress = pipeline.stroke_to(Vec2::new(50.0, 10.0));
        // The newest segment stays pending until the next point or the end
        assert_eq!(progress.dabs, 0);
        progress.merge(pipeline.stroke_to(Vec2::new(90.0, 10.0)));
        assert_eq!(progress.dabs, 11);
        progress.merge(pipeline.end_stroke());
        assert!(!pipeline.is_stroking());

        // 10, 14, ..., 90
        assert_eq!(progress.dabs, 21);
        assert_eq!(progress.skipped_tiles, 0);
        assert_eq!(progress.dropped_dabs, 0);
        assert_eq!(pipeline.canvas().len(), 2);
        assert!(pipeline.canvas().contains(TileAddress::new(1, 0)));

        let device = pipeline.device();
        for x in [10.0, 33.0, 63.5, 64.5, 89.0] {
            assert_eq!(
                pipeline.canvas().get_pixel(device, Vec2::new(x, 10.5)),
                Colour::rgb(255, 0, 0),
                "x = {x}"
            );
        }
        assert_eq!(
            pipeline.canvas().get_pixel(device, Vec2::new(50.0, 30.0)),
            Colour::TRANSPARENT
        );
    }

    #[test]
    fn test_translucent_pixel_stroke_paints_each_pixel_once() {
        let mut pipeline = PaintingPipeline::new(&EngineConfig::default());
        pipeline.set_brush(Brush::pixel());
        pipeline.set_colour(Colour::new(255, 0, 0, 128));

        pipeline.begin_stroke(Vec2::new(0.5, 0.5));
        let mut progress = pipeline.stroke_to(Vec2::new(10.5, 0.5));
        progress.merge(pipeline.end_stroke());

        // 0.5, 1.5, ..., 10.5
        assert_eq!(progress.dabs, 11);
        for x in 0..=10 {
            let pixel = pipeline.canvas().get_pixel(pipeline.device(), Vec2::new(x as f32 + 0.5, 0.5));
            assert_eq!(pixel.a, 128, "x = {x}");
        }
    }

    #[test]
    fn test_tap_paints_one_dab() {
        let mut pipeline = PaintingPipeline::new(&small_config(16));
        pipeline.set_brush(Brush::pixel());
        pipeline.begin_stroke(Vec2::new(5.0, 5.0));
        let progress = pipeline.end_stroke();
        assert_eq!(progress.dabs, 1);
        assert_eq!(progress.painted_tiles, 1);
        assert_eq!(
            pipeline.canvas().get_pixel(pipeline.device(), Vec2::new(5.0, 5.0)),
            Colour::BLACK
        );
    }

    #[test]
    fn test_stroke_to_without_stroke() {
        let mut pipeline = PaintingPipeline::new(&small_config(16));
        assert_eq!(pipeline.stroke_to(Vec2::new(1.0, 1.0)), StrokeProgress::default());
        assert_eq!(pipeline.end_stroke(), StrokeProgress::default());
        assert!(pipeline.canvas().is_empty());
    }

    #[test]
    fn test_missing_programs_degrade() {
        let mut pipeline = PaintingPipeline::new(&small_config(16));
        pipeline.set_programs(ProgramCache::new());
        pipeline.begin_stroke(Vec2::ZERO);
        pipeline.stroke_to(Vec2::new(20.0, 0.0));
        let progress = pipeline.end_stroke();
        assert_eq!(progress.dabs, 6);
        assert_eq!(progress.dropped_dabs, 6);
        assert!(pipeline.canvas().is_empty());
        assert_eq!(pipeline.missing_programs.len(), 1);
    }

    #[test]
    fn test_exhausted_pool_paints_partially() {
        let mut pipeline = PaintingPipeline::new(&small_config(1));
        pipeline.set_brush(Brush::round(4.0));
        pipeline.begin_stroke(Vec2::new(60.0, 10.0));
        let progress = pipeline.stroke_to(Vec2::new(70.0, 10.0));
        let progress = {
            let mut total = progress;
            total.merge(pipeline.end_stroke());
            total
        };
        assert!(progress.painted_tiles > 0);
        assert!(progress.skipped_tiles > 0);
        assert_eq!(pipeline.canvas().len(), 1);
        assert!(pipeline.canvas().contains(TileAddress::new(0, 0)));
    }

    #[test]
    fn test_plot_line_composites() {
        let mut pipeline = PaintingPipeline::new(&small_config(16));
        pipeline.set_colour(Colour::new(0, 0, 255, 255));
        assert_eq!(pipeline.plot_line(Vec2::new(-2.5, 0.5), Vec2::new(2.5, 0.5)), 6);
        assert_eq!(pipeline.canvas().len(), 2);
        for x in -4..=3 {
            let expected = if (-3..=2).contains(&x) { Colour::rgb(0, 0, 255) } else { Colour::TRANSPARENT };
            assert_eq!(
                pipeline.canvas().get_pixel(pipeline.device(), Vec2::new(x as f32, 0.0)),
                expected,
                "x = {x}"
            );
        }

        // Half-transparent white over opaque blue
        pipeline.set_colour(Colour::new(255, 255, 255, 128));
        pipeline.plot_line(Vec2::new(0.0, 0.0), Vec2::new(0.0, 0.0));
        let mixed = pipeline.canvas().get_pixel(pipeline.device(), Vec2::ZERO);
        assert_eq!(mixed.a, 255);
        assert!((126..=130).contains(&mixed.r), "{mixed:?}");
        assert_eq!(mixed.r, mixed.g);
        assert!(mixed.b == 255, "{mixed:?}");
    }
}
