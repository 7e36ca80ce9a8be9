//! Dab rasterization into canvas tiles
//!
//! Brush programs sample the destination tile to blend against it, and a
//! surface cannot be sampled and rendered to in the same pass. Every tile is
//! therefore painted in two phases: its contents are first copied into a
//! scratch surface, then the program renders into the real tile while reading
//! the destination from the scratch copy.

use glam::{Affine2, Vec2};
use tracing::trace;

use crate::bounds::BoundingBox;
use crate::brush::PaintContext;
use crate::device::{
    uniforms, DeviceError, DrawCall, Primitive, Program, ProgramLibrary, RenderDevice, SurfaceId,
    UniformSlot, UniformValue,
};
use crate::stroke::{JitterSource, XorShiftJitter};
use crate::tiles::{SparseCanvas, TileAddress};
use crate::types::BrushShape;

/// What happened to one dab.
///
/// Dabs are applied tile by tile and may succeed on some tiles only.
#[derive(Debug, Default, PartialEq)]
pub struct DabOutcome {
    /// Tiles the brush program rendered into
    pub painted: Vec<TileAddress>,
    /// Tiles that could not be materialized because the pool is exhausted
    pub skipped: Vec<TileAddress>,
    /// Tiles whose draw was rejected by the device
    pub failed: Vec<(TileAddress, DeviceError)>,
    /// Name of the brush program that was not found; the dab was not applied
    pub missing_program: Option<String>,
}

impl DabOutcome {
    /// Whether every candidate tile was painted
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty() && self.missing_program.is_none()
    }
}

/// Applies dabs to a [`SparseCanvas`] through brush programs.
pub struct TileRasterizer {
    scratch: SurfaceId,
    tile_size: u32,
    jitter: Box<dyn JitterSource>,
}

impl TileRasterizer {
    /// Create a rasterizer with its own scratch surface.
    ///
    /// The scratch surface is not part of the tile pool, so painting never
    /// competes with the canvas for tiles.
    pub fn new(device: &mut dyn RenderDevice, tile_size: u32) -> Self {
        Self {
            scratch: device.create_surface(tile_size),
            tile_size,
            jitter: Box::new(XorShiftJitter::default()),
        }
    }

    /// Replace the random source used for brush-level jitter
    pub fn with_jitter_source(mut self, jitter: Box<dyn JitterSource>) -> Self {
        self.jitter = jitter;
        self
    }

    #[inline]
    pub fn scratch(&self) -> SurfaceId {
        self.scratch
    }

    /// World-space bounds a dab at `position` can touch
    pub fn footprint_bounds(context: &PaintContext, position: Vec2) -> BoundingBox {
        match context.brush.shape {
            BrushShape::Point => {
                let pixel = position.floor();
                BoundingBox::from_corners(pixel, pixel)
            }
            _ => BoundingBox::new(-1.0, -1.0, 2.0, 2.0)
                .transformed(&context.brush.footprint(position)),
        }
    }

    /// Paint one dab.
    ///
    /// Each tile under the footprint is materialized, snapshotted into the
    /// scratch surface, and rendered into. Tiles that cannot be materialized
    /// are skipped; a missing brush program skips the whole dab.
    pub fn apply_dab(
        &mut self,
        device: &mut dyn RenderDevice,
        canvas: &mut SparseCanvas,
        programs: &dyn ProgramLibrary,
        context: &PaintContext,
        position: Vec2,
    ) -> DabOutcome {
        debug_assert_eq!(canvas.tile_size(), self.tile_size, "rasterizer and canvas tile sizes differ");
        let mut outcome = DabOutcome::default();

        let name = context.variant().program_name();
        let Some(program) = programs.get_program(&name) else {
            outcome.missing_program = Some(name);
            return outcome;
        };

        let position = position + self.jitter.disk(context.brush_jitter);
        let footprint = context.brush.footprint(position);
        let range = canvas.tile_range_for_bounds(&Self::footprint_bounds(context, position));
        let primitive = match context.brush.shape {
            BrushShape::Point => Primitive::Point,
            _ => Primitive::Quad,
        };

        let mut bindings = self.bindings(program, context, footprint);
        let chunk_offset = program.uniform(uniforms::CHUNK_OFFSET);

        for cell in range.iter() {
            let address = TileAddress::from(cell);
            let Some(id) = canvas.materialize(device, address) else {
                outcome.skipped.push(address);
                continue;
            };
            let surface = canvas.pool().surface(id);

            // Phase one: snapshot the destination
            device.copy_surface(surface, self.scratch);

            // Phase two: render into the tile, sampling the snapshot
            bindings.retain(|(slot, _)| Some(*slot) != chunk_offset);
            if let Some(slot) = chunk_offset {
                bindings.push((slot, UniformValue::Vec2(address.origin(self.tile_size))));
            }
            let call = DrawCall {
                target: surface,
                primitive,
                uniforms: &bindings,
            };
            match device.draw(program, &call) {
                Ok(()) => {
                    canvas.mark_dirty(address);
                    outcome.painted.push(address);
                }
                Err(e) => outcome.failed.push((address, e)),
            }
        }

        trace!(
            "Dab at ({:.1}, {:.1}): {} painted, {} skipped, {} failed",
            position.x,
            position.y,
            outcome.painted.len(),
            outcome.skipped.len(),
            outcome.failed.len()
        );
        outcome
    }

    /// Uniforms shared by every tile of a dab, limited to those the program declares
    fn bindings(
        &self,
        program: &Program,
        context: &PaintContext,
        footprint: Affine2,
    ) -> Vec<(UniformSlot, UniformValue)> {
        let size = self.tile_size as f32;
        let colour = context.colour.to_floats();
        // Tile-local pixels to clip space
        let projection =
            Affine2::from_scale_angle_translation(Vec2::splat(2.0 / size), 0.0, Vec2::splat(-1.0));

        [
            (uniforms::DEST, UniformValue::Sampler(self.scratch)),
            (uniforms::BRUSH, UniformValue::Affine(footprint)),
            (uniforms::PROJECTION, UniformValue::Affine(projection)),
            (uniforms::CHUNK_SIZE, UniformValue::Float(size)),
            (uniforms::COLOUR, UniformValue::Vec4(colour)),
            (uniforms::BIAS, UniformValue::Float(context.brush.bias)),
            (uniforms::GAIN, UniformValue::Float(context.brush.gain)),
            (
                uniforms::BLEND_STRENGTH,
                UniformValue::Float(context.blend_strength.clamp(0.0, 1.0)),
            ),
        ]
        .into_iter()
        .filter_map(|(name, value)| program.uniform(name).map(|slot| (slot, value)))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brush::Brush;
    use crate::device::{DeviceCommand, ProgramCache, SoftwareDevice};
    use crate::types::{BlendMode, Colour, Falloff};

    struct Fixture {
        device: SoftwareDevice,
        programs: ProgramCache,
        canvas: SparseCanvas,
        rasterizer: TileRasterizer,
    }

    fn fixture(capacity: usize) -> Fixture {
        let mut device = SoftwareDevice::new();
        let programs = device.compile_brush_programs();
        let canvas = SparseCanvas::new(&mut device, 64, capacity);
        let rasterizer = TileRasterizer::new(&mut device, 64);
        Fixture {
            device,
            programs,
            canvas,
            rasterizer,
        }
    }

    impl Fixture {
        fn dab(&mut self, context: &PaintContext, position: Vec2) -> DabOutcome {
            self.rasterizer.apply_dab(
                &mut self.device,
                &mut self.canvas,
                &self.programs,
                context,
                position,
            )
        }
    }

    fn red_pixel() -> PaintContext {
        PaintContext {
            brush: Brush::pixel(),
            colour: Colour::rgb(255, 0, 0),
            ..PaintContext::default()
        }
    }

    #[test]
    fn test_point_dab_marks_one_pixel() {
        let mut f = fixture(16);
        let outcome = f.dab(&red_pixel(), Vec2::new(-0.5, 63.5));
        assert_eq!(outcome.painted, vec![TileAddress::new(-1, 0)]);
        assert!(outcome.is_complete());
        assert_eq!(f.canvas.len(), 1);
        assert_eq!(
            f.canvas.get_pixel(&f.device, Vec2::new(-0.5, 63.5)),
            Colour::rgb(255, 0, 0)
        );
        assert_eq!(f.canvas.get_pixel(&f.device, Vec2::new(-1.5, 63.5)), Colour::TRANSPARENT);
    }

    #[test]
    fn test_footprint_spanning_tiles() {
        let mut f = fixture(16);
        let context = PaintContext {
            brush: Brush::round(10.0),
            colour: Colour::rgb(0, 0, 255),
            ..PaintContext::default()
        };
        let outcome = f.dab(&context, Vec2::new(64.0, 64.0));
        assert_eq!(
            outcome.painted,
            vec![
                TileAddress::new(0, 0),
                TileAddress::new(1, 0),
                TileAddress::new(0, 1),
                TileAddress::new(1, 1),
            ]
        );
        for p in [
            Vec2::new(63.5, 63.5),
            Vec2::new(64.5, 63.5),
            Vec2::new(63.5, 64.5),
            Vec2::new(64.5, 64.5),
        ] {
            assert_eq!(f.canvas.get_pixel(&f.device, p), Colour::rgb(0, 0, 255), "{p}");
        }
        // Outside the radius
        assert_eq!(f.canvas.get_pixel(&f.device, Vec2::new(70.5, 70.5)), Colour::TRANSPARENT);
    }

    #[test]
    fn test_exhaustion_paints_partially() {
        let mut f = fixture(1);
        let context = PaintContext {
            brush: Brush {
                shape: BrushShape::Rectangle,
                width: 8.0,
                height: 4.0,
                ..Brush::default()
            },
            colour: Colour::rgb(0, 255, 0),
            ..PaintContext::default()
        };
        // Straddles the boundary between tiles (0,0) and (1,0)
        let outcome = f.dab(&context, Vec2::new(64.0, 10.0));
        assert_eq!(outcome.painted, vec![TileAddress::new(0, 0)]);
        assert_eq!(outcome.skipped, vec![TileAddress::new(1, 0)]);
        assert_eq!(f.canvas.len(), 1);
        assert!(!f.canvas.contains(TileAddress::new(1, 0)));
        assert_eq!(
            f.canvas.get_pixel(&f.device, Vec2::new(62.5, 10.5)),
            Colour::rgb(0, 255, 0)
        );
    }

    #[test]
    fn test_missing_program_skips_dab() {
        let mut f = fixture(4);
        f.programs = ProgramCache::new();
        let outcome = f.dab(&red_pixel(), Vec2::ZERO);
        assert_eq!(outcome.missing_program.as_deref(), Some("brushPointConstantMix"));
        assert!(outcome.painted.is_empty());
        assert!(f.canvas.is_empty());
    }

    #[test]
    fn test_snapshot_precedes_each_draw() {
        let mut f = fixture(4);
        let context = PaintContext {
            brush: Brush::round(4.0),
            ..PaintContext::default()
        };
        f.device.set_recording(true);
        let outcome = f.dab(&context, Vec2::new(0.0, 10.0));
        assert_eq!(outcome.painted.len(), 2);

        let scratch = f.rasterizer.scratch();
        let commands: Vec<_> = f
            .device
            .take_commands()
            .into_iter()
            .filter(|c| !matches!(c, DeviceCommand::Clear(_)))
            .collect();
        assert_eq!(commands.len(), 4);
        for pair in commands.chunks(2) {
            let DeviceCommand::Copy { src, dst } = pair[0] else {
                panic!("expected a snapshot, got {:?}", pair[0]);
            };
            assert_eq!(dst, scratch);
            assert_eq!(
                pair[1],
                DeviceCommand::Draw {
                    program: f
                        .programs
                        .get_program(&context.variant().program_name())
                        .unwrap()
                        .handle(),
                    target: src,
                    sampled: Some(scratch),
                }
            );
        }
    }

    #[test]
    fn test_blend_reads_existing_tile_contents() {
        let mut f = fixture(4);
        let base = PaintContext {
            brush: Brush::pixel(),
            colour: Colour::rgb(200, 100, 50),
            ..PaintContext::default()
        };
        f.dab(&base, Vec2::new(3.0, 3.0));

        let multiply = PaintContext {
            colour: Colour::rgb(128, 255, 0),
            blend_mode: BlendMode::Multiply,
            ..base
        };
        f.dab(&multiply, Vec2::new(3.0, 3.0));
        assert_eq!(f.canvas.get_pixel(&f.device, Vec2::new(3.0, 3.0)), Colour::rgb(100, 100, 0));
    }

    #[test]
    fn test_blend_strength_and_falloff() {
        let mut f = fixture(4);
        let context = PaintContext {
            brush: Brush {
                falloff: Falloff::Linear,
                ..Brush::round(20.0)
            },
            colour: Colour::WHITE,
            blend_strength: 0.5,
            ..PaintContext::default()
        };
        f.dab(&context, Vec2::new(32.0, 32.0));
        let centre = f.canvas.get_pixel(&f.device, Vec2::new(32.0, 32.0));
        let edge = f.canvas.get_pixel(&f.device, Vec2::new(40.0, 32.0));
        // Linear falloff near the centre at half strength
        assert!((110..=128).contains(&centre.a), "{centre:?}");
        assert!(edge.a < centre.a && edge.a > 0, "{edge:?}");
    }

    #[test]
    fn test_brush_jitter_is_transient() {
        struct Fixed;
        impl JitterSource for Fixed {
            fn next_unit(&mut self) -> f32 {
                0.25
            }
        }
        let mut f = fixture(4);
        f.rasterizer = TileRasterizer::new(&mut f.device, 64).with_jitter_source(Box::new(Fixed));
        let context = PaintContext {
            brush_jitter: 4.0,
            ..red_pixel()
        };
        // Radius sqrt(0.25) × 4 at a quarter turn: two pixels down
        f.dab(&context, Vec2::new(10.5, 10.5));
        assert_eq!(f.canvas.get_pixel(&f.device, Vec2::new(10.5, 10.5)), Colour::TRANSPARENT);
        assert_eq!(f.canvas.get_pixel(&f.device, Vec2::new(10.5, 12.5)), Colour::rgb(255, 0, 0));
    }
}
