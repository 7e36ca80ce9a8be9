//! CPU render device with RGBA8 surfaces
//!
//! Surfaces are allocated lazily: a surface that has never been written holds
//! no pixel buffer and reads as transparent, so a large pool costs nothing
//! until tiles are painted.

use std::collections::HashMap;

use glam::{Affine2, Vec2};
use tracing::{debug, trace};

use super::{
    uniforms, DeviceError, DrawCall, Primitive, Program, ProgramCache, ProgramHandle, ProgramInfo,
    RenderDevice, SurfaceId, UniformValue,
};
use crate::bounds::BoundingBox;
use crate::brush::{Brush, BrushVariant};
use crate::types::Colour;

/// A device operation, as recorded when command recording is enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    Clear(SurfaceId),
    Copy { src: SurfaceId, dst: SurfaceId },
    WritePixel(SurfaceId),
    WriteSurface(SurfaceId),
    Draw {
        program: ProgramHandle,
        target: SurfaceId,
        sampled: Option<SurfaceId>,
    },
}

struct SoftwareSurface {
    size: u32,
    /// Row-major premultiplied pixels; `None` until first written
    pixels: Option<Vec<Colour>>,
}

impl SoftwareSurface {
    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        assert!(x < self.size && y < self.size, "pixel ({x}, {y}) outside {0}x{0} surface", self.size);
        (y as usize) * (self.size as usize) + (x as usize)
    }

    #[inline]
    fn pixel_count(&self) -> usize {
        (self.size as usize) * (self.size as usize)
    }

    fn pixels_mut(&mut self) -> &mut Vec<Colour> {
        let count = self.pixel_count();
        self.pixels.get_or_insert_with(|| vec![Colour::TRANSPARENT; count])
    }
}

/// Reference implementation of [`RenderDevice`] that executes brush programs on the CPU.
#[derive(Default)]
pub struct SoftwareDevice {
    surfaces: Vec<SoftwareSurface>,
    /// Compiled programs; `None` for programs this device cannot execute
    programs: HashMap<ProgramHandle, Option<BrushVariant>>,
    next_program: u32,
    recording: bool,
    commands: Vec<DeviceCommand>,
}

impl SoftwareDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile every variant of a program family
    pub fn compile(&mut self, info: &ProgramInfo) -> ProgramCache {
        let mut cache = ProgramCache::new();
        for tags in info.variants() {
            let handle = ProgramHandle(self.next_program);
            self.next_program += 1;

            let program = Program::new(handle, info.variant_name(&tags))
                .with_uniforms(info.uniforms.iter().map(String::as_str))
                .with_attributes(info.attributes.iter().map(String::as_str));
            self.programs.insert(handle, BrushVariant::from_tags(&tags));
            cache.insert(program);
        }
        debug!("Compiled {} variants of program {}", cache.len(), info.name);
        cache
    }

    /// Compile the full brush program family
    pub fn compile_brush_programs(&mut self) -> ProgramCache {
        self.compile(&BrushVariant::program_info())
    }

    /// Start or stop recording executed commands
    pub fn set_recording(&mut self, recording: bool) {
        self.recording = recording;
        if !recording {
            self.commands.clear();
        }
    }

    /// Drain the recorded commands
    pub fn take_commands(&mut self) -> Vec<DeviceCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Number of surfaces created so far
    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    /// Number of surfaces that currently hold a pixel buffer
    pub fn allocated_surface_count(&self) -> usize {
        self.surfaces.iter().filter(|s| s.pixels.is_some()).count()
    }

    /// Raw bytes of a surface (RGBA8, premultiplied); empty if never written
    pub fn surface_bytes(&self, surface: SurfaceId) -> &[u8] {
        self.surface(surface)
            .pixels
            .as_deref()
            .map(|pixels| bytemuck::cast_slice(pixels))
            .unwrap_or(&[])
    }

    fn record(&mut self, command: DeviceCommand) {
        if self.recording {
            self.commands.push(command);
        }
    }

    fn surface(&self, id: SurfaceId) -> &SoftwareSurface {
        self.surfaces
            .get(id.0 as usize)
            .unwrap_or_else(|| panic!("surface {id:?} was not created by this device"))
    }

    fn surface_mut(&mut self, id: SurfaceId) -> &mut SoftwareSurface {
        self.surfaces
            .get_mut(id.0 as usize)
            .unwrap_or_else(|| panic!("surface {id:?} was not created by this device"))
    }
}

impl RenderDevice for SoftwareDevice {
    fn create_surface(&mut self, size: u32) -> SurfaceId {
        let id = SurfaceId(self.surfaces.len() as u32);
        self.surfaces.push(SoftwareSurface { size, pixels: None });
        id
    }

    fn surface_size(&self, surface: SurfaceId) -> u32 {
        self.surface(surface).size
    }

    fn clear_surface(&mut self, surface: SurfaceId) {
        self.surface_mut(surface).pixels = None;
        self.record(DeviceCommand::Clear(surface));
    }

    fn copy_surface(&mut self, src: SurfaceId, dst: SurfaceId) {
        let source = self.surface(src);
        let (size, pixels) = (source.size, source.pixels.clone());
        let target = self.surface_mut(dst);
        assert_eq!(target.size, size, "copy between surfaces of different size");
        target.pixels = pixels;
        self.record(DeviceCommand::Copy { src, dst });
    }

    fn read_pixel(&self, surface: SurfaceId, x: u32, y: u32) -> Colour {
        let surface = self.surface(surface);
        let index = surface.index(x, y);
        surface.pixels.as_ref().map_or(Colour::TRANSPARENT, |p| p[index])
    }

    fn write_pixel(&mut self, surface: SurfaceId, x: u32, y: u32, colour: Colour) {
        let target = self.surface_mut(surface);
        let index = target.index(x, y);
        target.pixels_mut()[index] = colour;
        self.record(DeviceCommand::WritePixel(surface));
    }

    fn read_surface(&self, surface: SurfaceId) -> Vec<Colour> {
        let surface = self.surface(surface);
        surface
            .pixels
            .clone()
            .unwrap_or_else(|| vec![Colour::TRANSPARENT; surface.pixel_count()])
    }

    fn write_surface(&mut self, surface: SurfaceId, pixels: &[Colour]) -> Result<(), DeviceError> {
        let target = self.surface_mut(surface);
        let expected = target.pixel_count();
        if pixels.len() != expected {
            return Err(DeviceError::SizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        target.pixels = if pixels.iter().all(|p| *p == Colour::TRANSPARENT) {
            None
        } else {
            Some(pixels.to_vec())
        };
        self.record(DeviceCommand::WriteSurface(surface));
        Ok(())
    }

    fn draw(&mut self, program: &Program, call: &DrawCall<'_>) -> Result<(), DeviceError> {
        let variant = match self.programs.get(&program.handle) {
            None => return Err(DeviceError::UnknownProgram(program.name.clone())),
            Some(None) => {
                return Err(DeviceError::UnsupportedProgram {
                    program: program.name.clone(),
                });
            }
            Some(Some(variant)) => *variant,
        };

        let bindings = Bindings { program, call };
        let footprint = bindings.affine(uniforms::BRUSH)?;
        let chunk_offset = bindings.vec2(uniforms::CHUNK_OFFSET)?;
        let colour = bindings.vec4(uniforms::COLOUR)?;
        let dest = bindings.sampler(uniforms::DEST)?;
        let bias = bindings.optional_float(uniforms::BIAS)?.unwrap_or(0.5);
        let gain = bindings.optional_float(uniforms::GAIN)?.unwrap_or(0.5);
        let strength = bindings
            .optional_float(uniforms::BLEND_STRENGTH)?
            .unwrap_or(1.0);

        if dest == call.target {
            return Err(DeviceError::FeedbackLoop(dest));
        }

        let size = self.surface(call.target).size;
        let sampled = self.surface(dest);
        assert_eq!(sampled.size, size, "sampled surface differs in size from the target");
        let snapshot = sampled.pixels.clone();
        let read_dest = |index: usize| {
            snapshot
                .as_ref()
                .map_or([0.0; 4], |pixels| pixels[index].to_floats())
        };

        let brush = Brush {
            shape: variant.shape,
            falloff: variant.falloff,
            bias,
            gain,
            ..Brush::default()
        };
        let rgb = [colour[0], colour[1], colour[2]];
        let alpha = colour[3] * strength;

        let fragments = match call.primitive {
            Primitive::Point => point_fragment(&footprint, chunk_offset, size),
            Primitive::Quad => quad_fragments(&footprint, chunk_offset, size),
        };

        let target = self.surface_mut(call.target);
        let mut written = 0usize;
        for (x, y, local) in fragments {
            let coverage = match call.primitive {
                Primitive::Point => 1.0,
                Primitive::Quad => brush.coverage(local),
            };
            if coverage <= 0.0 {
                continue;
            }
            let index = target.index(x, y);
            let out = variant
                .blend
                .apply(read_dest(index), rgb, coverage * alpha, variant.preserve_alpha);
            target.pixels_mut()[index] = Colour::from_floats(out);
            written += 1;
        }
        trace!("{}: {} fragments written", program.name, written);

        self.record(DeviceCommand::Draw {
            program: program.handle,
            target: call.target,
            sampled: Some(dest),
        });
        Ok(())
    }
}

/// The single fragment at the pixel containing the footprint's origin
fn point_fragment(footprint: &Affine2, chunk_offset: Vec2, size: u32) -> Vec<(u32, u32, Vec2)> {
    let pixel = (footprint.translation - chunk_offset).floor();
    if pixel.x < 0.0 || pixel.y < 0.0 || pixel.x >= size as f32 || pixel.y >= size as f32 {
        return Vec::new();
    }
    vec![(pixel.x as u32, pixel.y as u32, Vec2::ZERO)]
}

/// Every pixel whose centre lies inside the transformed unit quad, with its
/// position in the quad's local frame
fn quad_fragments(footprint: &Affine2, chunk_offset: Vec2, size: u32) -> Vec<(u32, u32, Vec2)> {
    if footprint.matrix2.determinant().abs() <= f32::EPSILON {
        return Vec::new();
    }
    let inverse = footprint.inverse();
    let local_to_tile = Affine2::from_translation(-chunk_offset) * *footprint;
    let range = BoundingBox::new(-1.0, -1.0, 2.0, 2.0)
        .transformed(&local_to_tile)
        .to_integer_range();

    let min = range.min.max(glam::IVec2::ZERO);
    let max = range.max.min(glam::IVec2::splat(size as i32));
    let mut fragments = Vec::new();
    for y in min.y..max.y {
        for x in min.x..max.x {
            let world = chunk_offset + Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let local = inverse.transform_point2(world);
            if local.x.abs() <= 1.0 && local.y.abs() <= 1.0 {
                fragments.push((x as u32, y as u32, local));
            }
        }
    }
    fragments
}

/// Uniform values of one draw, looked up by name through the program's slots
struct Bindings<'p, 'c> {
    program: &'p Program,
    call: &'c DrawCall<'c>,
}

impl Bindings<'_, '_> {
    fn get(&self, name: &'static str) -> Option<UniformValue> {
        let slot = self.program.uniform(name)?;
        self.call
            .uniforms
            .iter()
            .find(|(bound, _)| *bound == slot)
            .map(|(_, value)| *value)
    }

    fn missing(&self, uniform: &'static str) -> DeviceError {
        DeviceError::MissingUniform {
            program: self.program.name.clone(),
            uniform,
        }
    }

    fn wrong_type(&self, uniform: &'static str) -> DeviceError {
        DeviceError::UniformType {
            program: self.program.name.clone(),
            uniform,
        }
    }

    fn affine(&self, name: &'static str) -> Result<Affine2, DeviceError> {
        match self.get(name) {
            Some(UniformValue::Affine(value)) => Ok(value),
            Some(_) => Err(self.wrong_type(name)),
            None => Err(self.missing(name)),
        }
    }

    fn vec2(&self, name: &'static str) -> Result<Vec2, DeviceError> {
        match self.get(name) {
            Some(UniformValue::Vec2(value)) => Ok(value),
            Some(_) => Err(self.wrong_type(name)),
            None => Err(self.missing(name)),
        }
    }

    fn vec4(&self, name: &'static str) -> Result<[f32; 4], DeviceError> {
        match self.get(name) {
            Some(UniformValue::Vec4(value)) => Ok(value),
            Some(_) => Err(self.wrong_type(name)),
            None => Err(self.missing(name)),
        }
    }

    fn sampler(&self, name: &'static str) -> Result<SurfaceId, DeviceError> {
        match self.get(name) {
            Some(UniformValue::Sampler(value)) => Ok(value),
            Some(_) => Err(self.wrong_type(name)),
            None => Err(self.missing(name)),
        }
    }

    fn optional_float(&self, name: &'static str) -> Result<Option<f32>, DeviceError> {
        match self.get(name) {
            Some(UniformValue::Float(value)) => Ok(Some(value)),
            Some(_) => Err(self.wrong_type(name)),
            None => Ok(None),
        }
    }
}
