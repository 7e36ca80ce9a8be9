//! GPU device seam
//!
//! The storage engine talks to the GPU only through [`RenderDevice`]. A device
//! owns every surface (a texture with an attached render target) and every
//! compiled program; the engine holds opaque handles.
//!
//! Handles are minted by the device, so using an unknown handle is a
//! programming error and devices are free to panic on it. The only fallible
//! operation is [`RenderDevice::draw`], whose bindings come from the caller.
//!
//! [`SoftwareDevice`] is a CPU implementation with RGBA8 surfaces, used for
//! headless rendering and tests.

mod program;
mod software;

use glam::{Affine2, Vec2};
use thiserror::Error;

use crate::types::Colour;

pub use program::{
    uniforms, variant_list, Program, ProgramCache, ProgramHandle, ProgramInfo, ProgramLibrary,
};
pub use software::{DeviceCommand, SoftwareDevice};

/// Opaque handle to a square device surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub(crate) u32);

/// Location of a named uniform inside a compiled program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformSlot(pub u32);

/// Location of a named vertex attribute inside a compiled program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeSlot(pub u32);

/// Value bound to a uniform slot for one draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2(Vec2),
    Vec4([f32; 4]),
    Affine(Affine2),
    /// Read-only texture sample of a surface
    Sampler(SurfaceId),
}

/// Geometry emitted by a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// Unit quad `[-1, 1]²` transformed by the program's `brush` uniform
    Quad,
    /// A single fragment at the translation of the `brush` uniform
    Point,
}

/// One draw into a target surface
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    pub target: SurfaceId,
    pub primitive: Primitive,
    pub uniforms: &'a [(UniformSlot, UniformValue)],
}

#[derive(Debug, Error, PartialEq)]
pub enum DeviceError {
    #[error("Program {0} is not known to this device")]
    UnknownProgram(String),
    #[error("Program {program} cannot be executed by this device")]
    UnsupportedProgram { program: String },
    #[error("Required uniform `{uniform}` is not bound for program {program}")]
    MissingUniform { program: String, uniform: &'static str },
    #[error("Uniform `{uniform}` of program {program} is bound to a value of the wrong type")]
    UniformType { program: String, uniform: &'static str },
    #[error("Surface {0:?} is both sampled and rendered to in one draw")]
    FeedbackLoop(SurfaceId),
    #[error("Pixel data has {actual} pixels, surface holds {expected}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// Device context shared by the pool, canvas, and rasterizer.
///
/// All operations are executed in call order; a device never reorders a copy
/// and a later draw that reads its destination.
pub trait RenderDevice {
    /// Allocate a `size × size` surface cleared to transparent
    fn create_surface(&mut self, size: u32) -> SurfaceId;

    /// Edge length of a surface
    fn surface_size(&self, surface: SurfaceId) -> u32;

    /// Reset every pixel to transparent black
    fn clear_surface(&mut self, surface: SurfaceId);

    /// Copy the full contents of `src` into `dst` (same size)
    fn copy_surface(&mut self, src: SurfaceId, dst: SurfaceId);

    /// Read one pixel (premultiplied)
    fn read_pixel(&self, surface: SurfaceId, x: u32, y: u32) -> Colour;

    /// Overwrite one pixel (premultiplied)
    fn write_pixel(&mut self, surface: SurfaceId, x: u32, y: u32, colour: Colour);

    /// Read back every pixel in row-major order (premultiplied)
    fn read_surface(&self, surface: SurfaceId) -> Vec<Colour>;

    /// Upload every pixel in row-major order (premultiplied)
    fn write_surface(&mut self, surface: SurfaceId, pixels: &[Colour]) -> Result<(), DeviceError>;

    /// Execute a compiled program into `call.target`.
    ///
    /// Sampling the target surface in the same draw is undefined on real
    /// hardware; devices reject it with [`DeviceError::FeedbackLoop`].
    fn draw(&mut self, program: &Program, call: &DrawCall<'_>) -> Result<(), DeviceError>;
}
