/// Default tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: u32 = tessera_config::DEFAULT_TILE_SIZE;

/// Default number of tiles owned by a pool.
pub const DEFAULT_POOL_CAPACITY: usize = tessera_config::DEFAULT_POOL_CAPACITY;

/// Smallest spacing the sampler will step by, in world units.
///
/// Dabs never land closer than one pixel apart, so a translucent pixel
/// stroke does not composite over itself.
pub const MIN_SPACING: f32 = 1.0;

/// Segments shorter than this are treated as a single point.
pub const DEGENERATE_SEGMENT_LENGTH: f32 = 1.0e-6;

/// Divisor floor used by the divide blend mode.
pub const DIVIDE_EPSILON: f32 = 1.0 / 255.0;

/// Prefix shared by every brush program variant name.
pub const BRUSH_PROGRAM_PREFIX: &str = "brush";
