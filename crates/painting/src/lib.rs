//! Tessera painting engine - sparse chunked canvas storage
//!
//! This crate provides the storage engine of an infinite raster canvas:
//! - [`tiles`] - Fixed tile pool and the sparse address space built on it
//! - [`stroke`] - Pointer path to evenly spaced dabs
//! - [`rasterizer`] - Hazard-safe dab application through brush programs
//! - [`device`] - GPU device seam, brush program lookup, and a CPU device
//! - [`brush`] - Brush shapes, falloff, and blend math
//! - [`bounds`] / [`transform`] - Bounding boxes, camera, and viewport math
//! - [`schedule`] - Per-frame request coalescing
//! - [`pipeline`] - Complete painting pipeline

pub mod bounds;
pub mod brush;
pub mod constants;
pub mod device;
pub mod pipeline;
pub mod rasterizer;
pub mod schedule;
pub mod stroke;
pub mod tiles;
pub mod transform;
pub mod types;

pub use bounds::*;
pub use brush::*;
pub use constants::*;
pub use device::*;
pub use pipeline::*;
pub use rasterizer::*;
pub use schedule::*;
pub use stroke::*;
pub use tiles::*;
pub use transform::*;
pub use types::*;
