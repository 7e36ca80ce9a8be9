//! Shared configuration for Tessera
//!
//! This crate provides the single source of truth for canvas storage
//! parameters, stroke sampling settings, and display dimensions. All
//! structs have defaults matching the engine's documented behaviour and can
//! be loaded from JSON.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default tile edge length in pixels
pub const DEFAULT_TILE_SIZE: u32 = 64;

/// Default number of tiles in the pool
pub const DEFAULT_POOL_CAPACITY: usize = 4096;

/// Default stroke spacing (fraction of brush size when proportional)
pub const DEFAULT_STROKE_SPACING: f32 = 0.5;

/// Default minimum distance between consecutive stroke points, in world units
pub const DEFAULT_MIN_POINT_DISTANCE: f32 = 1.0;

/// Default viewport width in pixels
pub const DEFAULT_WIDTH: u32 = 1280;

/// Default viewport height in pixels
pub const DEFAULT_HEIGHT: u32 = 720;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Tile size must be non-zero")]
    ZeroTileSize,
}

/// Storage parameters for the sparse canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Edge length of every square tile, in pixels
    pub tile_size: u32,
    /// Number of tiles allocated up front; the pool never grows
    pub pool_capacity: usize,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            pool_capacity: DEFAULT_POOL_CAPACITY,
        }
    }
}

impl CanvasConfig {
    /// Create a canvas config with the given tile size and pool capacity
    pub fn new(tile_size: u32, pool_capacity: usize) -> Self {
        Self {
            tile_size,
            pool_capacity,
        }
    }
}

/// Stroke sampling settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeConfig {
    /// Distance between dabs. World units, or a fraction of the brush size
    /// when `proportional_spacing` is set.
    pub spacing: f32,
    /// Scale `spacing` by the geometric mean of the brush width and height
    pub proportional_spacing: bool,
    /// Points closer than this to the point two back collapse the middle point
    pub min_point_distance: f32,
    /// Radius of the disk used to displace recorded stroke points
    pub stroke_jitter: f32,
    /// Radius of the disk used to displace each dab at raster time
    pub brush_jitter: f32,
    /// Seed for the jitter generator
    pub jitter_seed: u64,
}

impl Default for StrokeConfig {
    fn default() -> Self {
        Self {
            spacing: DEFAULT_STROKE_SPACING,
            proportional_spacing: true,
            min_point_distance: DEFAULT_MIN_POINT_DISTANCE,
            stroke_jitter: 0.0,
            brush_jitter: 0.0,
            jitter_seed: 0x5EED_CAFE,
        }
    }
}

/// Display configuration for the presentation viewport
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Viewport width in logical pixels
    pub width: u32,
    /// Viewport height in logical pixels
    pub height: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

impl DisplayConfig {
    /// Create a new display config with the given dimensions
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub canvas: CanvasConfig,
    pub stroke: StrokeConfig,
    pub display: DisplayConfig,
}

impl EngineConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        if config.canvas.tile_size == 0 {
            return Err(ConfigError::ZeroTileSize);
        }
        Ok(config)
    }

    /// Serialize the configuration to pretty-printed JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
