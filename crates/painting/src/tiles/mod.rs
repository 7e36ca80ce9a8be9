//! Sparse tiled canvas storage
//!
//! The canvas is an unbounded grid of square tiles addressed by signed integer
//! pairs. Only addresses that have been painted are backed by a tile; tiles are
//! leased from a fixed [`TilePool`] and the address map stores pool indices.

mod data_access;
mod dirty_tracking;
mod export;
mod pool;

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use glam::{IVec2, Vec2};
use tessera_config::CanvasConfig;
use tracing::debug;

use crate::bounds::BoundingBox;
use crate::device::{RenderDevice, SurfaceId};

pub use pool::TilePool;

/// Position of a tile in the canvas grid.
///
/// Ordered row-major (by `y`, then `x`) so iteration over a sorted map walks
/// the canvas top to bottom, left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileAddress {
    pub x: i32,
    pub y: i32,
}

impl TileAddress {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn as_ivec2(self) -> IVec2 {
        IVec2::new(self.x, self.y)
    }

    /// World position of the tile's top-left pixel
    ///
    /// Computed in floating point: `address × tile_size` leaves the `i32`
    /// range long before the address does.
    #[inline]
    pub fn origin(self, tile_size: u32) -> Vec2 {
        self.as_ivec2().as_vec2() * tile_size as f32
    }

    /// World-space footprint `[addr·S, (addr+1)·S)`
    pub fn world_bounds(self, tile_size: u32) -> BoundingBox {
        let origin = self.origin(tile_size);
        BoundingBox::new(origin.x, origin.y, tile_size as f32, tile_size as f32)
    }
}

impl From<IVec2> for TileAddress {
    fn from(v: IVec2) -> Self {
        Self::new(v.x, v.y)
    }
}

impl Ord for TileAddress {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl PartialOrd for TileAddress {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Index of a tile in its pool's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(pub(crate) usize);

impl TileId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A pool slot: one device surface of the pool's tile size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub(crate) surface: SurfaceId,
}

impl Tile {
    #[inline]
    pub fn surface(&self) -> SurfaceId {
        self.surface
    }
}

/// Map from tile address to leased tile, plus the cumulative bounds of every
/// address ever materialized.
pub struct SparseCanvas {
    pub(crate) pool: TilePool,
    pub(crate) tiles: BTreeMap<TileAddress, TileId>,
    pub(crate) bounds: BoundingBox,
    pub(crate) tile_size: u32,
    pub(crate) dirty_tiles: BTreeSet<TileAddress>,
}

impl SparseCanvas {
    /// Create a canvas with its own pool of `capacity` tiles
    pub fn new(device: &mut dyn RenderDevice, tile_size: u32, capacity: usize) -> Self {
        Self {
            pool: TilePool::new(device, tile_size, capacity),
            tiles: BTreeMap::new(),
            bounds: BoundingBox::Empty,
            tile_size,
            dirty_tiles: BTreeSet::new(),
        }
    }

    pub fn from_config(device: &mut dyn RenderDevice, config: &CanvasConfig) -> Self {
        Self::new(device, config.tile_size, config.pool_capacity)
    }

    #[inline]
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    #[inline]
    pub fn pool(&self) -> &TilePool {
        &self.pool
    }

    /// Cumulative bounds of every materialized tile; empty for a fresh canvas
    #[inline]
    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Number of materialized tiles
    #[inline]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    #[inline]
    pub fn contains(&self, address: TileAddress) -> bool {
        self.tiles.contains_key(&address)
    }

    pub fn tile_at(&self, address: TileAddress) -> Option<TileId> {
        self.tiles.get(&address).copied()
    }

    /// Surface backing an address, if materialized
    pub fn surface_at(&self, address: TileAddress) -> Option<SurfaceId> {
        self.tile_at(address).map(|id| self.pool.surface(id))
    }

    /// Every materialized tile in row-major address order
    pub fn iter(&self) -> impl Iterator<Item = (TileAddress, TileId)> + Clone + '_ {
        self.tiles.iter().map(|(address, id)| (*address, *id))
    }

    /// Return the tile at `address`, leasing a cleared one from the pool if absent.
    ///
    /// Returns `None` when the pool is exhausted; the map is left unchanged.
    pub fn materialize(
        &mut self,
        device: &mut dyn RenderDevice,
        address: TileAddress,
    ) -> Option<TileId> {
        if let Some(&id) = self.tiles.get(&address) {
            debug_assert!(self.pool.is_occupied(id), "tile {address} maps to a free pool slot");
            return Some(id);
        }

        let Some(id) = self.pool.grab(device) else {
            debug!("Tile {} not materialized: pool exhausted", address);
            return None;
        };
        self.tiles.insert(address, id);
        self.bounds
            .expand_to_include(&address.world_bounds(self.tile_size));
        self.mark_dirty(address);
        Some(id)
    }

    /// Release every tile and forget all addresses and bounds
    pub fn reset(&mut self) {
        let count = self.tiles.len();
        self.tiles.clear();
        self.pool.reset_all();
        self.bounds = BoundingBox::Empty;
        self.dirty_tiles.clear();
        debug!("Canvas reset: {} tiles released", count);
    }
}
