//! Fixed-capacity arena of tile surfaces

use std::collections::BTreeSet;

use tracing::debug;

use super::{Tile, TileId};
use crate::device::{RenderDevice, SurfaceId};

/// Owns every tile surface of a canvas.
///
/// Tiles are created up front and never destroyed; each one is either
/// available or occupied (leased to a canvas address). Running out of
/// available tiles is an expected condition reported by [`TilePool::grab`]
/// returning `None`.
pub struct TilePool {
    tiles: Vec<Tile>,
    /// Free tiles, popped from the back
    available: Vec<TileId>,
    occupied: BTreeSet<TileId>,
    tile_size: u32,
}

impl TilePool {
    /// Create `capacity` tiles of `tile_size × tile_size` pixels on the device
    pub fn new(device: &mut dyn RenderDevice, tile_size: u32, capacity: usize) -> Self {
        let tiles: Vec<Tile> = (0..capacity)
            .map(|_| Tile {
                surface: device.create_surface(tile_size),
            })
            .collect();
        debug!("TilePool created: {} tiles of {}x{}", capacity, tile_size, tile_size);

        Self {
            tiles,
            available: (0..capacity).rev().map(TileId).collect(),
            occupied: BTreeSet::new(),
            tile_size,
        }
    }

    /// Lease a tile, cleared to transparent. Returns `None` when every tile is occupied.
    pub fn grab(&mut self, device: &mut dyn RenderDevice) -> Option<TileId> {
        let Some(id) = self.available.pop() else {
            debug!("TilePool exhausted: all {} tiles occupied", self.capacity());
            return None;
        };
        self.occupied.insert(id);
        device.clear_surface(self.tiles[id.0].surface);
        Some(id)
    }

    /// Return a tile to the pool. Does nothing if the tile is not occupied.
    ///
    /// Contents are left in place and cleared on the next grab.
    pub fn release(&mut self, id: TileId) {
        if self.occupied.remove(&id) {
            self.available.push(id);
        }
    }

    /// Release every occupied tile
    pub fn reset_all(&mut self) {
        let released = self.occupied.len();
        // Highest ids first so the lowest are grabbed next
        while let Some(id) = self.occupied.pop_last() {
            self.available.push(id);
        }
        debug!("TilePool reset: {} tiles released", released);
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.tiles.len()
    }

    #[inline]
    pub fn available_count(&self) -> usize {
        self.available.len()
    }

    #[inline]
    pub fn occupied_count(&self) -> usize {
        self.occupied.len()
    }

    #[inline]
    pub fn is_occupied(&self, id: TileId) -> bool {
        self.occupied.contains(&id)
    }

    #[inline]
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id.0)
    }

    /// Surface of an occupied tile.
    ///
    /// Panics if the tile is not currently leased: callers only hold ids of
    /// tiles they grabbed.
    pub fn surface(&self, id: TileId) -> SurfaceId {
        assert!(self.is_occupied(id), "tile {id:?} is not leased from this pool");
        self.tiles[id.0].surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SoftwareDevice;
    use crate::types::Colour;

    fn assert_partition(pool: &TilePool) {
        assert_eq!(pool.available_count() + pool.occupied_count(), pool.capacity());
        for id in &pool.available {
            assert!(!pool.occupied.contains(id), "{id:?} is both available and occupied");
        }
        let mut free = pool.available.clone();
        free.sort();
        free.dedup();
        assert_eq!(free.len(), pool.available.len(), "duplicate available entries");
    }

    #[test]
    fn test_new_pool_all_available() {
        let mut device = SoftwareDevice::new();
        let pool = TilePool::new(&mut device, 16, 8);
        assert_eq!(pool.capacity(), 8);
        assert_eq!(pool.available_count(), 8);
        assert_eq!(pool.occupied_count(), 0);
        assert_eq!(device.surface_count(), 8);
        assert_eq!(pool.tile_size(), 16);
    }

    #[test]
    fn test_grab_until_exhausted() {
        let mut device = SoftwareDevice::new();
        let mut pool = TilePool::new(&mut device, 4, 3);
        let grabbed: Vec<_> = (0..3).map(|_| pool.grab(&mut device).unwrap()).collect();
        assert_eq!(grabbed, vec![TileId(0), TileId(1), TileId(2)]);
        assert!(pool.grab(&mut device).is_none());
        assert_partition(&pool);
    }

    #[test]
    fn test_grab_clears_recycled_tile() {
        let mut device = SoftwareDevice::new();
        let mut pool = TilePool::new(&mut device, 4, 1);
        let id = pool.grab(&mut device).unwrap();
        device.write_pixel(pool.surface(id), 1, 1, Colour::WHITE);
        pool.release(id);

        let again = pool.grab(&mut device).unwrap();
        assert_eq!(again, id);
        assert_eq!(device.read_pixel(pool.surface(again), 1, 1), Colour::TRANSPARENT);
    }

    #[test]
    fn test_partition_holds_for_mixed_sequences() {
        let mut device = SoftwareDevice::new();
        let mut pool = TilePool::new(&mut device, 4, 5);
        let mut leased = Vec::new();
        // Deterministic mix of grabs and releases, including stale releases
        for step in 0..60usize {
            if step % 3 == 2 && !leased.is_empty() {
                let id = leased.remove(step % leased.len());
                pool.release(id);
                pool.release(id);
            } else if let Some(id) = pool.grab(&mut device) {
                leased.push(id);
            }
            assert_partition(&pool);
            assert_eq!(pool.occupied_count(), leased.len());
        }
    }

    #[test]
    fn test_release_unleased_is_noop() {
        let mut device = SoftwareDevice::new();
        let mut pool = TilePool::new(&mut device, 4, 2);
        let id = pool.grab(&mut device).unwrap();

        let before = (pool.available.clone(), pool.occupied.clone());
        pool.release(TileId(1));
        pool.release(TileId(42));
        assert_eq!((pool.available.clone(), pool.occupied.clone()), before);

        pool.release(id);
        let before = (pool.available.clone(), pool.occupied.clone());
        pool.release(id);
        assert_eq!((pool.available.clone(), pool.occupied.clone()), before);
    }

    #[test]
    fn test_reset_all() {
        let mut device = SoftwareDevice::new();
        let mut pool = TilePool::new(&mut device, 4, 4);
        for _ in 0..3 {
            pool.grab(&mut device);
        }
        pool.reset_all();
        assert_eq!(pool.available_count(), 4);
        assert_eq!(pool.occupied_count(), 0);
        assert_partition(&pool);
        assert_eq!(pool.grab(&mut device), Some(TileId(0)));
    }

    #[test]
    #[should_panic(expected = "not leased")]
    fn test_surface_of_free_tile_panics() {
        let mut device = SoftwareDevice::new();
        let pool = TilePool::new(&mut device, 4, 1);
        pool.surface(TileId(0));
    }
}
