//! Dirty tile tracking for incremental redraw

use super::{SparseCanvas, TileAddress};

impl SparseCanvas {
    /// Mark a tile as modified
    #[inline]
    pub fn mark_dirty(&mut self, address: TileAddress) {
        self.dirty_tiles.insert(address);
    }

    /// Get all dirty tiles in address order and clear the dirty set
    pub fn take_dirty_tiles(&mut self) -> Vec<TileAddress> {
        std::mem::take(&mut self.dirty_tiles).into_iter().collect()
    }

    /// Check if any tiles are dirty
    #[inline]
    pub fn has_dirty_tiles(&self) -> bool {
        !self.dirty_tiles.is_empty()
    }

    /// Get the number of dirty tiles
    #[inline]
    pub fn dirty_tile_count(&self) -> usize {
        self.dirty_tiles.len()
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use crate::device::SoftwareDevice;
    use crate::tiles::{SparseCanvas, TileAddress};
    use crate::types::Colour;

    #[test]
    fn test_set_pixel_marks_tile_dirty() {
        let mut device = SoftwareDevice::new();
        let mut canvas = SparseCanvas::new(&mut device, 16, 4);
        canvas.set_pixel(&mut device, Vec2::new(1.0, 1.0), Colour::WHITE);
        canvas.set_pixel(&mut device, Vec2::new(2.0, 2.0), Colour::WHITE);
        canvas.set_pixel(&mut device, Vec2::new(-1.0, 20.0), Colour::WHITE);

        assert!(canvas.has_dirty_tiles());
        assert_eq!(canvas.dirty_tile_count(), 2);
        assert_eq!(
            canvas.take_dirty_tiles(),
            vec![TileAddress::new(0, 0), TileAddress::new(-1, 1)]
        );
        assert!(!canvas.has_dirty_tiles());
    }
}
