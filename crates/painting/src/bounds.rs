//! Axis-aligned bounds with an explicit empty state, and integer cell ranges.

use glam::{Affine2, IVec2, Vec2};

/// A non-empty rectangle in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[inline]
    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        Vec2::new(self.x + self.width, self.y + self.height)
    }
}

/// Axis-aligned bounding box.
///
/// `Empty` means "no extent yet" and is distinct from a zero-area box at the
/// origin: expanding an empty box by a point yields exactly that point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BoundingBox {
    #[default]
    Empty,
    Rect(Rect),
}

impl BoundingBox {
    /// Create a box from its origin and size. Negative sizes are normalized.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::from_corners(Vec2::new(x, y), Vec2::new(x + width, y + height))
    }

    /// Create the smallest box containing both corners
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        let min = a.min(b);
        let max = a.max(b);
        Self::Rect(Rect {
            x: min.x,
            y: min.y,
            width: max.x - min.x,
            height: max.y - min.y,
        })
    }

    /// Smallest box containing every point; empty for no points
    pub fn from_points(points: impl IntoIterator<Item = Vec2>) -> Self {
        let mut bounds = Self::Empty;
        for point in points {
            bounds.expand_to_include_point(point);
        }
        bounds
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    #[inline]
    pub fn rect(&self) -> Option<Rect> {
        match self {
            Self::Empty => None,
            Self::Rect(rect) => Some(*rect),
        }
    }

    /// Area of the box (zero when empty)
    pub fn area(&self) -> f32 {
        self.rect().map_or(0.0, |r| r.width * r.height)
    }

    /// Grow the box so that it also covers `other`
    pub fn expand_to_include(&mut self, other: &BoundingBox) {
        let Some(theirs) = other.rect() else {
            return;
        };
        *self = match self.rect() {
            None => *other,
            Some(ours) => Self::from_corners(ours.min().min(theirs.min()), ours.max().max(theirs.max())),
        };
    }

    /// Grow the box so that it also covers `point`
    pub fn expand_to_include_point(&mut self, point: Vec2) {
        self.expand_to_include(&Self::from_corners(point, point));
    }

    /// Half-open containment: the right and bottom edges are outside
    pub fn contains_point(&self, point: Vec2) -> bool {
        self.rect().is_some_and(|r| {
            point.x >= r.x && point.x < r.x + r.width && point.y >= r.y && point.y < r.y + r.height
        })
    }

    /// Whether the interiors of two boxes overlap
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        match (self.rect(), other.rect()) {
            (Some(a), Some(b)) => {
                a.x < b.x + b.width && b.x < a.x + a.width && a.y < b.y + b.height && b.y < a.y + a.height
            }
            _ => false,
        }
    }

    /// Bounds of the four corners after transformation
    pub fn transformed(&self, transform: &Affine2) -> Self {
        let Some(r) = self.rect() else {
            return Self::Empty;
        };
        Self::from_points([
            transform.transform_point2(Vec2::new(r.x, r.y)),
            transform.transform_point2(Vec2::new(r.x + r.width, r.y)),
            transform.transform_point2(Vec2::new(r.x, r.y + r.height)),
            transform.transform_point2(Vec2::new(r.x + r.width, r.y + r.height)),
        ])
    }

    /// Scale the box about the origin
    pub fn scaled(&self, factor: f32) -> Self {
        match self.rect() {
            None => Self::Empty,
            Some(r) => Self::from_corners(r.min() * factor, r.max() * factor),
        }
    }

    /// Round outward to integer cells: floor the minimum, ceil the maximum.
    ///
    /// A box with zero extent along an axis still covers the cell that contains
    /// it, so the result never under-covers what the box touches.
    pub fn to_integer_range(&self) -> TileRange {
        let Some(r) = self.rect() else {
            return TileRange::EMPTY;
        };
        let min = r.min().floor();
        let max = r.max().ceil().max(min + Vec2::ONE);
        TileRange {
            min: min.as_ivec2(),
            max: max.as_ivec2(),
        }
    }
}

/// Half-open rectangle of integer cells `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileRange {
    pub min: IVec2,
    pub max: IVec2,
}

impl TileRange {
    pub const EMPTY: Self = Self {
        min: IVec2::ZERO,
        max: IVec2::ZERO,
    };

    pub fn new(min: IVec2, max: IVec2) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max.x <= self.min.x || self.max.y <= self.min.y
    }

    #[inline]
    pub fn width(&self) -> u32 {
        (self.max.x - self.min.x).max(0) as u32
    }

    #[inline]
    pub fn height(&self) -> u32 {
        (self.max.y - self.min.y).max(0) as u32
    }

    /// Number of cells in the range
    pub fn len(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    #[inline]
    pub fn contains(&self, cell: IVec2) -> bool {
        cell.x >= self.min.x && cell.x < self.max.x && cell.y >= self.min.y && cell.y < self.max.y
    }

    /// Iterate the cells row by row
    pub fn iter(&self) -> impl Iterator<Item = IVec2> + Clone + use<> {
        let range = *self;
        let xs = range.min.x..range.max.x;
        (range.min.y..range.max.y)
            .flat_map(move |y| xs.clone().map(move |x| IVec2::new(x, y)))
    }
}
