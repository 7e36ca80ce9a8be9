//! 2D affine transforms for world ↔ screen and world ↔ tile-local mapping.

use glam::{Affine2, IVec2, Vec2};

use crate::bounds::BoundingBox;

/// Smallest zoom factor the camera accepts
pub const MIN_ZOOM: f32 = 1.0 / 256.0;

/// Largest zoom factor the camera accepts
pub const MAX_ZOOM: f32 = 256.0;

/// A forward affine transform paired with its inverse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    forward: Affine2,
    inverse: Affine2,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform2D {
    pub const IDENTITY: Self = Self {
        forward: Affine2::IDENTITY,
        inverse: Affine2::IDENTITY,
    };

    /// Wrap an invertible affine transform
    pub fn new(forward: Affine2) -> Self {
        debug_assert!(
            forward.matrix2.determinant().abs() > f32::EPSILON,
            "Transform2D requires an invertible matrix"
        );
        Self {
            forward,
            inverse: forward.inverse(),
        }
    }

    pub fn from_translation(translation: Vec2) -> Self {
        Self {
            forward: Affine2::from_translation(translation),
            inverse: Affine2::from_translation(-translation),
        }
    }

    pub fn from_scale(scale: Vec2) -> Self {
        Self::new(Affine2::from_scale(scale))
    }

    /// Mapping from world space into the local pixel space of a tile
    pub fn world_to_tile(address: IVec2, tile_size: u32) -> Self {
        Self::from_translation(-(address.as_vec2() * tile_size as f32))
    }

    #[inline]
    pub fn forward(&self) -> &Affine2 {
        &self.forward
    }

    #[inline]
    pub fn inverse(&self) -> &Affine2 {
        &self.inverse
    }

    /// Swap forward and inverse
    pub fn inverted(&self) -> Self {
        Self {
            forward: self.inverse,
            inverse: self.forward,
        }
    }

    /// Transform that applies `self` first and then `next`
    pub fn then(&self, next: &Transform2D) -> Self {
        Self {
            forward: next.forward * self.forward,
            inverse: self.inverse * next.inverse,
        }
    }

    #[inline]
    pub fn apply(&self, point: Vec2) -> Vec2 {
        self.forward.transform_point2(point)
    }

    #[inline]
    pub fn apply_inverse(&self, point: Vec2) -> Vec2 {
        self.inverse.transform_point2(point)
    }

    /// Transform a direction (ignores translation)
    #[inline]
    pub fn apply_vector(&self, vector: Vec2) -> Vec2 {
        self.forward.transform_vector2(vector)
    }

    #[inline]
    pub fn apply_inverse_vector(&self, vector: Vec2) -> Vec2 {
        self.inverse.transform_vector2(vector)
    }
}

/// Pan/zoom camera. World points map to view space as `zoom * (world + pan)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pan: Vec2,
    zoom: f32,
    transform: Transform2D,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec2::ZERO, 1.0)
    }
}

impl Camera {
    pub fn new(pan: Vec2, zoom: f32) -> Self {
        let mut camera = Self {
            pan,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            transform: Transform2D::IDENTITY,
        };
        camera.update();
        camera
    }

    #[inline]
    pub fn pan(&self) -> Vec2 {
        self.pan
    }

    #[inline]
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// World → view transform
    #[inline]
    pub fn transform(&self) -> &Transform2D {
        &self.transform
    }

    pub fn set_pan(&mut self, pan: Vec2) {
        self.pan = pan;
        self.update();
    }

    /// Move the camera by a world-space delta
    pub fn move_by(&mut self, delta: Vec2) {
        self.pan += delta;
        self.update();
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.update();
    }

    /// Multiply the zoom by `factor`, keeping `anchor` (world space) fixed on screen
    pub fn zoom_at(&mut self, factor: f32, anchor: Vec2) {
        let old_zoom = self.zoom;
        let new_zoom = (old_zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.pan = (anchor + self.pan) * (old_zoom / new_zoom) - anchor;
        self.zoom = new_zoom;
        self.update();
    }

    fn update(&mut self) {
        let forward = Affine2::from_scale(Vec2::splat(self.zoom)) * Affine2::from_translation(self.pan);
        self.transform = Transform2D::new(forward);
    }
}

/// The presentation viewport: a screen-sized window onto the camera's view.
///
/// Screen coordinates are pixels with the origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    size: Vec2,
    camera: Camera,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Vec2::new(width as f32, height as f32),
            camera: Camera::default(),
        }
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        self.size
    }

    #[inline]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    #[inline]
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = Vec2::new(width as f32, height as f32);
    }

    /// Screen → view: move the origin to the centre of the screen
    fn screen_to_view(&self) -> Transform2D {
        Transform2D::from_translation(-self.size * 0.5)
    }

    /// World → screen transform
    pub fn world_to_screen_transform(&self) -> Transform2D {
        self.camera.transform().then(&self.screen_to_view().inverted())
    }

    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        self.world_to_screen_transform().apply_inverse(screen)
    }

    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        self.world_to_screen_transform().apply(world)
    }

    /// Convert a screen-space movement (e.g. a mouse drag) to world units
    pub fn screen_delta_to_world(&self, delta: Vec2) -> Vec2 {
        self.world_to_screen_transform().apply_inverse_vector(delta)
    }

    /// World-space bounds of everything currently visible
    pub fn current_viewport_bounds_in_world_space(&self) -> BoundingBox {
        let screen = BoundingBox::new(0.0, 0.0, self.size.x, self.size.y);
        screen.transformed(self.world_to_screen_transform().inverse())
    }
}
