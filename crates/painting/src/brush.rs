//! Brush description, coverage profile, and blend math
//!
//! A dab's coverage at a point is computed in the brush's local frame, where
//! the footprint is the unit square `[-1, 1]²`: the shape turns the local
//! position into a normalized radius, the falloff turns the radius into an
//! intensity, and bias/gain reshape that intensity.

use glam::{Affine2, Vec2};
use serde::{Deserialize, Serialize};

use crate::constants::{BRUSH_PROGRAM_PREFIX, DIVIDE_EPSILON, MIN_SPACING};
use crate::device::{uniforms, ProgramInfo};
use crate::types::{BlendMode, BrushShape, Colour, Falloff};

/// Variant tag for programs that keep the destination alpha
pub const PRESERVE_ALPHA_TAG: &str = "PreserveAlpha";

/// Brush parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Brush {
    pub shape: BrushShape,
    pub falloff: Falloff,
    /// Footprint width in world units
    pub width: f32,
    /// Footprint height in world units
    pub height: f32,
    /// Rotation in radians
    pub angle: f32,
    /// Schlick bias applied to the falloff; 0.5 is neutral
    pub bias: f32,
    /// Schlick gain applied after bias; 0.5 is neutral
    pub gain: f32,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            shape: BrushShape::Ellipse,
            falloff: Falloff::Constant,
            width: 10.0,
            height: 10.0,
            angle: 0.0,
            bias: 0.5,
            gain: 0.5,
        }
    }
}

impl Brush {
    /// Round brush of the given diameter
    pub fn round(diameter: f32) -> Self {
        Self {
            width: diameter,
            height: diameter,
            ..Self::default()
        }
    }

    /// Single-pixel brush
    pub fn pixel() -> Self {
        Self {
            shape: BrushShape::Point,
            width: 1.0,
            height: 1.0,
            ..Self::default()
        }
    }

    /// Footprint transform mapping the unit quad `[-1, 1]²` onto the dab at `position`.
    ///
    /// Equivalent to `translate(position) · rotate(angle) · scale(width/2, height/2)`.
    /// The point shape always has a one-pixel footprint.
    pub fn footprint(&self, position: Vec2) -> Affine2 {
        let half = match self.shape {
            BrushShape::Point => Vec2::splat(0.5),
            _ => Vec2::new(self.width, self.height) * 0.5,
        };
        Affine2::from_scale_angle_translation(half, self.angle, position)
    }

    /// Distance along the stroke between consecutive dabs.
    ///
    /// With `proportional` the spacing is relative to the brush size,
    /// otherwise it is in world units.
    pub fn spacing_for(&self, spacing: f32, proportional: bool) -> f32 {
        let spacing = if proportional {
            spacing * (self.width.abs() * self.height.abs()).sqrt()
        } else {
            spacing
        };
        spacing.max(MIN_SPACING)
    }

    /// Coverage in `[0, 1]` at a point in the brush's local frame; zero outside the shape
    pub fn coverage(&self, local: Vec2) -> f32 {
        let r = match self.shape {
            BrushShape::Point => 0.0,
            BrushShape::Ellipse => local.length(),
            BrushShape::Rectangle => local.x.abs().max(local.y.abs()),
        };
        if r > 1.0 {
            return 0.0;
        }
        let intensity = self.falloff.evaluate(r);
        gain(bias(intensity, self.bias), self.gain).clamp(0.0, 1.0)
    }
}

impl Falloff {
    /// Intensity at normalized radius `r` (0 at the centre, 1 at the edge)
    pub fn evaluate(self, r: f32) -> f32 {
        let r = r.clamp(0.0, 1.0);
        match self {
            Self::Constant => 1.0,
            Self::Linear => 1.0 - r,
            Self::Spherical => (1.0 - r * r).sqrt(),
            Self::InverseSpherical => 1.0 - (1.0 - (1.0 - r) * (1.0 - r)).sqrt(),
            Self::Cosine => 0.5 + 0.5 * (std::f32::consts::PI * r).cos(),
        }
    }
}

/// Schlick's bias function
pub fn bias(t: f32, b: f32) -> f32 {
    let b = b.clamp(1e-3, 1.0 - 1e-3);
    t / ((1.0 / b - 2.0) * (1.0 - t) + 1.0)
}

/// Schlick's gain function
pub fn gain(t: f32, g: f32) -> f32 {
    if t < 0.5 {
        bias(2.0 * t, g) * 0.5
    } else {
        1.0 - bias(2.0 - 2.0 * t, g) * 0.5
    }
}

impl BlendMode {
    /// Blend `colour` (straight RGB) into a premultiplied destination pixel.
    ///
    /// `weight` is the effective source alpha: coverage × strength × colour alpha.
    /// Arithmetic modes combine the straight destination colour with `colour`
    /// and lay the result over the destination with `weight`.
    pub fn apply(self, dest: [f32; 4], colour: [f32; 3], weight: f32, preserve_alpha: bool) -> [f32; 4] {
        let w = weight.clamp(0.0, 1.0);
        let inv = 1.0 - w;
        let blended = match self {
            Self::Erase => [dest[0] * inv, dest[1] * inv, dest[2] * inv, dest[3] * inv],
            _ => {
                let target = self.combine(straight(dest), colour);
                [
                    target[0] * w + dest[0] * inv,
                    target[1] * w + dest[1] * inv,
                    target[2] * w + dest[2] * inv,
                    w + dest[3] * inv,
                ]
            }
        };

        if !preserve_alpha {
            return blended;
        }
        if blended[3] <= 0.0 {
            return dest;
        }
        let scale = dest[3] / blended[3];
        [blended[0] * scale, blended[1] * scale, blended[2] * scale, dest[3]]
    }

    fn combine(self, dest: [f32; 3], colour: [f32; 3]) -> [f32; 3] {
        let op = |d: f32, c: f32| -> f32 {
            let v = match self {
                Self::Mix | Self::Erase => c,
                Self::Add => d + c,
                Self::Subtract => d - c,
                Self::Multiply => d * c,
                Self::Divide => d / c.max(DIVIDE_EPSILON),
            };
            v.clamp(0.0, 1.0)
        };
        [op(dest[0], colour[0]), op(dest[1], colour[1]), op(dest[2], colour[2])]
    }
}

fn straight(pixel: [f32; 4]) -> [f32; 3] {
    if pixel[3] <= 0.0 {
        return [0.0; 3];
    }
    [pixel[0] / pixel[3], pixel[1] / pixel[3], pixel[2] / pixel[3]]
}

/// The axes a brush program is specialized on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BrushVariant {
    pub shape: BrushShape,
    pub falloff: Falloff,
    pub blend: BlendMode,
    pub preserve_alpha: bool,
}

impl BrushVariant {
    /// Program name, e.g. `brushEllipseLinearMixPreserveAlpha`
    pub fn program_name(&self) -> String {
        let mut name = String::from(BRUSH_PROGRAM_PREFIX);
        name.push_str(self.shape.tag());
        name.push_str(self.falloff.tag());
        name.push_str(self.blend.tag());
        if self.preserve_alpha {
            name.push_str(PRESERVE_ALPHA_TAG);
        }
        name
    }

    /// Recover a variant from the tags it was compiled with
    pub fn from_tags(tags: &[&str]) -> Option<Self> {
        let shape = BrushShape::ALL.into_iter().find(|s| tags.contains(&s.tag()))?;
        let falloff = Falloff::ALL.into_iter().find(|f| tags.contains(&f.tag()))?;
        let blend = BlendMode::ALL.into_iter().find(|b| tags.contains(&b.tag()))?;
        Some(Self {
            shape,
            falloff,
            blend,
            preserve_alpha: tags.contains(&PRESERVE_ALPHA_TAG),
        })
    }

    /// Declaration of the full brush program family
    pub fn program_info() -> ProgramInfo {
        let tags = |tags: &[&str]| tags.iter().map(|t| t.to_string()).collect::<Vec<_>>();
        ProgramInfo {
            name: BRUSH_PROGRAM_PREFIX.to_string(),
            uniforms: tags(&uniforms::ALL),
            attributes: tags(&["pos"]),
            variations: vec![
                tags(&BrushShape::ALL.map(BrushShape::tag)),
                tags(&Falloff::ALL.map(Falloff::tag)),
                tags(&BlendMode::ALL.map(BlendMode::tag)),
                tags(&["", PRESERVE_ALPHA_TAG]),
            ],
        }
    }
}

/// Everything the rasterizer needs to paint a dab.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaintContext {
    pub brush: Brush,
    /// Straight (not premultiplied) paint colour
    pub colour: Colour,
    pub blend_mode: BlendMode,
    /// Strength in `[0, 1]`
    pub blend_strength: f32,
    pub preserve_alpha: bool,
    /// Per-dab positional jitter radius in world units, applied at raster time only
    pub brush_jitter: f32,
}

impl Default for PaintContext {
    fn default() -> Self {
        Self {
            brush: Brush::default(),
            colour: Colour::BLACK,
            blend_mode: BlendMode::Mix,
            blend_strength: 1.0,
            preserve_alpha: false,
            brush_jitter: 0.0,
        }
    }
}

impl PaintContext {
    pub fn variant(&self) -> BrushVariant {
        BrushVariant {
            shape: self.brush.shape,
            falloff: self.brush.falloff,
            blend: self.blend_mode,
            preserve_alpha: self.preserve_alpha,
        }
    }
}
