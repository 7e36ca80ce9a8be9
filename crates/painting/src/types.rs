use serde::{Deserialize, Serialize};

/// An 8-bit RGBA colour, the storage format of canvas tiles.
///
/// Tiles hold premultiplied colour; values handed to and returned from the
/// public canvas API are documented per call.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    bytemuck::Pod,
    bytemuck::Zeroable,
)]
#[repr(C)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Hue/saturation/lightness representation used by colour pickers.
///
/// `h` is in degrees `[0, 360)`, `s` and `l` are percentages `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsla {
    pub h: f32,
    pub s: f32,
    pub l: f32,
    pub a: u8,
}

impl Colour {
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    pub const BLACK: Self = Self::new(0, 0, 0, 255);
    pub const WHITE: Self = Self::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque colour from RGB components
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Convert to normalized floats `[r, g, b, a]` in `0.0..=1.0`
    #[inline]
    pub fn to_floats(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }

    /// Convert from normalized floats, clamping and rounding to the nearest step
    #[inline]
    pub fn from_floats(floats: [f32; 4]) -> Self {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::new(q(floats[0]), q(floats[1]), q(floats[2]), q(floats[3]))
    }

    /// Multiply the colour channels by alpha
    pub fn premultiplied(self) -> Self {
        let [r, g, b, a] = self.to_floats();
        Self::from_floats([r * a, g * a, b * a, a])
    }

    /// Divide the colour channels by alpha; fully transparent stays transparent black
    pub fn unpremultiplied(self) -> Self {
        if self.a == 0 {
            return Self::TRANSPARENT;
        }
        let [r, g, b, a] = self.to_floats();
        Self::from_floats([r / a, g / a, b / a, a])
    }

    /// Composite a premultiplied colour over a premultiplied destination
    pub fn over(self, dst: Self) -> Self {
        let src = self.to_floats();
        let dst = dst.to_floats();
        let inv = 1.0 - src[3];
        Self::from_floats([
            src[0] + dst[0] * inv,
            src[1] + dst[1] * inv,
            src[2] + dst[2] * inv,
            src[3] + dst[3] * inv,
        ])
    }

    /// Quantize every channel to `levels` evenly spaced values.
    ///
    /// Fewer than two levels leaves the colour unchanged.
    pub fn constrain_levels(self, levels: u32) -> Self {
        if levels < 2 {
            return self;
        }
        let step = 255.0 / (levels - 1) as f32;
        let level = |v: u8| ((v as f32 / step).round() * step).round().clamp(0.0, 255.0) as u8;
        Self::new(level(self.r), level(self.g), level(self.b), level(self.a))
    }

    pub fn to_hsla(self) -> Hsla {
        let [r, g, b, _] = self.to_floats();
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let range = max - min;
        let l = (max + min) / 2.0;

        let h = if range == 0.0 {
            0.0
        } else if max == r {
            let h = (g - b) / range * 60.0;
            if h < 0.0 { h + 360.0 } else { h }
        } else if max == g {
            (b - r) / range * 60.0 + 120.0
        } else {
            (r - g) / range * 60.0 + 240.0
        };

        let s = if range == 0.0 {
            0.0
        } else {
            range / (1.0 - (2.0 * l - 1.0).abs())
        };

        Hsla {
            h,
            s: s * 100.0,
            l: l * 100.0,
            a: self.a,
        }
    }

    pub fn from_hsla(hsla: Hsla) -> Self {
        let s = (hsla.s / 100.0).clamp(0.0, 1.0);
        let l = (hsla.l / 100.0).clamp(0.0, 1.0);
        let alpha = hsla.a as f32 / 255.0;

        if s == 0.0 {
            return Self::from_floats([l, l, l, alpha]);
        }

        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        let h = hsla.h.rem_euclid(360.0) / 360.0;

        let channel = |t: f32| {
            let t = t.rem_euclid(1.0);
            if t < 1.0 / 6.0 {
                p + (q - p) * 6.0 * t
            } else if t < 0.5 {
                q
            } else if t < 2.0 / 3.0 {
                p + (q - p) * (2.0 / 3.0 - t) * 6.0
            } else {
                p
            }
        };

        Self::from_floats([
            channel(h + 1.0 / 3.0),
            channel(h),
            channel(h - 1.0 / 3.0),
            alpha,
        ])
    }

    /// Format as `#rrggbb` (alpha is not included)
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Parse `#rrggbb` or `#rrggbbaa`. Returns None for anything else.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if !digits.is_ascii() {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        match digits.len() {
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }
}

/// Blend modes for painting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum BlendMode {
    #[default]
    Mix = 0,
    Erase = 1,
    Add = 2,
    Subtract = 3,
    Multiply = 4,
    Divide = 5,
}

impl BlendMode {
    pub const ALL: [Self; 6] = [
        Self::Mix,
        Self::Erase,
        Self::Add,
        Self::Subtract,
        Self::Multiply,
        Self::Divide,
    ];

    /// Symbolic tag used in program variant names
    pub fn tag(self) -> &'static str {
        match self {
            Self::Mix => "Mix",
            Self::Erase => "Erase",
            Self::Add => "Add",
            Self::Subtract => "Subtract",
            Self::Multiply => "Multiply",
            Self::Divide => "Divide",
        }
    }
}

/// Brush stamp shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum BrushShape {
    /// Single exact pixel, no falloff
    Point = 0,
    #[default]
    Ellipse = 1,
    Rectangle = 2,
}

impl BrushShape {
    pub const ALL: [Self; 3] = [Self::Point, Self::Ellipse, Self::Rectangle];

    pub fn tag(self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::Ellipse => "Ellipse",
            Self::Rectangle => "Rectangle",
        }
    }
}

/// Radial intensity profile of a brush stamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum Falloff {
    #[default]
    Constant = 0,
    Linear = 1,
    Spherical = 2,
    InverseSpherical = 3,
    Cosine = 4,
}

impl Falloff {
    pub const ALL: [Self; 5] = [
        Self::Constant,
        Self::Linear,
        Self::Spherical,
        Self::InverseSpherical,
        Self::Cosine,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Self::Constant => "Constant",
            Self::Linear => "Linear",
            Self::Spherical => "Spherical",
            Self::InverseSpherical => "InverseSpherical",
            Self::Cosine => "Cosine",
        }
    }
}
