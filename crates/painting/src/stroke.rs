//! Stroke sampling: pointer path to evenly spaced dabs
//!
//! Dabs are placed at every multiple of the spacing along the arc length of
//! the stroke polyline. The distance still owed to the next dab is carried
//! across segment boundaries, so splitting a path into more segments never
//! changes where its dabs land.
//!
//! Stroke-level jitter displaces the recorded points themselves. Brush-level
//! jitter is applied later, per dab, by the rasterizer and is never stored.

use glam::{IVec2, Vec2};
use tessera_config::StrokeConfig;
use tracing::debug;

use crate::constants::{DEGENERATE_SEGMENT_LENGTH, MIN_SPACING};

/// Slack allowed when deciding whether a dab falls on the end of a segment
const END_TOLERANCE: f32 = 1.0e-4;

/// Source of uniform random numbers for positional jitter.
pub trait JitterSource {
    /// Uniform sample in `[0, 1)`
    fn next_unit(&mut self) -> f32;

    /// Uniform sample inside a disk of the given radius
    fn disk(&mut self, radius: f32) -> Vec2 {
        if radius <= 0.0 {
            return Vec2::ZERO;
        }
        let r = self.next_unit().sqrt() * radius;
        let theta = self.next_unit() * std::f32::consts::TAU;
        Vec2::new(r * theta.cos(), r * theta.sin())
    }
}

/// xorshift64* generator, seeded through SplitMix64.
#[derive(Debug, Clone)]
pub struct XorShiftJitter {
    state: u64,
}

impl XorShiftJitter {
    pub fn new(seed: u64) -> Self {
        Self {
            state: splitmix64(seed).max(1),
        }
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(2685821657736338717)
    }
}

impl Default for XorShiftJitter {
    fn default() -> Self {
        Self::new(0)
    }
}

impl JitterSource for XorShiftJitter {
    #[inline]
    fn next_unit(&mut self) -> f32 {
        // 24-bit mantissa precision
        let v = (self.next_u64() >> 40) as f32;
        v / (1u32 << 24) as f32
    }
}

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Points and carried spacing of the active stroke
#[derive(Debug, Clone)]
struct StrokeState {
    points: Vec<Vec2>,
    /// Distance along the next segment at which the next dab is due
    offset: f32,
    /// Index of the first point of the oldest segment not yet sampled
    next_segment: usize,
}

/// Converts a pointer path into dab positions.
pub struct StrokeSampler {
    spacing: f32,
    min_point_distance: f32,
    jitter_radius: f32,
    jitter: Box<dyn JitterSource>,
    state: Option<StrokeState>,
}

impl Default for StrokeSampler {
    fn default() -> Self {
        Self::from_config(&StrokeConfig::default())
    }
}

impl StrokeSampler {
    /// Sampler with absolute `spacing` in world units and no jitter
    pub fn new(spacing: f32, min_point_distance: f32) -> Self {
        Self {
            spacing: spacing.max(MIN_SPACING),
            min_point_distance,
            jitter_radius: 0.0,
            jitter: Box::new(XorShiftJitter::default()),
            state: None,
        }
    }

    /// Sampler configured from stroke settings.
    ///
    /// `config.spacing` is taken as world units here; callers using
    /// proportional spacing set the resolved value with [`Self::set_spacing`].
    pub fn from_config(config: &StrokeConfig) -> Self {
        Self {
            spacing: config.spacing.max(MIN_SPACING),
            min_point_distance: config.min_point_distance,
            jitter_radius: config.stroke_jitter.max(0.0),
            jitter: Box::new(XorShiftJitter::new(config.jitter_seed)),
            state: None,
        }
    }

    /// Replace the random source used for stroke-level jitter
    pub fn with_jitter_source(mut self, jitter: Box<dyn JitterSource>) -> Self {
        self.jitter = jitter;
        self
    }

    #[inline]
    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    /// Set the dab spacing in world units; takes effect on the next segment
    pub fn set_spacing(&mut self, spacing: f32) {
        self.spacing = spacing.max(MIN_SPACING);
    }

    pub fn set_jitter_radius(&mut self, radius: f32) {
        self.jitter_radius = radius.max(0.0);
    }

    pub fn set_min_point_distance(&mut self, distance: f32) {
        self.min_point_distance = distance.max(0.0);
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    /// Recorded (jittered) points of the active stroke
    pub fn points(&self) -> &[Vec2] {
        self.state
            .as_ref()
            .map(|s| s.points.as_slice())
            .unwrap_or(&[])
    }

    /// Begin a stroke at `point`. Any stroke still active is discarded.
    pub fn start(&mut self, point: Vec2) {
        if let Some(previous) = self.state.take() {
            debug!(
                "StrokeSampler: discarding unfinished stroke of {} points",
                previous.points.len()
            );
        }
        let point = point + self.jitter.disk(self.jitter_radius);
        self.state = Some(StrokeState {
            points: vec![point],
            offset: 0.0,
            next_segment: 0,
        });
    }

    /// Extend the active stroke and return the dabs of every newly completed segment.
    ///
    /// The newest segment stays pending: its end point may still be collapsed
    /// by the next point.
    pub fn add_point(&mut self, point: Vec2) -> Vec<Vec2> {
        let point = point + self.jitter.disk(self.jitter_radius);
        let spacing = self.spacing;
        let min_distance = self.min_point_distance;
        let Some(state) = self.state.as_mut() else {
            debug!("StrokeSampler: add_point without an active stroke");
            return Vec::new();
        };

        let len = state.points.len();
        if state.points[len - 1].distance(point) <= DEGENERATE_SEGMENT_LENGTH {
            return Vec::new();
        }
        if len >= 2
            && state.next_segment < len - 1
            && state.points[len - 2].distance(point) < min_distance
        {
            // Collapse the middle point of a micro back-and-forth
            state.points.pop();
        }
        state.points.push(point);

        let complete = state.points.len().saturating_sub(2);
        state.sample_until(complete, spacing)
    }

    /// End the stroke, returning the dabs of the remaining segment.
    ///
    /// A stroke that never moved yields exactly one dab at its start point.
    pub fn finish(&mut self) -> Vec<Vec2> {
        let Some(mut state) = self.state.take() else {
            return Vec::new();
        };
        if state.points.len() == 1 {
            return vec![state.points[0]];
        }
        let last = state.points.len() - 1;
        state.sample_until(last, self.spacing)
    }

    /// Sample one segment.
    ///
    /// Dabs are placed at `offset`, `offset + spacing`, … while they lie on the
    /// segment (its end point included). Returns the dabs and the offset
    /// carried into the next segment. A zero-length segment yields one dab at
    /// `p0` and leaves the offset unchanged.
    pub fn segment_dabs(p0: Vec2, p1: Vec2, spacing: f32, offset: f32) -> (Vec<Vec2>, f32) {
        let spacing = spacing.max(MIN_SPACING);
        let delta = p1 - p0;
        let length = delta.length();
        if length <= DEGENERATE_SEGMENT_LENGTH {
            return (vec![p0], offset);
        }

        let direction = delta / length;
        let mut dabs = Vec::new();
        let mut distance = offset.max(0.0);
        while distance <= length + END_TOLERANCE {
            dabs.push(p0 + direction * distance.min(length));
            distance += spacing;
        }
        (dabs, distance - length)
    }
}

impl StrokeState {
    /// Sample every pending segment that ends at or before point index `end`
    fn sample_until(&mut self, end: usize, spacing: f32) -> Vec<Vec2> {
        let mut dabs = Vec::new();
        while self.next_segment < end {
            let p0 = self.points[self.next_segment];
            let p1 = self.points[self.next_segment + 1];
            let (segment, offset) = StrokeSampler::segment_dabs(p0, p1, spacing, self.offset);
            dabs.extend(segment);
            self.offset = offset;
            self.next_segment += 1;
        }
        dabs
    }
}

/// Integer pixels on the line from `start` to `end`, both ends included.
///
/// Used by the exact-pixel pencil, which marks whole pixels instead of
/// stamping dabs.
pub fn pixel_line(start: IVec2, end: IVec2) -> Vec<IVec2> {
    let delta = (end - start).abs();
    let step = IVec2::new((end.x - start.x).signum(), (end.y - start.y).signum());
    let mut error = delta.x - delta.y;
    let mut current = start;
    let mut pixels = Vec::with_capacity(delta.max_element() as usize + 1);

    loop {
        pixels.push(current);
        if current == end {
            break;
        }
        let doubled = error * 2;
        if doubled > -delta.y {
            error -= delta.y;
            current.x += step.x;
        }
        if doubled < delta.x {
            error += delta.x;
            current.y += step.y;
        }
    }
    pixels
}
