use doodleboard_shared::{spread_gap, Point, ResampleConfig, ResampleError, Segment};

pub const DEFAULT_BUCKETS: i64 = 32;

/// Segments collected between pointer down and pointer up.
#[derive(Default)]
pub struct Gesture {
    last: Option<Point>,
    segments: Vec<Segment>,
}

impl Gesture {
    pub fn start(point: Point) -> Self {
        Self {
            last: Some(point),
            segments: Vec::new(),
        }
    }

    /// Extends the gesture to `point`, returning the new segment. Repeated or
    /// non-finite points produce nothing.
    pub fn extend(&mut self, point: Point) -> Option<Segment> {
        if !point.is_finite() {
            return None;
        }
        let last = self.last.replace(point)?;
        if last == point {
            return None;
        }
        let segment = Segment::new(last, point);
        self.segments.push(segment);
        Some(segment)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn resample_config(&self, num_buckets: i64) -> ResampleConfig {
        ResampleConfig {
            start_index: 0,
            gap: spread_gap(self.segments.len(), num_buckets),
            num_buckets,
        }
    }

    /// Reduced-fidelity samples for storage. A tap without movement has no
    /// segments and yields `InvalidInput`.
    pub fn samples(&self, config: ResampleConfig) -> Result<Vec<f32>, ResampleError> {
        config.apply(&self.segments)
    }
}
