use thiserror::Error;

use crate::{Point, Segment};

/// Upper bound accepted by [`ResampleConfig::validate`].
pub const MAX_BUCKETS: i64 = 4096;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResampleError {
    #[error("cannot resample an empty segment array")]
    InvalidInput,
    #[error("num_buckets must be in 1..={max}, got {num_buckets}")]
    DegenerateConfig { num_buckets: i64, max: i64 },
}

/// Number of coordinates the resampler must have pushed before it stops.
pub fn target_len(num_buckets: i64) -> i64 {
    num_buckets.saturating_mul(2).saturating_sub(1)
}

/// Strides through `segments` starting at `start_index`, `gap` entries at a
/// time, wrapping around the array, and flattens every visited segment into
/// `from.x, from.y, to.x, to.y`.
///
/// Sampling stops once at least `2 * num_buckets - 1` coordinates have been
/// pushed. The check happens before each push of four, so the buffer can run
/// up to three coordinates past that threshold; the overshoot is kept as is.
/// A non-positive `num_buckets` yields an empty buffer.
pub fn reduce_data_points_with_spread(
    start_index: i64,
    segments: &[Segment],
    gap: i64,
    num_buckets: i64,
) -> Result<Vec<f32>, ResampleError> {
    if segments.is_empty() {
        return Err(ResampleError::InvalidInput);
    }
    let len = segments.len() as i64;
    let target = target_len(num_buckets);
    let mut samples = Vec::new();
    let mut pointer = start_index;
    while (samples.len() as i64) < target {
        let segment = segments[pointer.rem_euclid(len) as usize];
        samples.extend_from_slice(&[
            segment.from.x,
            segment.from.y,
            segment.to.x,
            segment.to.y,
        ]);
        pointer = pointer.wrapping_add(gap);
    }
    Ok(samples)
}

/// Pairs up a flat sample buffer into points. A trailing odd coordinate is dropped.
pub fn regroup_points(samples: &[f32]) -> Vec<Point> {
    samples
        .chunks_exact(2)
        .map(|pair| Point::new(pair[0], pair[1]))
        .collect()
}

/// Stride that lets one resampling pass over `len` segments reach the end of
/// the array. Every visited segment contributes four coordinates, so the pass
/// makes `ceil(target_len / 4)` visits.
pub fn spread_gap(len: usize, num_buckets: i64) -> i64 {
    let visits = target_len(num_buckets.max(1)).saturating_add(3) / 4;
    (len as i64 / visits.max(1)).max(1)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResampleConfig {
    pub start_index: i64,
    pub gap: i64,
    pub num_buckets: i64,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            start_index: 0,
            gap: 1,
            num_buckets: 32,
        }
    }
}

impl ResampleConfig {
    pub fn validate(&self) -> Result<(), ResampleError> {
        if self.num_buckets < 1 || self.num_buckets > MAX_BUCKETS {
            return Err(ResampleError::DegenerateConfig {
                num_buckets: self.num_buckets,
                max: MAX_BUCKETS,
            });
        }
        Ok(())
    }

    /// Validated resample: rejects configurations that could only produce an
    /// empty or unbounded buffer.
    pub fn apply(&self, segments: &[Segment]) -> Result<Vec<f32>, ResampleError> {
        self.validate()?;
        reduce_data_points_with_spread(self.start_index, segments, self.gap, self.num_buckets)
    }
}
