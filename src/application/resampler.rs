// Interval resampler - spreads irregular samples over a fixed time grid
use crate::domain::sample::{BucketSeries, SeriesEntry};

pub const DEFAULT_INTERVAL_MS: i64 = 4000;
pub const DEFAULT_NOMINAL_PERIOD_MS: i64 = 1000;

/// Several channels accumulated onto one shared bucket grid
#[derive(Debug, Clone, PartialEq)]
pub struct Resampled {
    /// Bucket labels, `(b + 1) * width - width / 2` for absolute bucket index `b`
    pub timestamps: Vec<i64>,
    /// Average value per bucket, one vector per input channel, in input order
    pub channels: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Copy)]
pub struct IntervalResampler {
    interval_ms: i64,
    nominal_period_ms: i64,
}

impl Default for IntervalResampler {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL_MS, DEFAULT_NOMINAL_PERIOD_MS)
    }
}

impl IntervalResampler {
    pub fn new(interval_ms: i64, nominal_period_ms: i64) -> Self {
        Self {
            interval_ms: interval_ms.max(1),
            nominal_period_ms: nominal_period_ms.max(0),
        }
    }

    /// Accumulate every input over `[start_ms, end_ms]`.
    ///
    /// Each sample is weighted by the time since the previous sample of its channel
    /// (the first one by the nominal period) and that weight is split across the buckets
    /// the interval overlaps. The window is clipped to the data actually present; `None`
    /// when any input has no samples.
    pub fn resample(&self, start_ms: i64, end_ms: i64, inputs: &[&[SeriesEntry]]) -> Option<Resampled> {
        if inputs.is_empty() {
            return None;
        }

        let mut first_ts = i64::MAX;
        let mut last_ts = i64::MIN;
        for input in inputs {
            let (first, last) = coverage(input)?;
            first_ts = first_ts.min(first);
            last_ts = last_ts.max(last);
        }

        let start = start_ms.max(first_ts);
        let end = end_ms.min(last_ts);
        if start > end {
            return None;
        }

        let width = self.interval_ms;
        let first_bucket = start.div_euclid(width);
        let last_bucket = end.div_euclid(width);
        let count = (last_bucket - first_bucket + 1) as usize;

        let timestamps = (first_bucket..=last_bucket)
            .map(|b| b.saturating_add(1).saturating_mul(width) - width / 2)
            .collect();

        let channels = inputs
            .iter()
            .map(|input| {
                let mut buckets = vec![0.0; count];
                self.accumulate(input, first_bucket, &mut buckets);
                for value in &mut buckets {
                    *value /= width as f64;
                }
                buckets
            })
            .collect();

        Some(Resampled {
            timestamps,
            channels,
        })
    }

    fn accumulate(&self, input: &[SeriesEntry], first_bucket: i64, buckets: &mut [f64]) {
        let width = self.interval_ms;
        let mut prev_ts: Option<i64> = None;

        for sample in input.iter().filter_map(SeriesEntry::sample) {
            let from = prev_ts.unwrap_or(sample.timestamp.saturating_sub(self.nominal_period_ms));
            let to = sample.timestamp;
            prev_ts = Some(to);

            let duration = to.saturating_sub(from);
            if duration <= 0 {
                continue;
            }
            let weight = sample.value * duration as f64;

            let mut lo = from;
            while lo < to {
                let bucket = lo.div_euclid(width);
                let hi = bucket
                    .checked_add(1)
                    .and_then(|next| next.checked_mul(width))
                    .map_or(to, |edge| edge.min(to));
                let index = bucket - first_bucket;
                if index >= 0 && (index as usize) < buckets.len() {
                    buckets[index as usize] += weight * (hi - lo) as f64 / duration as f64;
                }
                lo = hi;
            }
        }
    }
}

/// First and last sample timestamp of a series, skipping gap markers
fn coverage(input: &[SeriesEntry]) -> Option<(i64, i64)> {
    let mut samples = input.iter().filter_map(SeriesEntry::sample);
    let first = samples.next()?.timestamp;
    let last = samples.last().map_or(first, |s| s.timestamp);
    Some((first, last))
}

/// Grid draw per bucket, floored at zero
pub fn load(meter: f64, solar: f64) -> f64 {
    (meter + solar).max(0.0)
}

/// Solar generation that replaced grid draw, floored at zero
pub fn savings(meter: f64, solar: f64) -> f64 {
    (meter.min(0.0) + solar).max(0.0)
}

/// Derive load and savings from meter and solar power resampled onto one grid.
/// Both are empty when either channel has no data in the window.
pub fn load_and_savings(
    resampler: &IntervalResampler,
    start_ms: i64,
    end_ms: i64,
    meter: &[SeriesEntry],
    solar: &[SeriesEntry],
) -> (BucketSeries, BucketSeries) {
    let Some(resampled) = resampler.resample(start_ms, end_ms, &[meter, solar]) else {
        return (BucketSeries::default(), BucketSeries::default());
    };

    let meter = &resampled.channels[0];
    let solar = &resampled.channels[1];
    let loads = meter.iter().zip(solar).map(|(&m, &s)| load(m, s)).collect();
    let saved = meter.iter().zip(solar).map(|(&m, &s)| savings(m, s)).collect();

    (
        BucketSeries::new(resampled.timestamps.clone(), loads),
        BucketSeries::new(resampled.timestamps, saved),
    )
}
