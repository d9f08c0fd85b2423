// Sample and series domain models
use super::channel::ChannelId;
use serde::Serialize;

/// One stored reading of a channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp: i64,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// A pending insert travelling through the ingestion queue
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelWrite {
    pub channel_id: ChannelId,
    pub timestamp: i64,
    pub value: f64,
}

impl ChannelWrite {
    pub fn new(channel_id: ChannelId, timestamp: i64, value: f64) -> Self {
        Self {
            channel_id,
            timestamp,
            value,
        }
    }
}

/// Entry of a query-side series: either a sample or an explicit gap marker
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeriesEntry {
    Point(Sample),
    Gap,
}

impl SeriesEntry {
    pub fn point(timestamp: i64, value: f64) -> Self {
        SeriesEntry::Point(Sample::new(timestamp, value))
    }

    pub fn sample(&self) -> Option<&Sample> {
        match self {
            SeriesEntry::Point(sample) => Some(sample),
            SeriesEntry::Gap => None,
        }
    }
}

impl From<Sample> for SeriesEntry {
    fn from(sample: Sample) -> Self {
        SeriesEntry::Point(sample)
    }
}

/// Column layout sent to chart clients; gaps are `null` in both columns
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GappedSeries {
    pub timestamps: Vec<Option<i64>>,
    pub values: Vec<Option<f64>>,
}

impl From<&[SeriesEntry]> for GappedSeries {
    fn from(entries: &[SeriesEntry]) -> Self {
        let mut series = GappedSeries {
            timestamps: Vec::with_capacity(entries.len()),
            values: Vec::with_capacity(entries.len()),
        };
        for entry in entries {
            match entry {
                SeriesEntry::Point(sample) => {
                    series.timestamps.push(Some(sample.timestamp));
                    series.values.push(Some(sample.value));
                }
                SeriesEntry::Gap => {
                    series.timestamps.push(None);
                    series.values.push(None);
                }
            }
        }
        series
    }
}

/// Fixed-grid series produced by the resampler; always numeric
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BucketSeries {
    pub timestamps: Vec<i64>,
    pub values: Vec<f64>,
}

impl BucketSeries {
    pub fn new(timestamps: Vec<i64>, values: Vec<f64>) -> Self {
        Self { timestamps, values }
    }
}
