// Meter push listener - maps pushed logger readings onto channel writes
use crate::application::ingest_queue::IngestQueue;
use crate::application::query_service::FAR_FUTURE_MS;
use crate::domain::channel::{ChannelId, Channels};
use crate::domain::sample::ChannelWrite;
use crate::infrastructure::config::PushChannel;
use serde::Deserialize;
use std::collections::HashMap;

/// Body pushed by the meter logger
#[derive(Debug, Deserialize)]
pub struct PushPayload {
    #[serde(default)]
    pub data: Vec<PushedChannel>,
}

#[derive(Debug, Deserialize)]
pub struct PushedChannel {
    pub uuid: String,
    /// `[timestamp_ms, value, ...]`; trailing fields are ignored
    #[serde(default)]
    pub tuples: Vec<Vec<f64>>,
}

#[derive(Clone)]
pub struct MeterPushListener {
    queue: IngestQueue,
    routes: HashMap<String, ChannelId>,
}

impl MeterPushListener {
    pub fn new(queue: IngestQueue, channels: &Channels, mapping: &[PushChannel]) -> Self {
        let mut routes = HashMap::new();
        for entry in mapping {
            match channels.id_for(&entry.channel) {
                Some(id) => {
                    routes.insert(entry.uuid.clone(), id);
                }
                None => tracing::warn!(
                    "Ignoring push mapping for {}: unknown channel {}",
                    entry.uuid,
                    entry.channel
                ),
            }
        }
        Self { queue, routes }
    }

    /// Enqueue every mapped tuple; returns how many writes were accepted by the queue
    pub fn accept(&self, payload: PushPayload) -> usize {
        let mut accepted = 0;
        for pushed in payload.data {
            let Some(&channel_id) = self.routes.get(&pushed.uuid) else {
                tracing::debug!("Ignoring push for unmapped uuid {}", pushed.uuid);
                continue;
            };
            for tuple in pushed.tuples {
                let (Some(&timestamp), Some(&value)) = (tuple.first(), tuple.get(1)) else {
                    tracing::warn!("Ignoring short tuple from {}", pushed.uuid);
                    continue;
                };
                let Some((timestamp, value)) = checked_tuple(timestamp, value) else {
                    tracing::warn!(
                        "Ignoring out-of-range tuple [{}, {}] from {}",
                        timestamp,
                        value,
                        pushed.uuid
                    );
                    continue;
                };
                if self
                    .queue
                    .enqueue(ChannelWrite::new(channel_id, timestamp, value))
                {
                    accepted += 1;
                }
            }
        }
        accepted
    }
}

/// Whole-millisecond timestamp within `[0, FAR_FUTURE_MS]` and a finite value
/// that survives the store's single-precision column
fn checked_tuple(timestamp: f64, value: f64) -> Option<(i64, f64)> {
    let timestamp_ok = timestamp.is_finite()
        && timestamp.fract() == 0.0
        && (0.0..=FAR_FUTURE_MS as f64).contains(&timestamp);
    let value_ok = value.is_finite() && value.abs() <= f32::MAX as f64;
    (timestamp_ok && value_ok).then_some((timestamp as i64, value))
}
