// In-memory fakes of the store and sensor traits for unit tests
use crate::application::channel_store::{ChannelStore, SampleSink};
use crate::application::sensor::{Sensor, SensorError};
use crate::domain::channel::{ChannelId, ChannelDef};
use crate::domain::reading::SensorReading;
use crate::domain::sample::{ChannelWrite, Sample};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct MemoryState {
    channels: HashMap<String, ChannelId>,
    data: BTreeMap<(ChannelId, i64), f64>,
    failing_reads: bool,
    /// Number of upcoming sink operations (open or insert) that fail
    sink_failures: usize,
}

/// Channel store backed by a map keyed like the real table
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    pub opened_sinks: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, channel_id: ChannelId, timestamp: i64, value: f64) {
        self.state
            .lock()
            .unwrap()
            .data
            .insert((channel_id, timestamp), value);
    }

    pub fn samples(&self, channel_id: ChannelId) -> Vec<Sample> {
        self.state
            .lock()
            .unwrap()
            .data
            .range((channel_id, i64::MIN)..=(channel_id, i64::MAX))
            .map(|(&(_, ts), &value)| Sample::new(ts, value))
            .collect()
    }

    pub fn fail_reads(&self, failing: bool) {
        self.state.lock().unwrap().failing_reads = failing;
    }

    pub fn fail_next_sink_ops(&self, count: usize) {
        self.state.lock().unwrap().sink_failures = count;
    }

    fn take_sink_failure(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.sink_failures > 0 {
            state.sink_failures -= 1;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl ChannelStore for MemoryStore {
    async fn resolve_channel_id(&self, channel: &ChannelDef) -> anyhow::Result<ChannelId> {
        let mut state = self.state.lock().unwrap();
        let next_id = state.channels.len() as ChannelId + 1;
        Ok(*state
            .channels
            .entry(channel.name.to_string())
            .or_insert(next_id))
    }

    async fn query_range(
        &self,
        channel_id: ChannelId,
        start_ms: i64,
        end_ms: i64,
    ) -> anyhow::Result<Vec<Sample>> {
        let state = self.state.lock().unwrap();
        if state.failing_reads {
            anyhow::bail!("connection refused");
        }
        if start_ms > end_ms {
            return Ok(Vec::new());
        }
        Ok(state
            .data
            .range((channel_id, start_ms)..=(channel_id, end_ms))
            .map(|(&(_, ts), &value)| Sample::new(ts, value))
            .collect())
    }

    async fn latest_sample(&self, channel_id: ChannelId) -> anyhow::Result<Option<Sample>> {
        let state = self.state.lock().unwrap();
        if state.failing_reads {
            anyhow::bail!("connection refused");
        }
        Ok(state
            .data
            .range((channel_id, i64::MIN)..=(channel_id, i64::MAX))
            .next_back()
            .map(|(&(_, ts), &value)| Sample::new(ts, value)))
    }

    async fn open_sink(&self) -> anyhow::Result<Box<dyn SampleSink>> {
        self.opened_sinks.fetch_add(1, Ordering::SeqCst);
        if self.take_sink_failure() {
            anyhow::bail!("cannot connect");
        }
        Ok(Box::new(MemorySink {
            store: self.clone(),
        }))
    }
}

struct MemorySink {
    store: MemoryStore,
}

#[async_trait]
impl SampleSink for MemorySink {
    async fn insert(&mut self, write: &ChannelWrite) -> anyhow::Result<()> {
        if self.store.take_sink_failure() {
            anyhow::bail!("lost connection");
        }
        self.store
            .insert(write.channel_id, write.timestamp, write.value);
        Ok(())
    }
}

/// Sensor replaying a scripted sequence; repeats the last entry once exhausted
pub struct ScriptedSensor {
    script: Mutex<VecDeque<Result<SensorReading, String>>>,
    pub polls: AtomicUsize,
}

impl ScriptedSensor {
    pub fn new(script: Vec<Result<SensorReading, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            polls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Sensor for ScriptedSensor {
    async fn poll(&self) -> Result<SensorReading, SensorError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        let next = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        match next {
            Some(Ok(reading)) => Ok(reading),
            Some(Err(message)) => Err(SensorError::Malformed(message)),
            None => Err(SensorError::Malformed("empty script".to_string())),
        }
    }
}
