// Sampling loop - polls the plug on a fixed cadence and turns readings into channel writes
use crate::application::ingest_queue::IngestQueue;
use crate::application::sensor::Sensor;
use crate::domain::channel::{ChannelId, Channels};
use crate::domain::reading::SensorReading;
use crate::domain::sample::ChannelWrite;
use crate::infrastructure::config::SamplingSettings;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Milliseconds until the next multiple of `period` strictly after `now_ms`
pub fn delay_to_next_tick(now_ms: i64, period: Duration) -> Duration {
    let period_ms = (period.as_millis() as i64).max(1);
    let next = (now_ms.div_euclid(period_ms) + 1) * period_ms;
    Duration::from_millis((next - now_ms) as u64)
}

/// Per-tick decisions: idle suppression of the instantaneous channel and
/// deduplication of the per-minute channel
#[derive(Debug, Clone)]
pub struct TickFilter {
    power_channel: ChannelId,
    minute_channel: ChannelId,
    idle_epsilon: f64,
    idle_ticks: u32,
    idle_run: u32,
    last_minute_marker: Option<i64>,
}

impl TickFilter {
    pub fn new(channels: &Channels, settings: &SamplingSettings) -> Self {
        Self {
            power_channel: channels.solar_power,
            minute_channel: channels.solar_power_by_minute,
            idle_epsilon: settings.idle_epsilon,
            idle_ticks: settings.idle_ticks(),
            idle_run: 0,
            last_minute_marker: None,
        }
    }

    /// Writes produced by one successful poll taken at `timestamp_ms`
    pub fn on_reading(&mut self, timestamp_ms: i64, reading: &SensorReading) -> Vec<ChannelWrite> {
        let mut writes = Vec::with_capacity(2);

        let power = reading.solar_power();
        if power < self.idle_epsilon {
            self.idle_run = self.idle_run.saturating_add(1);
        } else {
            self.idle_run = 0;
        }
        if self.idle_run < self.idle_ticks {
            writes.push(ChannelWrite::new(self.power_channel, timestamp_ms, power));
        }

        if self.last_minute_marker != Some(reading.minute_marker) {
            self.last_minute_marker = Some(reading.minute_marker);
            writes.push(ChannelWrite::new(
                self.minute_channel,
                reading.minute_timestamp_ms(),
                reading.minute_avg_power(),
            ));
        }

        writes
    }

    pub fn is_idle(&self) -> bool {
        self.idle_run >= self.idle_ticks
    }
}

pub struct SamplingLoop {
    sensor: Arc<dyn Sensor>,
    queue: IngestQueue,
    filter: TickFilter,
    period: Duration,
    retry_delay: Duration,
}

impl SamplingLoop {
    pub fn new(
        sensor: Arc<dyn Sensor>,
        queue: IngestQueue,
        channels: &Channels,
        settings: &SamplingSettings,
    ) -> Self {
        Self {
            sensor,
            queue,
            filter: TickFilter::new(channels, settings),
            period: settings.period(),
            retry_delay: settings.retry_delay(),
        }
    }

    /// Poll forever until shutdown is signalled. Sensor failures never end the loop.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            "Starting sampling loop (period {:.3}s)",
            self.period.as_secs_f64()
        );

        loop {
            let now_ms = chrono::Utc::now().timestamp_millis();
            let delay = delay_to_next_tick(now_ms, self.period);
            if !sleep_or_shutdown(delay, &mut shutdown).await {
                break;
            }

            let timestamp_ms = chrono::Utc::now().timestamp_millis();
            match self.sensor.poll().await {
                Ok(reading) => self.tick(timestamp_ms, &reading),
                Err(e) => {
                    tracing::warn!("Error polling sensor: {}", e);
                    tracing::info!(
                        "Retrying in {} seconds...",
                        self.retry_delay.as_secs_f64()
                    );
                    if !sleep_or_shutdown(self.retry_delay, &mut shutdown).await {
                        break;
                    }
                }
            }
        }

        tracing::info!("Sampling loop stopped");
    }

    fn tick(&mut self, timestamp_ms: i64, reading: &SensorReading) {
        let was_idle = self.filter.is_idle();
        for write in self.filter.on_reading(timestamp_ms, reading) {
            self.queue.enqueue(write);
        }
        match (was_idle, self.filter.is_idle()) {
            (false, true) => tracing::info!("Solar power idle, suppressing instantaneous samples"),
            (true, false) => tracing::info!("Solar power back, resuming instantaneous samples"),
            _ => {}
        }
    }
}

/// Sleep for `delay`; false when shutdown arrived first
async fn sleep_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    if *shutdown.borrow() {
        return false;
    }
    tokio::select! {
        _ = tokio::time::sleep(delay) => true,
        changed = shutdown.changed() => changed.is_ok() && !*shutdown.borrow(),
    }
}
