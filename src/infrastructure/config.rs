use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseSettings,
    pub sensor: SensorSettings,
    #[serde(default)]
    pub sampling: SamplingSettings,
    #[serde(default)]
    pub writer: WriterSettings,
    #[serde(default)]
    pub query: QuerySettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub push: PushSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SensorSettings {
    pub url: String,
    #[serde(default = "default_sensor_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SamplingSettings {
    pub period_secs: f64,
    pub retry_delay_secs: u64,
    pub idle_epsilon: f64,
    pub idle_window_secs: u64,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            period_secs: 1.0,
            retry_delay_secs: 10,
            idle_epsilon: 0.001,
            idle_window_secs: 60,
        }
    }
}

impl SamplingSettings {
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(self.period_secs.max(0.001))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    /// Consecutive near-zero ticks after which instantaneous writes are suppressed
    pub fn idle_ticks(&self) -> u32 {
        (self.idle_window_secs as f64 / self.period().as_secs_f64()).ceil() as u32
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WriterSettings {
    pub queue_capacity: usize,
    pub retry_interval_secs: u64,
    pub drain_timeout_secs: u64,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 128,
            retry_interval_secs: 10,
            drain_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct QuerySettings {
    pub default_lookback_hours: i64,
    pub gap_threshold_ms: i64,
    pub fix_render: bool,
    pub interval_ms: i64,
    pub nominal_period_ms: i64,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            default_lookback_hours: 24,
            gap_threshold_ms: 30_000,
            fix_render: true,
            interval_ms: 4000,
            nominal_period_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            allowed_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PushSettings {
    #[serde(default)]
    pub channels: Vec<PushChannel>,
}

/// Maps a meter logger UUID onto one of our channels
#[derive(Debug, Deserialize, Clone)]
pub struct PushChannel {
    pub uuid: String,
    pub channel: String,
}

fn default_connect_timeout_secs() -> u64 {
    20
}

fn default_sensor_timeout_secs() -> u64 {
    5
}

pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/solar-telemetry").required(false))
        .add_source(config::Environment::with_prefix("SOLAR").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
