// Sensor trait for the polled power plug
use crate::domain::reading::SensorReading;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("sensor request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("sensor answered with status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed sensor payload: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait Sensor: Send + Sync {
    /// Read the current state of the sensor. Failures are transient.
    async fn poll(&self) -> Result<SensorReading, SensorError>;
}
