// Shelly plug sensor polled over its HTTP RPC API (Switch.GetStatus)
use crate::application::sensor::{Sensor, SensorError};
use crate::domain::reading::SensorReading;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct SwitchStatus {
    apower: f64,
    /// Returned (negative) energy counter, i.e. what the panel fed in
    ret_aenergy: EnergyCounter,
}

#[derive(Debug, Deserialize)]
struct EnergyCounter {
    /// mWh per minute for the last completed minutes, newest first
    by_minute: Vec<f64>,
    minute_ts: i64,
}

#[derive(Debug, Clone)]
pub struct ShellySensor {
    client: reqwest::Client,
    url: String,
}

impl ShellySensor {
    pub fn new(url: String, timeout: Duration) -> Result<Self, SensorError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }
}

fn reading_from_status(status: SwitchStatus) -> Result<SensorReading, SensorError> {
    let energy = status
        .ret_aenergy
        .by_minute
        .first()
        .copied()
        .ok_or_else(|| SensorError::Malformed("ret_aenergy.by_minute is empty".to_string()))?;

    Ok(SensorReading::new(
        status.apower,
        status.ret_aenergy.minute_ts,
        energy,
    ))
}

#[async_trait]
impl Sensor for ShellySensor {
    async fn poll(&self) -> Result<SensorReading, SensorError> {
        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(SensorError::Status(response.status()));
        }

        let status = response.json::<SwitchStatus>().await?;
        reading_from_status(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_from_status_payload() {
        let payload = r#"{
            "id": 0,
            "source": "WS_in",
            "output": true,
            "apower": -88.9,
            "voltage": 233.2,
            "aenergy": {"total": 21.78, "by_minute": [1047.135, 837.708, 628.281], "minute_ts": 1748418360},
            "ret_aenergy": {"total": 21.78, "by_minute": [1047.135, 837.708, 628.281], "minute_ts": 1748418360},
            "temperature": {"tC": 37.3, "tF": 99.1}
        }"#;
        let status: SwitchStatus = serde_json::from_str(payload).unwrap();

        let reading = reading_from_status(status).unwrap();

        assert_eq!(reading, SensorReading::new(-88.9, 1_748_418_360, 1047.135));
    }

    #[test]
    fn test_empty_minute_history_is_malformed() {
        let payload = r#"{"apower": 0.0, "ret_aenergy": {"by_minute": [], "minute_ts": 1}}"#;
        let status: SwitchStatus = serde_json::from_str(payload).unwrap();

        assert!(matches!(
            reading_from_status(status),
            Err(SensorError::Malformed(_))
        ));
    }
}
