// Sensor reading domain model

/// One instantaneous reading as reported by the plug, before any derivation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    /// Active power in W, sign as reported by the hardware
    pub instant_power: f64,
    /// Start of the current minute, unix seconds
    pub minute_marker: i64,
    /// Energy of the last completed minute in mWh
    pub minute_avg_energy: f64,
}

impl SensorReading {
    pub fn new(instant_power: f64, minute_marker: i64, minute_avg_energy: f64) -> Self {
        Self {
            instant_power,
            minute_marker,
            minute_avg_energy,
        }
    }

    /// Solar power in W. The plug reports generation as negative flow.
    pub fn solar_power(&self) -> f64 {
        -self.instant_power
    }

    /// Timestamp in ms of the per-minute sample
    pub fn minute_timestamp_ms(&self) -> i64 {
        self.minute_marker * 1000
    }

    /// Average power in W over the last completed minute (mWh/min -> W)
    pub fn minute_avg_power(&self) -> f64 {
        self.minute_avg_energy * (60.0 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_values() {
        let reading = SensorReading::new(-88.9, 1_748_418_360, 1047.135);

        assert_eq!(reading.solar_power(), 88.9);
        assert_eq!(reading.minute_timestamp_ms(), 1_748_418_360_000);
        assert!((reading.minute_avg_power() - 62.8281).abs() < 1e-9);
    }
}
