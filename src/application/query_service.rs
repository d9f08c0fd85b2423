// Query service - range reads and the combined solar/meter view
use crate::application::channel_store::ChannelStore;
use crate::application::gaps::insert_gaps;
use crate::application::resampler::{IntervalResampler, load_and_savings};
use crate::domain::channel::{ChannelId, Channels};
use crate::domain::sample::{GappedSeries, Sample, SeriesEntry};
use crate::domain::view::CombinedView;
use crate::infrastructure::config::QuerySettings;
use std::sync::Arc;

/// Upper bound used when a request gives no end time
pub const FAR_FUTURE_MS: i64 = 253_402_300_799_999;

#[derive(Clone)]
pub struct RangeQueryEngine {
    store: Arc<dyn ChannelStore>,
}

impl RangeQueryEngine {
    pub fn new(store: Arc<dyn ChannelStore>) -> Self {
        Self { store }
    }

    /// Raw samples of a channel in `[start_ms, end_ms]`. Store errors degrade to an empty series.
    pub async fn fetch(&self, channel_id: ChannelId, start_ms: i64, end_ms: i64) -> Vec<Sample> {
        if start_ms > end_ms {
            return Vec::new();
        }
        match self.store.query_range(channel_id, start_ms, end_ms).await {
            Ok(samples) => samples,
            Err(e) => {
                tracing::error!("Error querying channel {}: {:#}", channel_id, e);
                Vec::new()
            }
        }
    }

    pub async fn latest(&self, channel_id: ChannelId) -> Option<Sample> {
        match self.store.latest_sample(channel_id).await {
            Ok(sample) => sample,
            Err(e) => {
                tracing::error!("Error fetching latest sample of channel {}: {:#}", channel_id, e);
                None
            }
        }
    }
}

#[derive(Clone)]
pub struct CombinedViewService {
    engine: RangeQueryEngine,
    channels: Channels,
    resampler: IntervalResampler,
    settings: QuerySettings,
}

impl CombinedViewService {
    pub fn new(engine: RangeQueryEngine, channels: Channels, settings: QuerySettings) -> Self {
        let resampler = IntervalResampler::new(settings.interval_ms, settings.nominal_period_ms);
        Self {
            engine,
            channels,
            resampler,
            settings,
        }
    }

    /// Now minus the configured lookback; the epoch when that is out of range
    fn default_start_ms(&self) -> i64 {
        let hours = self.settings.default_lookback_hours;
        chrono::Duration::try_hours(hours)
            .and_then(|lookback| chrono::Utc::now().checked_sub_signed(lookback))
            .map_or_else(
                || {
                    tracing::warn!("Lookback of {} hours is out of range, using the epoch", hours);
                    0
                },
                |start| start.timestamp_millis(),
            )
    }

    /// Build the view for `[start, end]`; missing bounds default to the lookback window
    /// ending in the far future.
    pub async fn get_combined_view(&self, start_ms: Option<i64>, end_ms: Option<i64>) -> CombinedView {
        let start = start_ms.unwrap_or_else(|| self.default_start_ms());
        let end = end_ms.unwrap_or(FAR_FUTURE_MS);

        let (solar, meter, latest_meter_energy) = tokio::join!(
            self.engine.fetch(self.channels.solar_power, start, end),
            self.engine.fetch(self.channels.meter_power, start, end),
            self.engine.latest(self.channels.meter_energy),
        );
        tracing::debug!(
            "Combined view [{}, {}]: {} solar, {} meter samples",
            start,
            end,
            solar.len(),
            meter.len()
        );

        let solar_entries: Vec<SeriesEntry> = solar.iter().copied().map(SeriesEntry::from).collect();
        let meter_entries: Vec<SeriesEntry> = meter.iter().copied().map(SeriesEntry::from).collect();
        let (load, savings) =
            load_and_savings(&self.resampler, start, end, &meter_entries, &solar_entries);

        let threshold = self.settings.gap_threshold_ms;
        let fix_render = self.settings.fix_render;
        CombinedView {
            solar: GappedSeries::from(insert_gaps(&solar, threshold, fix_render).as_slice()),
            meter_power: GappedSeries::from(insert_gaps(&meter, threshold, fix_render).as_slice()),
            load,
            savings,
            latest_meter_energy,
        }
    }
}
