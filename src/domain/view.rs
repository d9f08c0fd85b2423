// Combined view returned to chart clients
use super::sample::{BucketSeries, GappedSeries, Sample};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CombinedView {
    pub solar: GappedSeries,
    pub meter_power: GappedSeries,
    pub load: BucketSeries,
    pub savings: BucketSeries,
    pub latest_meter_energy: Option<Sample>,
}
