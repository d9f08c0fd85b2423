// HTTP request handlers
use crate::application::push_listener::PushPayload;
use crate::domain::view::CombinedView;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PushAck {
    pub accepted: usize,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Solar, meter, load and savings series for the requested window
pub async fn combined_view(
    Query(range): Query<RangeQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<CombinedView> {
    let view = state
        .view_service
        .get_combined_view(range.start, range.end)
        .await;
    Json(view)
}

/// Readings pushed by the meter logger
pub async fn push_readings(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PushPayload>,
) -> Json<PushAck> {
    let accepted = state.push_listener.accept(payload);
    tracing::debug!("Accepted {} pushed readings", accepted);
    Json(PushAck { accepted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ingest_queue::ingest_queue;
    use crate::application::push_listener::MeterPushListener;
    use crate::application::query_service::{CombinedViewService, RangeQueryEngine};
    use crate::application::testing::MemoryStore;
    use crate::domain::channel::Channels;
    use crate::infrastructure::config::{PushChannel, QuerySettings};

    const CHANNELS: Channels = Channels {
        solar_power: 1,
        solar_power_by_minute: 2,
        meter_power: 3,
        meter_energy: 4,
    };

    fn state(store: &MemoryStore) -> (Arc<AppState>, crate::application::ingest_queue::IngestReceiver) {
        let (queue, receiver) = ingest_queue(8);
        let engine = RangeQueryEngine::new(Arc::new(store.clone()));
        let mapping = vec![PushChannel {
            uuid: "meter".to_string(),
            channel: "meter_power".to_string(),
        }];
        let state = AppState {
            view_service: CombinedViewService::new(engine, CHANNELS, QuerySettings::default()),
            push_listener: MeterPushListener::new(queue, &CHANNELS, &mapping),
        };
        (Arc::new(state), receiver)
    }

    #[tokio::test]
    async fn test_combined_view_serializes_gaps_as_null() {
        let store = MemoryStore::new();
        store.insert(CHANNELS.solar_power, 1000, 100.0);
        store.insert(CHANNELS.solar_power, 100_000, 120.0);
        let (state, _receiver) = state(&store);

        let Json(view) = combined_view(
            Query(RangeQuery {
                start: Some(0),
                end: Some(200_000),
            }),
            State(state),
        )
        .await;
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["solar"]["timestamps"][1], serde_json::Value::Null);
        assert_eq!(json["load"]["timestamps"], serde_json::json!([]));
        assert_eq!(json["latest_meter_energy"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_push_readings_enqueues_writes() {
        let store = MemoryStore::new();
        let (state, mut receiver) = state(&store);
        let payload: PushPayload =
            serde_json::from_str(r#"{"data": [{"uuid": "meter", "tuples": [[5000, -42.0, 1]]}]}"#)
                .unwrap();

        let Json(ack) = push_readings(State(state), Json(payload)).await;

        assert_eq!(ack, PushAck { accepted: 1 });
        assert_eq!(receiver.recv().await.map(|w| w.value), Some(-42.0));
    }
}
