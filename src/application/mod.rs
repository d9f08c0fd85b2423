// Application layer - Ingestion pipeline and query use cases
pub mod channel_store;
pub mod gaps;
pub mod ingest_queue;
pub mod push_listener;
pub mod query_service;
pub mod resampler;
pub mod sampling;
pub mod sensor;
pub mod writer;

#[cfg(test)]
pub mod testing;
