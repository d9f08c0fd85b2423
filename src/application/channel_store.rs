// Channel store traits for sample persistence and range reads
use crate::domain::channel::{ChannelId, ChannelDef};
use crate::domain::sample::{ChannelWrite, Sample};
use async_trait::async_trait;

#[async_trait]
pub trait ChannelStore: Send + Sync {
    /// Return the id of a channel, registering it first if it does not exist
    async fn resolve_channel_id(&self, channel: &ChannelDef) -> anyhow::Result<ChannelId>;

    /// Samples of one channel with `start_ms <= timestamp <= end_ms`, ordered by timestamp
    async fn query_range(
        &self,
        channel_id: ChannelId,
        start_ms: i64,
        end_ms: i64,
    ) -> anyhow::Result<Vec<Sample>>;

    /// Newest sample of a channel, if any
    async fn latest_sample(&self, channel_id: ChannelId) -> anyhow::Result<Option<Sample>>;

    /// Open a dedicated connection for the persistent writer
    async fn open_sink(&self) -> anyhow::Result<Box<dyn SampleSink>>;
}

/// Exclusive write connection; every insert commits on its own
#[async_trait]
pub trait SampleSink: Send {
    async fn insert(&mut self, write: &ChannelWrite) -> anyhow::Result<()>;
}
