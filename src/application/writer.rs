// Persistent writer - drains the ingestion queue into the channel store
use crate::application::channel_store::{ChannelStore, SampleSink};
use crate::application::ingest_queue::IngestReceiver;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// How a connection session ended
enum Session {
    /// Queue closed and fully drained
    Finished,
    /// Store failed; the connection is discarded and reopened after the retry interval
    Failed(anyhow::Error),
}

pub struct PersistentWriter {
    store: Arc<dyn ChannelStore>,
    retry_interval: Duration,
}

impl PersistentWriter {
    pub fn new(store: Arc<dyn ChannelStore>, retry_interval: Duration) -> Self {
        Self {
            store,
            retry_interval,
        }
    }

    /// Run until shutdown is signalled and the buffered writes are committed.
    ///
    /// Delivery is at-most-once: a write that was dequeued when the store failed is lost.
    pub async fn run(self, mut queue: IngestReceiver, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Starting persistent writer");

        loop {
            let failure = match self.store.open_sink().await {
                Ok(sink) => match self.session(sink, &mut queue, &mut shutdown).await {
                    Session::Finished => break,
                    Session::Failed(e) => e,
                },
                Err(e) => e,
            };

            tracing::error!("Error in persistent writer: {:#}", failure);
            tracing::info!(
                "Retrying in {} seconds...",
                self.retry_interval.as_secs_f64()
            );

            if stop_requested(&shutdown) {
                // Nothing can be committed without a connection; retry quickly while draining
                tokio::time::sleep(self.retry_interval.min(Duration::from_secs(1))).await;
                continue;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.retry_interval) => {}
                _ = shutdown.changed() => {}
            }
        }

        tracing::info!("Persistent writer stopped");
    }

    async fn session(
        &self,
        mut sink: Box<dyn SampleSink>,
        queue: &mut IngestReceiver,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Session {
        let mut draining = stop_requested(shutdown);
        if draining {
            queue.close();
        }

        loop {
            let next = if draining {
                queue.recv().await
            } else {
                tokio::select! {
                    write = queue.recv() => write,
                    _ = shutdown.changed() => {
                        if stop_requested(shutdown) {
                            queue.close();
                            draining = true;
                        }
                        continue;
                    }
                }
            };

            let Some(write) = next else {
                return Session::Finished;
            };

            if let Err(e) = sink.insert(&write).await {
                tracing::warn!(
                    "Lost write for channel {} at {}",
                    write.channel_id,
                    write.timestamp
                );
                return Session::Failed(e);
            }
            tracing::debug!(
                "Committed channel {} at {}: {}",
                write.channel_id,
                write.timestamp,
                write.value
            );
        }
    }
}

/// True once shutdown was signalled or the signalling side went away
fn stop_requested(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow() || shutdown.has_changed().is_err()
}
