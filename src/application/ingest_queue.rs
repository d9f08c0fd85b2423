// Bounded ingestion queue between producers and the persistent writer
use crate::domain::sample::ChannelWrite;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Producer handle. Cloned into every task that emits writes.
#[derive(Clone)]
pub struct IngestQueue {
    tx: mpsc::Sender<ChannelWrite>,
    dropped: Arc<AtomicU64>,
}

/// Consumer side, owned by the persistent writer
pub struct IngestReceiver {
    rx: mpsc::Receiver<ChannelWrite>,
}

pub fn ingest_queue(capacity: usize) -> (IngestQueue, IngestReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        IngestQueue {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        IngestReceiver { rx },
    )
}

impl IngestQueue {
    /// Hand a write to the writer without waiting. Returns false when the write was dropped.
    pub fn enqueue(&self, write: ChannelWrite) -> bool {
        match self.tx.try_send(write) {
            Ok(()) => true,
            Err(TrySendError::Full(write)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    "Ingestion queue is full, dropping write for channel {} at {}",
                    write.channel_id,
                    write.timestamp
                );
                false
            }
            Err(TrySendError::Closed(write)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    "Ingestion queue is closed, dropping write for channel {} at {}",
                    write.channel_id,
                    write.timestamp
                );
                false
            }
        }
    }

    /// Number of writes discarded since startup
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl IngestReceiver {
    /// Wait for the next write. `None` once the queue is closed and empty.
    pub async fn recv(&mut self) -> Option<ChannelWrite> {
        self.rx.recv().await
    }

    /// Refuse further writes; already buffered writes stay receivable
    pub fn close(&mut self) {
        self.rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_enqueue_beyond_capacity_drops_without_blocking() {
        let (queue, mut receiver) = ingest_queue(2);

        assert!(queue.enqueue(ChannelWrite::new(1, 1000, 1.0)));
        assert!(queue.enqueue(ChannelWrite::new(1, 2000, 2.0)));
        assert!(!queue.enqueue(ChannelWrite::new(1, 3000, 3.0)));
        assert!(!queue.enqueue(ChannelWrite::new(1, 4000, 4.0)));
        assert_eq!(queue.dropped(), 2);

        assert_eq!(receiver.recv().await.map(|w| w.timestamp), Some(1000));
        assert_eq!(receiver.recv().await.map(|w| w.timestamp), Some(2000));

        // Capacity frees up again once the writer has caught up
        assert!(queue.enqueue(ChannelWrite::new(1, 5000, 5.0)));
        assert_eq!(receiver.recv().await.map(|w| w.timestamp), Some(5000));
    }

    #[tokio::test]
    async fn test_close_keeps_buffered_writes() {
        let (queue, mut receiver) = ingest_queue(4);
        assert!(queue.enqueue(ChannelWrite::new(2, 10, 1.0)));

        receiver.close();
        assert!(!queue.enqueue(ChannelWrite::new(2, 20, 1.0)));

        assert_eq!(receiver.recv().await.map(|w| w.timestamp), Some(10));
        assert_eq!(receiver.recv().await, None);
    }
}
