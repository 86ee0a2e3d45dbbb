//! Real-time metric event hub.
//!
//! Lossy broadcast of stored records to live subscribers (WS streams, in-
//! process listeners). Publishing never blocks the record path and never
//! fails it: with no subscribers the send error is swallowed.

use tokio::sync::broadcast;

use metrik_core::record::MetricRecord;

const CHANNEL_CAPACITY: usize = 256;

/// One published metric event.
#[derive(Debug, Clone)]
pub struct MetricEvent {
    pub record: MetricRecord,
}

#[derive(Clone)]
pub struct EventHub {
    tx: broadcast::Sender<MetricEvent>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Non-blocking publish. A failure means nobody is listening; that is
    /// not an error for the producer.
    pub fn publish(&self, record: MetricRecord) {
        if self.tx.send(MetricEvent { record }).is_err() {
            tracing::trace!("metric event dropped: no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
