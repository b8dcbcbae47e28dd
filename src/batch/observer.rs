use tracing::{info, warn};
use uuid::Uuid;

use super::batcher::BatchError;
use super::types::BatchTrigger;

/// Observation points the batcher raises while processing events.
#[derive(Debug)]
pub enum BatchEvent<'a> {
    /// The batch-position field carried the start sentinel.
    StartMarker { timestamp_ms: i64 },
    /// A batch left the machine.
    Emitted {
        batch_id: Uuid,
        records: usize,
        trigger: BatchTrigger,
    },
    /// A time flush moved the active batch into the held buffer.
    WindowFlushed { held: usize, window_start_ms: i64 },
    /// An ingest call failed; buffers were left as they were.
    IngestError {
        error: &'a BatchError,
        last_timestamp: Option<&'a str>,
    },
}

/// Receives batcher observation events. Implementations must be cheap; the
/// batcher calls them inline.
pub trait BatchObserver: Send + Sync {
    fn on_event(&self, event: &BatchEvent<'_>);
}

/// Default observer: structured logs via `tracing`.
#[derive(Debug, Default)]
pub struct LogObserver;

impl BatchObserver for LogObserver {
    fn on_event(&self, event: &BatchEvent<'_>) {
        match *event {
            BatchEvent::StartMarker { timestamp_ms } => {
                info!(timestamp_ms, "Received start of batch data");
            }
            BatchEvent::Emitted {
                batch_id,
                records,
                trigger,
            } => {
                info!(
                    batch_id = %batch_id,
                    records,
                    trigger = trigger.as_str(),
                    "Emitted batch"
                );
            }
            BatchEvent::WindowFlushed {
                held,
                window_start_ms,
            } => {
                info!(held, window_start_ms, "Time window elapsed, holding batch");
            }
            BatchEvent::IngestError {
                error,
                last_timestamp,
            } => {
                warn!(
                    %error,
                    last_timestamp = last_timestamp.unwrap_or("<none>"),
                    "Failed to ingest event"
                );
            }
        }
    }
}
