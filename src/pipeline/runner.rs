use crate::batch::{Batcher, FieldSet};
use crate::sink::EmissionSink;
use crate::source::{EnvelopeReader, SourceError};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Errors that can occur during pipeline operation
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("batch error: {0}")]
    Batch(#[from] crate::batch::BatchError),
}

/// Run the source reader task.
///
/// Reads event envelopes from the source and feeds them to the batcher
/// through a bounded channel. A full channel blocks the reader, which is the
/// backpressure mechanism.
pub async fn run_reader(
    mut reader: EnvelopeReader,
    output: mpsc::Sender<FieldSet>,
) -> Result<(), PipelineError> {
    info!("Source reader started");
    let mut events: u64 = 0;

    while let Some(event) = reader.next_event().await? {
        events += 1;
        if output.send(event).await.is_err() {
            warn!("Event channel closed, stopping reader");
            return Ok(());
        }
    }

    info!(events = events, "Event source exhausted");
    Ok(())
}

/// Run the batcher task.
///
/// Receives events from the reader, feeds them through the batcher, and
/// delivers every emission to the sink. Rejected events are reported through
/// the batcher's observer and do not stop the pipeline; neither do delivery
/// failures. When the input channel closes, buffered records are drained
/// into a final emission.
pub async fn run_batcher<S: EmissionSink>(
    mut input: mpsc::Receiver<FieldSet>,
    mut batcher: Batcher,
    mut sink: S,
) -> Result<(), PipelineError> {
    info!("Batcher started");

    while let Some(event) = input.recv().await {
        match batcher.ingest(event) {
            Ok(Some(emission)) => deliver(&mut sink, &emission).await,
            Ok(None) => {}
            Err(_) => {
                // Already reported through the observer. The next event
                // proceeds against unchanged buffers.
            }
        }
    }

    info!(
        buffered = batcher.buffered(),
        "Input channel closed, draining remaining records"
    );
    if let Some(emission) = batcher.drain()? {
        deliver(&mut sink, &emission).await;
    }

    info!("Batcher shutdown complete");
    Ok(())
}

async fn deliver<S: EmissionSink>(sink: &mut S, emission: &crate::batch::Emission) {
    match sink.deliver(emission).await {
        Ok(()) => {
            debug!(
                batch_id = %emission.batch_id,
                records = emission.records,
                "Delivered emission"
            );
        }
        Err(e) => {
            error!(
                batch_id = %emission.batch_id,
                error = %e,
                "Failed to deliver emission"
            );
        }
    }
}
