use crate::batch::Emission;
use async_trait::async_trait;

#[async_trait]
pub trait EmissionSink: Send {
    /// Deliver both channel payloads of one emission.
    async fn deliver(&mut self, emission: &Emission) -> Result<(), SinkError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize sink line: {0}")]
    Json(#[from] serde_json::Error),
}
