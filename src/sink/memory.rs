use super::traits::{EmissionSink, SinkError};
use crate::batch::Emission;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Captures emissions in memory. Used by tests to inspect pipeline output
/// without touching the filesystem.
#[derive(Default, Clone)]
pub struct MemorySink {
    emissions: Arc<Mutex<Vec<Emission>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emissions(&self) -> Vec<Emission> {
        self.emissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmissionSink for MemorySink {
    async fn deliver(&mut self, emission: &Emission) -> Result<(), SinkError> {
        self.emissions.lock().unwrap().push(emission.clone());
        Ok(())
    }
}
