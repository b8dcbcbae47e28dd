use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Channel name for batch payload deliveries.
pub const DATA_CHANNEL: &str = "data";

/// Channel name for metadata deliveries.
pub const META_CHANNEL: &str = "meta_data";

/// One assembled record: mapped output field names to values.
pub type Record = Map<String, Value>;

/// The fields delivered for one ingest call, keyed by input field name.
///
/// A missing key means the field carried no value this call, which is
/// distinct from an explicit JSON `null`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct FieldSet(Map<String, Value>);

impl FieldSet {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: Value) -> Self {
        self.0.insert(field.into(), value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub(crate) fn take(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for FieldSet {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// What caused a batch to be emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchTrigger {
    /// The batch-position field carried the end sentinel.
    EndMarker,
    /// A second time flush evicted the held batch before overwriting it.
    TimeWindow,
    /// Caller-driven flush of everything buffered.
    Drain,
}

impl BatchTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchTrigger::EndMarker => "end_marker",
            BatchTrigger::TimeWindow => "time_window",
            BatchTrigger::Drain => "drain",
        }
    }
}

/// One emitted batch: the encoded payload for the `data` channel and the
/// constant metadata payload for the `meta_data` channel.
#[derive(Debug, Clone)]
pub struct Emission {
    /// Fresh per emission, so downstream consumers can pair the two channel
    /// deliveries and deduplicate.
    pub batch_id: Uuid,
    pub trigger: BatchTrigger,
    /// Number of records the payload carries.
    pub records: usize,
    /// Serialized (optionally gzip + base64) batch payload.
    pub data: String,
    /// Serialized metadata mapping.
    pub metadata: String,
}

impl Emission {
    /// The two channel deliveries this emission produces, in delivery order.
    pub fn channel_payloads(&self) -> [(&'static str, &str); 2] {
        [(DATA_CHANNEL, &self.data), (META_CHANNEL, &self.metadata)]
    }
}
