pub mod batcher;
pub mod encode;
pub mod observer;
pub mod timestamp;
pub mod types;

pub use batcher::{BatchError, Batcher, BatcherConfig, FieldMapping, InvalidConfig};
pub use encode::{decode_records, EncodeError, PayloadEncoder};
pub use observer::{BatchEvent, BatchObserver, LogObserver};
pub use timestamp::TimestampError;
pub use types::{BatchTrigger, Emission, FieldSet, Record, DATA_CHANNEL, META_CHANNEL};
