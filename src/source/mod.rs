pub mod reader;

pub use reader::{EnvelopeReader, SourceError};
