use std::io::{self, Read, Write};

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use thiserror::Error;

use super::types::Record;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("batch payload JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("batch payload gzip error: {0}")]
    Gzip(#[from] io::Error),

    #[error("batch payload base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Encodes batch payloads for emission.
///
/// A batch serializes as a JSON array of records, absent values already
/// resolved to explicit nulls upstream. With compression enabled the JSON
/// text is gzipped and base64-encoded without padding.
#[derive(Debug, Clone)]
pub struct PayloadEncoder {
    compress: bool,
}

impl PayloadEncoder {
    pub fn new(compress: bool) -> Self {
        Self { compress }
    }

    pub fn encode_batch<T: Serialize + ?Sized>(&self, records: &T) -> Result<String, EncodeError> {
        let json = serde_json::to_string(records)?;
        if !self.compress {
            return Ok(json);
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(json.as_bytes())?;
        let compressed = encoder.finish()?;
        Ok(STANDARD_NO_PAD.encode(compressed))
    }
}

/// Reverse of [`PayloadEncoder::encode_batch`]: recover the ordered records
/// from an emitted payload.
pub fn decode_records(payload: &str, compressed: bool) -> Result<Vec<Record>, EncodeError> {
    if !compressed {
        return Ok(serde_json::from_str(payload)?);
    }

    let bytes = STANDARD_NO_PAD.decode(payload)?;
    let mut decoder = GzDecoder::new(bytes.as_slice());
    let mut json = Vec::new();
    decoder.read_to_end(&mut json)?;
    Ok(serde_json::from_slice(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn sample_records() -> Vec<Record> {
        let mut first = Record::new();
        first.insert("time".to_string(), json!(1000));
        first.insert("temperature".to_string(), json!(21.5));

        let mut second = Record::new();
        second.insert("time".to_string(), json!(2000));
        second.insert("temperature".to_string(), Value::Null);

        vec![first, second]
    }

    #[test]
    fn test_plain_payload_keeps_explicit_nulls() {
        let encoder = PayloadEncoder::new(false);
        let payload = encoder.encode_batch(&sample_records()).unwrap();

        assert!(payload.contains(r#""temperature":null"#));
        assert_eq!(decode_records(&payload, false).unwrap(), sample_records());
    }

    #[test]
    fn test_compressed_round_trip() {
        let encoder = PayloadEncoder::new(true);
        let payload = encoder.encode_batch(&sample_records()).unwrap();

        assert_ne!(payload.chars().next(), Some('['));
        assert_eq!(decode_records(&payload, true).unwrap(), sample_records());
    }

    #[test]
    fn test_compressed_payload_is_unpadded_base64() {
        let encoder = PayloadEncoder::new(true);
        let payload = encoder.encode_batch(&sample_records()).unwrap();

        assert!(!payload.contains('='));
        assert!(STANDARD_NO_PAD.decode(&payload).is_ok());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_records("not json", false).is_err());
        assert!(decode_records("!!!not base64!!!", true).is_err());
    }

    #[test]
    fn test_empty_batch_encodes_as_empty_array() {
        let encoder = PayloadEncoder::new(false);
        let payload = encoder.encode_batch(&Vec::<Record>::new()).unwrap();

        assert_eq!(payload, "[]");
    }
}
