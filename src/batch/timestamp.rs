use chrono::DateTime;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("cannot interpret '{value}' as epoch milliseconds or RFC 3339: {source}")]
    Unparseable {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("timestamp number {0} is not representable as epoch milliseconds")]
    OutOfRange(serde_json::Number),

    #[error("timestamp value has unsupported type '{0}'")]
    UnsupportedType(&'static str),
}

/// Interpret a timestamp field value as epoch milliseconds.
///
/// Accepts a JSON integer (epoch ms), a string of digits (epoch ms), or an
/// RFC 3339 string. Everything on the event-time clock goes through here.
pub fn event_millis(value: &Value) -> Result<i64, TimestampError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| TimestampError::OutOfRange(n.clone())),
        Value::String(s) => parse_string(s),
        other => Err(TimestampError::UnsupportedType(json_type(other))),
    }
}

fn parse_string(value: &str) -> Result<i64, TimestampError> {
    if let Ok(millis) = value.parse::<i64>() {
        return Ok(millis);
    }

    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| TimestampError::Unparseable {
            value: value.to_string(),
            source: e,
        })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_millis() {
        assert_eq!(event_millis(&json!(1733280131011_i64)).unwrap(), 1733280131011);
    }

    #[test]
    fn test_numeric_string_millis() {
        assert_eq!(event_millis(&json!("1733280131011")).unwrap(), 1733280131011);
    }

    #[test]
    fn test_rfc3339_string() {
        let millis = event_millis(&json!("2025-12-04T02:42:11.011Z")).unwrap();
        assert_eq!(millis, 1764816131011);
    }

    #[test]
    fn test_rfc3339_with_offset_converts_to_utc() {
        let utc = event_millis(&json!("2025-12-04T02:42:11Z")).unwrap();
        let offset = event_millis(&json!("2025-12-04T08:12:11+05:30")).unwrap();
        assert_eq!(utc, offset);
    }

    #[test]
    fn test_negative_epoch_accepted() {
        assert_eq!(event_millis(&json!(-1000)).unwrap(), -1000);
    }

    #[test]
    fn test_unparseable_string() {
        let result = event_millis(&json!("four o'clock"));
        assert!(matches!(result, Err(TimestampError::Unparseable { .. })));
    }

    #[test]
    fn test_float_rejected() {
        let result = event_millis(&json!(1733280131.5));
        assert!(matches!(result, Err(TimestampError::OutOfRange(_))));
    }

    #[test]
    fn test_unsupported_type() {
        let result = event_millis(&json!(true));
        assert!(matches!(
            result,
            Err(TimestampError::UnsupportedType("boolean"))
        ));
    }
}
