//! Raw message decoding.

use eventmon_core::{DecodeError, Event, RawEvent};

/// Turns one raw message into a typed [`Event`].
///
/// Decoding is pure: no state, no side effects. A message that does not have
/// the event shape is an error, never a skipped value.
pub trait EventDecoder: Send + Sync {
    /// Decode a single raw message.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the message is malformed.
    fn decode(&self, raw: RawEvent) -> Result<Event, DecodeError>;
}

/// Decoder for feeds whose wire format already is the event message.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl EventDecoder for JsonDecoder {
    fn decode(&self, raw: RawEvent) -> Result<Event, DecodeError> {
        let value = raw.into_value();
        if !value.is_object() {
            return Err(DecodeError::new(format!(
                "expected a JSON object, got {}",
                json_kind(&value)
            )));
        }
        Ok(serde_json::from_value(value)?)
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
