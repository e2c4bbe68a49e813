//! Canonical proto3 JSON codec support.
//!
//! Generated code implements [`JsonMessage`] next to [`Message`]: the binary
//! codec and the JSON codec share the same struct and agree on field
//! semantics. The helpers in this module encode the value mapping mandated by
//! the [proto3 JSON specification][json]: 64-bit integers travel as decimal
//! strings, bytes as base64, enums as their enumerator names (with raw-number
//! passthrough for values unknown to the schema), non-finite floats as the
//! strings `"NaN"`, `"Infinity"` and `"-Infinity"`, and map keys as strings.
//!
//! [json]: https://protobuf.dev/programming-guides/proto3/#json
//! [`Message`]: crate::Message

use std::error::Error;
use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

pub use serde_json::Value;

use crate::{Enumeration, OpenEnum};

/// The plain attribute map generated JSON writers produce and generated JSON
/// readers consume.
pub type JsonObject = serde_json::Map<String, Value>;

/// A proto3 JSON encoding or decoding error.
#[derive(Debug)]
pub struct JsonError {
    description: String,
}

impl JsonError {
    /// Creates a new `JsonError` with a root cause description.
    ///
    /// Meant to be used only by this module and by generated code.
    #[doc(hidden)]
    #[cold]
    pub fn new(description: impl Into<String>) -> JsonError {
        JsonError {
            description: description.into(),
        }
    }
}

impl fmt::Display for JsonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to decode JSON message: {}", self.description)
    }
}

impl Error for JsonError {}

impl From<serde_json::Error> for JsonError {
    fn from(error: serde_json::Error) -> JsonError {
        JsonError::new(error.to_string())
    }
}

/// A Protocol Buffers message with a canonical proto3 JSON codec.
///
/// The required methods are implemented by generated code and mirror the
/// internal surface of the binary codec: [`to_json_map`] produces the plain
/// attribute map for one message, [`merge_json`] consumes one JSON value.
/// The provided methods are the public codec surface.
///
/// [`to_json_map`]: JsonMessage::to_json_map
/// [`merge_json`]: JsonMessage::merge_json
pub trait JsonMessage: Default {
    /// Renders the message as a plain attribute map.
    ///
    /// Meant to be used only by `JsonMessage` implementations.
    #[doc(hidden)]
    fn to_json_map(&self) -> JsonObject;

    /// Merges a JSON value into `self`.
    ///
    /// Meant to be used only by `JsonMessage` implementations.
    #[doc(hidden)]
    fn merge_json(&mut self, value: &Value) -> Result<(), JsonError>;

    /// Encodes the message as a JSON string.
    fn to_json(&self) -> String {
        Value::Object(self.to_json_map()).to_string()
    }

    /// Decodes an instance of the message from a JSON string.
    ///
    /// No partial message is returned on error.
    fn from_json(text: &str) -> Result<Self, JsonError>
    where
        Self: Sized,
    {
        let value: Value = serde_json::from_str(text)?;
        let mut message = Self::default();
        message.merge_json(&value)?;
        Ok(message)
    }
}

/// Views a JSON value as an attribute map, the only shape a message may take.
pub fn object(value: &Value) -> Result<&JsonObject, JsonError> {
    match value {
        Value::Object(object) => Ok(object),
        other => Err(JsonError::new(format!(
            "expected a JSON object, found {}",
            value_kind(other)
        ))),
    }
}

/// Looks up a field in an attribute map, accepting the JSON name first and
/// the original proto field name as a fallback.
///
/// An explicit JSON `null` counts as absent: proto3 JSON treats it as the
/// default value for every field type.
pub fn field<'a>(
    object: &'a JsonObject,
    json_name: &str,
    proto_name: &str,
) -> Option<&'a Value> {
    object
        .get(json_name)
        .or_else(|| object.get(proto_name))
        .filter(|value| !value.is_null())
}

/// Views a JSON value as an array, the only shape a repeated field may take.
pub fn array(value: &Value) -> Result<&Vec<Value>, JsonError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(JsonError::new(format!(
            "expected a JSON array, found {}",
            value_kind(other)
        ))),
    }
}

/// Renders a float, mapping the non-finite values to their canonical JSON
/// string spellings.
pub fn float32(value: f32) -> Value {
    if value.is_finite() {
        Value::from(f64::from(value))
    } else {
        nonfinite(value.is_nan(), value.is_sign_positive())
    }
}

/// Renders a double, mapping the non-finite values to their canonical JSON
/// string spellings.
pub fn float64(value: f64) -> Value {
    if value.is_finite() {
        Value::from(value)
    } else {
        nonfinite(value.is_nan(), value.is_sign_positive())
    }
}

fn nonfinite(is_nan: bool, is_positive: bool) -> Value {
    if is_nan {
        Value::String("NaN".to_string())
    } else if is_positive {
        Value::String("Infinity".to_string())
    } else {
        Value::String("-Infinity".to_string())
    }
}

/// Renders a 64-bit signed integer as a decimal string.
pub fn int64(value: i64) -> Value {
    Value::String(value.to_string())
}

/// Renders a 64-bit unsigned integer as a decimal string.
pub fn uint64(value: u64) -> Value {
    Value::String(value.to_string())
}

/// Renders a bytes field as standard base64.
pub fn bytes(value: &[u8]) -> Value {
    Value::String(BASE64.encode(value))
}

/// Renders an enum field as its enumerator name, or as the raw number when
/// the value is unknown to the schema.
pub fn enum_name<E>(value: OpenEnum<E>) -> Value
where
    E: Enumeration,
{
    match value {
        OpenEnum::Known(value) => Value::String(value.as_str_name().to_string()),
        OpenEnum::Unknown(raw) => Value::from(raw),
    }
}

/// Parses a 32-bit signed integer from a JSON number or decimal string.
pub fn parse_i32(value: &Value) -> Result<i32, JsonError> {
    parse_i64(value)?
        .try_into()
        .map_err(|_| JsonError::new("integer out of range for int32"))
}

/// Parses a 32-bit unsigned integer from a JSON number or decimal string.
pub fn parse_u32(value: &Value) -> Result<u32, JsonError> {
    parse_u64(value)?
        .try_into()
        .map_err(|_| JsonError::new("integer out of range for uint32"))
}

/// Parses a 64-bit signed integer from a JSON number or decimal string.
pub fn parse_i64(value: &Value) -> Result<i64, JsonError> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .ok_or_else(|| JsonError::new("expected an integer-valued JSON number")),
        Value::String(text) => text
            .parse()
            .map_err(|_| JsonError::new(format!("invalid integer string {:?}", text))),
        other => Err(JsonError::new(format!(
            "expected a JSON number or string, found {}",
            value_kind(other)
        ))),
    }
}

/// Parses a 64-bit unsigned integer from a JSON number or decimal string.
pub fn parse_u64(value: &Value) -> Result<u64, JsonError> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .ok_or_else(|| JsonError::new("expected an unsigned JSON number")),
        Value::String(text) => text
            .parse()
            .map_err(|_| JsonError::new(format!("invalid integer string {:?}", text))),
        other => Err(JsonError::new(format!(
            "expected a JSON number or string, found {}",
            value_kind(other)
        ))),
    }
}

/// Parses a float from a JSON number or from the canonical non-finite string
/// spellings.
pub fn parse_f32(value: &Value) -> Result<f32, JsonError> {
    parse_f64(value).map(|value| value as f32)
}

/// Parses a double from a JSON number or from the canonical non-finite string
/// spellings.
pub fn parse_f64(value: &Value) -> Result<f64, JsonError> {
    match value {
        Value::Number(number) => number
            .as_f64()
            .ok_or_else(|| JsonError::new("expected a JSON number")),
        Value::String(text) => match text.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            other => other
                .parse()
                .map_err(|_| JsonError::new(format!("invalid float string {:?}", other))),
        },
        other => Err(JsonError::new(format!(
            "expected a JSON number or string, found {}",
            value_kind(other)
        ))),
    }
}

/// Parses a bool from a JSON boolean.
pub fn parse_bool(value: &Value) -> Result<bool, JsonError> {
    value
        .as_bool()
        .ok_or_else(|| JsonError::new("expected a JSON boolean"))
}

/// Parses a string field.
pub fn parse_string(value: &Value) -> Result<String, JsonError> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| JsonError::new("expected a JSON string"))
}

/// Parses a bytes field from standard base64.
pub fn parse_bytes(value: &Value) -> Result<Vec<u8>, JsonError> {
    let text = value
        .as_str()
        .ok_or_else(|| JsonError::new("expected a base64 JSON string"))?;
    BASE64
        .decode(text)
        .map_err(|error| JsonError::new(format!("invalid base64: {}", error)))
}

/// Parses an enum field from an enumerator name or a raw number.
///
/// Unknown numbers pass through unchanged for forward compatibility; unknown
/// names are an error.
pub fn parse_enum<E>(value: &Value) -> Result<OpenEnum<E>, JsonError>
where
    E: Enumeration,
{
    match value {
        Value::String(name) => E::from_str_name(name)
            .map(OpenEnum::Known)
            .ok_or_else(|| JsonError::new(format!("unknown enumerator name {:?}", name))),
        Value::Number(_) => Ok(OpenEnum::from_raw(parse_i32(value)?)),
        other => Err(JsonError::new(format!(
            "expected an enumerator name or number, found {}",
            value_kind(other)
        ))),
    }
}

/// Parses a map key from its string representation.
pub fn parse_key<K>(key: &str) -> Result<K, JsonError>
where
    K: FromStr,
{
    key.parse()
        .map_err(|_| JsonError::new(format!("invalid map key {:?}", key)))
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int64_decimal_strings() {
        assert_eq!(int64(1 << 62), Value::String("4611686018427387904".into()));
        assert_eq!(parse_i64(&int64(1 << 62)).unwrap(), 1 << 62);
        assert_eq!(parse_i64(&Value::from(-3)).unwrap(), -3);
        assert_eq!(parse_u64(&uint64(u64::MAX)).unwrap(), u64::MAX);
        parse_u64(&Value::from(-1)).unwrap_err();
    }

    #[test]
    fn nonfinite_floats() {
        assert_eq!(float64(f64::NAN), Value::String("NaN".into()));
        assert_eq!(float64(f64::INFINITY), Value::String("Infinity".into()));
        assert_eq!(float32(f32::NEG_INFINITY), Value::String("-Infinity".into()));
        assert!(parse_f64(&Value::String("NaN".into())).unwrap().is_nan());
        assert_eq!(
            parse_f32(&Value::String("-Infinity".into())).unwrap(),
            f32::NEG_INFINITY
        );
    }

    #[test]
    fn bytes_base64() {
        assert_eq!(bytes(b"hello"), Value::String("aGVsbG8=".into()));
        assert_eq!(
            parse_bytes(&Value::String("aGVsbG8=".into())).unwrap(),
            b"hello"
        );
        parse_bytes(&Value::String("!!".into())).unwrap_err();
    }

    #[test]
    fn field_lookup_falls_back_to_proto_name() {
        let object: JsonObject = serde_json::from_str(r#"{"fooBar": 1, "baz_qux": 2}"#).unwrap();
        assert_eq!(field(&object, "fooBar", "foo_bar"), Some(&Value::from(1)));
        assert_eq!(field(&object, "bazQux", "baz_qux"), Some(&Value::from(2)));
        assert_eq!(field(&object, "missing", "missing"), None);
    }

    #[test]
    fn null_is_absent() {
        let object: JsonObject = serde_json::from_str(r#"{"n": null}"#).unwrap();
        assert_eq!(field(&object, "n", "n"), None);
    }

    #[test]
    fn map_keys() {
        assert_eq!(parse_key::<i32>("42").unwrap(), 42);
        assert_eq!(parse_key::<bool>("true").unwrap(), true);
        assert_eq!(parse_key::<String>("k").unwrap(), "k");
        parse_key::<u32>("-1").unwrap_err();
    }
}
