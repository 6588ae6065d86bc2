//! # Companion JSON Bridge
//!
//! The companion script speaks in named JSON objects:
//!
//! ```json
//! {"KEY_BANDS_DAY": "fair\ngood\ngood\nfair", "KEY_BANDS_NIGHT": "good\nfair\nfair\npoor"}
//! {"KEY_TEMPERATURE_C": 21, "KEY_TEMPERATURE_F": 69.8}
//! ```
//!
//! This module converts such objects into wire [`Dictionary`] values and
//! outbound dictionaries back into JSON. Keys are either [`AppKey`] names
//! or decimal key numbers; any other name is logged and skipped so the rest
//! of the message still reaches the face. Numbers become signed integers
//! with any fraction truncated toward zero, strings become C strings and
//! arrays of bytes become byte arrays. Entry order follows the JSON text.

use crate::message::{Dictionary, TupleValue};
use crate::receiver::AppKey;
use crate::FaceError;
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Errors converting companion JSON
#[derive(Error, Debug)]
pub enum CompanionError {
    #[error("companion JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("companion message must be a JSON object")]
    NotAnObject,

    #[error("{key}: {value} does not fit a 32-bit integer")]
    OutOfRange { key: String, value: Number },

    #[error("{key}: {kind} values are not supported")]
    Unsupported { key: String, kind: &'static str },
}

/// Parse one companion JSON object into a dictionary.
pub fn dictionary_from_json(text: &str) -> Result<Dictionary, CompanionError> {
    let Value::Object(map) = serde_json::from_str::<Value>(text)? else {
        return Err(CompanionError::NotAnObject);
    };

    let mut dict = Dictionary::new();
    for (name, value) in map {
        let Some(key) = resolve_key(&name) else {
            log::warn!("Skipping unknown companion key {:?}", name);
            continue;
        };
        let value = tuple_value(&name, value)?;
        dict.push(key, value);
    }
    Ok(dict)
}

/// Parse companion JSON straight into wire bytes.
pub fn encode_json(text: &str) -> Result<Vec<u8>, FaceError> {
    Ok(dictionary_from_json(text)?.encode()?)
}

/// Render a dictionary as JSON with numeric keys.
pub fn dictionary_to_json(dict: &Dictionary) -> Value {
    let map: Map<String, Value> = dict
        .iter()
        .map(|tuple| {
            let value = match &tuple.value {
                TupleValue::Int(v) => Value::from(*v),
                TupleValue::Uint(v) => Value::from(*v),
                TupleValue::CString(s) => Value::from(s.as_str()),
                TupleValue::Bytes(b) => Value::from(b.clone()),
            };
            (tuple.key.to_string(), value)
        })
        .collect();
    Value::Object(map)
}

fn resolve_key(name: &str) -> Option<u32> {
    AppKey::from_name(name)
        .map(AppKey::key)
        .or_else(|| name.parse::<u32>().ok())
}

fn tuple_value(name: &str, value: Value) -> Result<TupleValue, CompanionError> {
    let unsupported = |kind| CompanionError::Unsupported {
        key: name.to_string(),
        kind,
    };

    match value {
        Value::Number(n) => integer(name, n).map(TupleValue::Int),
        Value::String(s) => Ok(TupleValue::CString(s)),
        Value::Array(items) => items
            .into_iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|b| u8::try_from(b).ok())
                    .ok_or_else(|| unsupported("non-byte array"))
            })
            .collect::<Result<Vec<u8>, _>>()
            .map(TupleValue::Bytes),
        Value::Bool(_) => Err(unsupported("boolean")),
        Value::Null => Err(unsupported("null")),
        Value::Object(_) => Err(unsupported("object")),
    }
}

fn integer(name: &str, n: Number) -> Result<i32, CompanionError> {
    let out_of_range = |n| CompanionError::OutOfRange {
        key: name.to_string(),
        value: n,
    };

    if let Some(v) = n.as_i64() {
        return i32::try_from(v).map_err(|_| out_of_range(n));
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.trunc() >= i32::MIN as f64 && f.trunc() <= i32::MAX as f64 => {
            Ok(f.trunc() as i32)
        }
        _ => Err(out_of_range(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receiver::build_request;

    #[test]
    fn test_weather_message() {
        let dict = dictionary_from_json(r#"{"KEY_TEMPERATURE_C": 21, "KEY_TEMPERATURE_F": 69.8}"#)
            .unwrap();
        let entries: Vec<(u32, TupleValue)> =
            dict.iter().map(|t| (t.key, t.value.clone())).collect();
        assert_eq!(
            entries,
            vec![(1, TupleValue::Int(21)), (0, TupleValue::Int(69))]
        );
    }

    #[test]
    fn test_bands_message() {
        let dict = dictionary_from_json(
            r#"{"KEY_BANDS_DAY": "fair\ngood\ngood\nfair", "KEY_BANDS_NIGHT": "good\nfair\nfair\npoor"}"#,
        )
        .unwrap();
        assert_eq!(
            dict.find(2).unwrap().value.as_str(),
            Some("fair\ngood\ngood\nfair")
        );
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn test_numeric_keys_and_bytes() {
        let dict = dictionary_from_json(r#"{"17": [1, 2, 255], "0": -3.9}"#).unwrap();
        assert_eq!(dict.find(17).unwrap().value, TupleValue::Bytes(vec![1, 2, 255]));
        assert_eq!(dict.find(0).unwrap().value, TupleValue::Int(-3));
    }

    #[test]
    fn test_rejections() {
        assert!(matches!(
            dictionary_from_json("[1, 2]"),
            Err(CompanionError::NotAnObject)
        ));
        assert!(matches!(
            dictionary_from_json(r#"{"0": 3000000000}"#),
            Err(CompanionError::OutOfRange { .. })
        ));
        assert!(matches!(
            dictionary_from_json(r#"{"0": true}"#),
            Err(CompanionError::Unsupported { kind: "boolean", .. })
        ));
        assert!(matches!(
            dictionary_from_json(r#"{"0": [256]}"#),
            Err(CompanionError::Unsupported { .. })
        ));
        assert!(matches!(
            dictionary_from_json("{not json"),
            Err(CompanionError::Json(_))
        ));
    }

    #[test]
    fn test_unknown_names_are_skipped() {
        let dict =
            dictionary_from_json(r#"{"KEY_HUMIDITY": 40, "KEY_TEMPERATURE_F": 72, "-1": 5}"#)
                .unwrap();
        let entries: Vec<(u32, TupleValue)> =
            dict.iter().map(|t| (t.key, t.value.clone())).collect();
        assert_eq!(entries, vec![(0, TupleValue::Int(72))]);

        let empty = dictionary_from_json(r#"{"KEY_HUMIDITY": 40}"#).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_encode_json_produces_wire_bytes() {
        let bytes = encode_json(r#"{"KEY_TEMPERATURE_F": 72}"#).unwrap();
        let dict = Dictionary::decode(&bytes).unwrap();
        assert_eq!(dict.find(0).unwrap().value, TupleValue::Int(72));
    }

    #[test]
    fn test_request_as_json() {
        let json = dictionary_to_json(&build_request());
        assert_eq!(json.to_string(), r#"{"0":0}"#);
    }
}
