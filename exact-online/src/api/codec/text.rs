//! GUID, string, fixed-width code and binary rules

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as Json;
use uuid::Uuid;

use super::mismatch;
use super::numeric::wire_mismatch;
use crate::api::errors::ValidationError;
use crate::api::hydration::Value;

static GUID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("guid pattern is valid")
});

/// Only the hyphenated 8-4-4-4-12 shape is accepted
pub(super) fn parse_guid(s: &str) -> Result<Uuid, ValidationError> {
    if !GUID_PATTERN.is_match(s) {
        return Err(ValidationError::reason(format!(
            "'{}' is not a GUID of the form xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx",
            s
        )));
    }
    Uuid::parse_str(s).map_err(|e| ValidationError::reason(format!("'{}': {}", s, e)))
}

pub(super) fn guid(value: &Value) -> Result<Uuid, ValidationError> {
    match value {
        Value::Guid(g) => Ok(*g),
        Value::String(s) => parse_guid(s),
        other => Err(mismatch("guid", other)),
    }
}

pub(super) fn decode_guid(wire: &Json) -> Result<Uuid, ValidationError> {
    match wire {
        Json::String(s) => parse_guid(s),
        other => Err(wire_mismatch("guid string", other)),
    }
}

pub(super) fn string(value: &Value) -> Result<&str, ValidationError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(mismatch("string", other)),
    }
}

/// Trim, then right-align to `width`; longer codes are rejected, never cut
pub(super) fn fixed(value: &Value, width: usize) -> Result<String, ValidationError> {
    let trimmed = string(value)?.trim();
    let len = trimmed.chars().count();
    if len > width {
        return Err(ValidationError::reason(format!(
            "'{}' is {} characters, the code width is {}",
            trimmed, len, width
        )));
    }
    Ok(format!("{:>width$}", trimmed, width = width))
}

pub(super) fn decode_string(wire: &Json) -> Result<String, ValidationError> {
    match wire {
        Json::String(s) => Ok(s.clone()),
        other => Err(wire_mismatch("string", other)),
    }
}

pub(super) fn binary(value: &Value) -> Result<&[u8], ValidationError> {
    match value {
        Value::Binary(bytes) => Ok(bytes),
        other => Err(mismatch("binary", other)),
    }
}

pub(super) fn encode_binary(bytes: &[u8]) -> Json {
    Json::String(STANDARD.encode(bytes))
}

pub(super) fn decode_binary(wire: &Json) -> Result<Vec<u8>, ValidationError> {
    match wire {
        Json::String(s) => STANDARD
            .decode(s.as_bytes())
            .map_err(|e| ValidationError::reason(format!("invalid base64 payload: {}", e))),
        other => Err(wire_mismatch("base64 string", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_guid_shape() {
        assert!(parse_guid("2b5a7b99-e210-46ee-9511-3cac0b66405d").is_ok());
        assert!(parse_guid("2B5A7B99-E210-46EE-9511-3CAC0B66405D").is_ok());
        // Shapes the uuid crate would accept on its own
        assert!(parse_guid("2b5a7b99e21046ee95113cac0b66405d").is_err());
        assert!(parse_guid("{2b5a7b99-e210-46ee-9511-3cac0b66405d}").is_err());
        assert!(parse_guid("2b5a7b99-e210-46ee-9511-3cac0b66405").is_err());
        assert!(parse_guid("zb5a7b99-e210-46ee-9511-3cac0b66405d").is_err());
        assert!(parse_guid("").is_err());
    }

    #[test]
    fn test_fixed_width_pads_left() {
        assert_eq!(fixed(&Value::from(" 1000 "), 8).unwrap(), "    1000");
        assert_eq!(fixed(&Value::from("12345678"), 8).unwrap(), "12345678");
        assert!(fixed(&Value::from("123456789"), 8).is_err());
    }

    #[test]
    fn test_binary_wire_form() {
        let wire = encode_binary(&[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(wire, json!("3q2+7w=="));
        assert_eq!(decode_binary(&wire).unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert!(decode_binary(&json!("***")).is_err());
    }
}
