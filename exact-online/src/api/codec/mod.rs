//! Typed codecs for the EDM wire types
//!
//! Every field type validates native values, encodes them for request
//! bodies, decodes them from response bodies, and renders filter literals.
//! Out-of-range values are rejected, never coerced.

mod literal;
mod numeric;
mod temporal;
mod text;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

pub use literal::{LiteralTag, TypedLiteral};

use crate::api::errors::ValidationError;
use crate::api::hydration::Value;

/// Wire type of a field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "of")]
pub enum EdmType {
    Boolean,
    /// Unsigned 8-bit
    Byte,
    /// Signed 8-bit
    SByte,
    Int16,
    Int32,
    Int64,
    Double,
    Single,
    Decimal,
    Guid,
    /// Local date and time, `Y-m-dTH:i:s`
    DateTime,
    DateTimeOffset,
    /// Time of day or duration up to 24 hours
    Time,
    Binary,
    String,
    /// Code string right-aligned to a declared width
    FixedString(usize),
    /// Nested entities of the referenced entity tag
    Collection(String),
}

pub(crate) fn mismatch(expected: &str, got: &Value) -> ValidationError {
    ValidationError::reason(format!("expected {}, got {}", expected, got.kind()))
}

impl EdmType {
    /// EDM name as used in the service's metadata documents
    pub fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "Edm.Boolean",
            Self::Byte => "Edm.Byte",
            Self::SByte => "Edm.SByte",
            Self::Int16 => "Edm.Int16",
            Self::Int32 => "Edm.Int32",
            Self::Int64 => "Edm.Int64",
            Self::Double => "Edm.Double",
            Self::Single => "Edm.Single",
            Self::Decimal => "Edm.Decimal",
            Self::Guid => "Edm.Guid",
            Self::DateTime => "Edm.DateTime",
            Self::DateTimeOffset => "Edm.DateTimeOffset",
            Self::Time => "Edm.Time",
            Self::Binary => "Edm.Binary",
            Self::String | Self::FixedString(_) => "Edm.String",
            Self::Collection(_) => "Collection",
        }
    }

    pub fn is_filterable(&self) -> bool {
        !matches!(self, Self::Collection(_))
    }

    /// Entity tag referenced by a collection field
    pub fn collection_of(&self) -> Option<&str> {
        match self {
            Self::Collection(tag) => Some(tag),
            _ => None,
        }
    }

    fn integer_range(&self) -> Option<(i64, i64)> {
        match self {
            Self::Byte => Some((0, u8::MAX as i64)),
            Self::SByte => Some((i8::MIN as i64, i8::MAX as i64)),
            Self::Int16 => Some((i16::MIN as i64, i16::MAX as i64)),
            Self::Int32 => Some((i32::MIN as i64, i32::MAX as i64)),
            Self::Int64 => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }

    fn float_bound(&self) -> Option<f64> {
        match self {
            Self::Double => Some(numeric::DOUBLE_BOUND),
            Self::Single => Some(numeric::SINGLE_BOUND),
            Self::Decimal => Some(numeric::DECIMAL_BOUND),
            _ => None,
        }
    }

    /// Check a native value; null is always acceptable here
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        if value.is_null() {
            return Ok(());
        }
        if let Some((min, max)) = self.integer_range() {
            return numeric::integer(value, min, max).map(drop);
        }
        if let Some(bound) = self.float_bound() {
            return numeric::float(value, bound).map(drop);
        }
        match self {
            Self::Boolean => boolean(value).map(drop),
            Self::Guid => text::guid(value).map(drop),
            Self::DateTime => temporal::datetime(value).map(drop),
            Self::DateTimeOffset => temporal::datetime_offset(value).map(drop),
            Self::Time => temporal::duration(value).map(drop),
            Self::Binary => text::binary(value).map(drop),
            Self::String => text::string(value).map(drop),
            Self::FixedString(width) => text::fixed(value, *width).map(drop),
            Self::Collection(_) => match value {
                Value::Collection(_) => Ok(()),
                other => Err(mismatch("collection", other)),
            },
            _ => Ok(()),
        }
    }

    /// Encode a native value for a request body
    pub fn encode(&self, value: &Value) -> Result<Json, ValidationError> {
        if value.is_null() {
            return Ok(Json::Null);
        }
        if let Some((min, max)) = self.integer_range() {
            return numeric::integer(value, min, max).map(Json::from);
        }
        if let Some(bound) = self.float_bound() {
            return numeric::float(value, bound).map(numeric::encode_float);
        }
        match self {
            Self::Boolean => boolean(value).map(Json::Bool),
            Self::Guid => text::guid(value).map(|g| Json::String(g.to_string())),
            Self::DateTime => {
                temporal::datetime(value).map(|dt| Json::String(temporal::format_datetime(&dt)))
            }
            Self::DateTimeOffset => temporal::datetime_offset(value)
                .map(|dt| Json::String(temporal::format_offset(&dt))),
            Self::Time => {
                temporal::duration(value).map(|d| Json::String(temporal::format_duration(&d)))
            }
            Self::Binary => text::binary(value).map(text::encode_binary),
            Self::String => text::string(value).map(|s| Json::String(s.to_string())),
            Self::FixedString(width) => text::fixed(value, *width).map(Json::String),
            Self::Collection(tag) => Err(ValidationError::reason(format!(
                "collection of `{}` is deflated through its entity metadata",
                tag
            ))),
            _ => Err(mismatch(self.name(), value)),
        }
    }

    /// Decode a wire value from a response body
    pub fn decode(&self, wire: &Json) -> Result<Value, ValidationError> {
        if wire.is_null() {
            return Ok(Value::Null);
        }
        if let Some((min, max)) = self.integer_range() {
            return numeric::decode_integer(wire, min, max).map(Value::Int);
        }
        if let Some(bound) = self.float_bound() {
            return numeric::decode_float(wire, bound).map(Value::Float);
        }
        match self {
            Self::Boolean => match wire {
                Json::Bool(b) => Ok(Value::Bool(*b)),
                other => Err(numeric::wire_mismatch("boolean", other)),
            },
            Self::Guid => text::decode_guid(wire).map(Value::Guid),
            Self::DateTime => temporal::decode_datetime(wire).map(Value::DateTime),
            Self::DateTimeOffset => temporal::decode_offset(wire).map(Value::DateTimeOffset),
            Self::Time => temporal::decode_duration(wire).map(Value::Duration),
            Self::Binary => text::decode_binary(wire).map(Value::Binary),
            Self::String => text::decode_string(wire).map(Value::String),
            Self::FixedString(_) => {
                text::decode_string(wire).map(|s| Value::String(s.trim().to_string()))
            }
            Self::Collection(tag) => Err(ValidationError::reason(format!(
                "collection of `{}` is hydrated through its entity metadata",
                tag
            ))),
            _ => Err(numeric::wire_mismatch(self.name(), wire)),
        }
    }

    /// Render a native value as a filter literal
    pub fn encode_for_filter(&self, value: &Value) -> Result<TypedLiteral, ValidationError> {
        if value.is_null() {
            return Ok(TypedLiteral::null());
        }
        if let Some((min, max)) = self.integer_range() {
            return numeric::integer(value, min, max).map(|i| TypedLiteral::plain(i.to_string()));
        }
        if let Some(bound) = self.float_bound() {
            return numeric::float(value, bound).map(|f| TypedLiteral::plain(f.to_string()));
        }
        match self {
            Self::Boolean => boolean(value).map(|b| TypedLiteral::plain(if b { "1" } else { "0" })),
            Self::Guid => text::guid(value)
                .map(|g| TypedLiteral::tagged(LiteralTag::Guid, g.to_string())),
            Self::DateTime => temporal::datetime(value).map(|dt| {
                TypedLiteral::tagged(LiteralTag::DateTime, temporal::format_datetime(&dt))
            }),
            Self::DateTimeOffset => temporal::datetime_offset(value)
                .map(|dt| TypedLiteral::tagged(LiteralTag::Time, temporal::format_offset(&dt))),
            Self::Time => temporal::duration(value)
                .map(|d| TypedLiteral::tagged(LiteralTag::Time, temporal::format_duration(&d))),
            Self::Binary => {
                text::binary(value).map(|b| TypedLiteral::tagged(LiteralTag::Binary, hex::encode(b)))
            }
            Self::String => text::string(value).map(|s| TypedLiteral::tagged(LiteralTag::Text, s)),
            Self::FixedString(width) => {
                text::fixed(value, *width).map(|s| TypedLiteral::tagged(LiteralTag::Text, s))
            }
            Self::Collection(tag) => Err(ValidationError::reason(format!(
                "collection of `{}` cannot be filtered on",
                tag
            ))),
            _ => Err(mismatch(self.name(), value)),
        }
    }
}

fn boolean(value: &Value) -> Result<bool, ValidationError> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(mismatch("boolean", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;
    use uuid::Uuid;

    fn round_trip(edm: &EdmType, value: Value) {
        let wire = edm.encode(&value).unwrap();
        assert_eq!(edm.decode(&wire).unwrap(), value, "{} via {}", edm.name(), wire);
    }

    #[test]
    fn test_round_trips() {
        round_trip(&EdmType::Boolean, Value::Bool(true));
        round_trip(&EdmType::Boolean, Value::Bool(false));
        round_trip(&EdmType::Byte, Value::Int(200));
        round_trip(&EdmType::Int16, Value::Int(-32768));
        round_trip(&EdmType::Int32, Value::Int(4133185));
        round_trip(&EdmType::Int64, Value::Int(i64::MAX));
        round_trip(&EdmType::String, Value::from("Grootboek €"));
        round_trip(
            &EdmType::Guid,
            Value::Guid(Uuid::parse_str("2b5a7b99-e210-46ee-9511-3cac0b66405d").unwrap()),
        );
    }

    #[test]
    fn test_datetime_round_trip_to_seconds() {
        let precise = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_milli_opt(12, 30, 5, 750)
            .unwrap();
        let wire = EdmType::DateTime.encode(&Value::DateTime(precise)).unwrap();
        assert_eq!(wire, json!("2024-03-01T12:30:05"));

        let decoded = EdmType::DateTime.decode(&wire).unwrap();
        let truncated = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 30, 5)
            .unwrap();
        assert_eq!(decoded, Value::DateTime(truncated));
    }

    #[test]
    fn test_byte_validation() {
        assert!(EdmType::Byte.validate(&Value::Int(0)).is_ok());
        assert!(EdmType::Byte.validate(&Value::Int(255)).is_ok());
        assert!(EdmType::Byte.validate(&Value::Int(-1)).is_err());
        assert!(EdmType::Byte.validate(&Value::Int(256)).is_err());
        assert!(EdmType::SByte.validate(&Value::Int(-128)).is_ok());
        assert!(EdmType::SByte.validate(&Value::Int(128)).is_err());
    }

    #[test]
    fn test_guid_validation() {
        assert!(EdmType::Guid.validate(&Value::from("2b5a7b99-e210-46ee-9511-3cac0b66405d")).is_ok());
        assert!(EdmType::Guid.validate(&Value::from("not-a-guid")).is_err());
        assert!(EdmType::Guid.validate(&Value::from("2b5a7b99e21046ee95113cac0b66405d")).is_err());
        assert!(EdmType::Guid.validate(&Value::Int(1)).is_err());
    }

    #[test]
    fn test_null_passes_every_codec() {
        for edm in [EdmType::Guid, EdmType::Int32, EdmType::Time, EdmType::FixedString(4)] {
            assert!(edm.validate(&Value::Null).is_ok());
            assert_eq!(edm.encode(&Value::Null).unwrap(), Json::Null);
            assert_eq!(edm.decode(&Json::Null).unwrap(), Value::Null);
            assert_eq!(edm.encode_for_filter(&Value::Null).unwrap().to_string(), "null");
        }
    }

    #[test]
    fn test_filter_literals() {
        let literal = |edm: EdmType, value: Value| edm.encode_for_filter(&value).unwrap().to_string();

        assert_eq!(literal(EdmType::Boolean, Value::Bool(true)), "1");
        assert_eq!(literal(EdmType::Boolean, Value::Bool(false)), "0");
        assert_eq!(literal(EdmType::Int32, Value::Int(12345)), "12345");
        assert_eq!(literal(EdmType::Double, Value::Float(12.5)), "12.5");
        assert_eq!(
            literal(EdmType::Guid, Value::from("2B5A7B99-E210-46EE-9511-3CAC0B66405D")),
            "guid'2b5a7b99-e210-46ee-9511-3cac0b66405d'"
        );
        assert_eq!(
            literal(EdmType::DateTime, Value::from("2024-03-01T12:30:05")),
            "datetime'2024-03-01T12:30:05'"
        );
        assert_eq!(
            literal(EdmType::DateTimeOffset, Value::from("2024-03-01T12:30:05+01:00")),
            "time'2024-03-01T12:30:05+01:00'"
        );
        assert_eq!(literal(EdmType::Time, Value::Int(5405)), "time'PT1H30M5S'");
        assert_eq!(literal(EdmType::Binary, Value::Binary(vec![0x0a, 0xff])), "X'0aff'");
        assert_eq!(literal(EdmType::String, Value::from("it's")), "'it''s'");
        assert_eq!(literal(EdmType::FixedString(6), Value::from(" 42")), "'    42'");
    }

    #[test]
    fn test_collection_not_filterable() {
        let edm = EdmType::Collection("SalesInvoiceLine".into());
        assert!(!edm.is_filterable());
        assert_eq!(edm.collection_of(), Some("SalesInvoiceLine"));
        assert!(edm.encode_for_filter(&Value::Collection(vec![])).is_err());
    }

    #[test]
    fn test_no_silent_coercion() {
        assert!(EdmType::Int32.encode(&Value::Int(i64::from(i32::MAX) + 1)).is_err());
        assert!(EdmType::Int32.encode(&Value::from("12")).is_err());
        assert!(EdmType::Boolean.decode(&json!(1)).is_err());
        assert!(EdmType::String.decode(&json!(12)).is_err());
    }

    #[test]
    fn test_serialized_form() {
        let json = serde_json::to_value(EdmType::FixedString(18)).unwrap();
        assert_eq!(json, json!({"type": "FixedString", "of": 18}));
        let back: EdmType = serde_json::from_value(json!({"type": "Int32"})).unwrap();
        assert_eq!(back, EdmType::Int32);
    }
}
