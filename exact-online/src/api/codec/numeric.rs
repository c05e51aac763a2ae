//! Integer and floating point rules

use serde_json::Value as Json;

use super::mismatch;
use crate::api::errors::ValidationError;
use crate::api::hydration::Value;

pub(super) const DOUBLE_BOUND: f64 = f64::MAX;
pub(super) const SINGLE_BOUND: f64 = f32::MAX as f64;
pub(super) const DECIMAL_BOUND: f64 = 7.922_816_251_426_434e28;

pub(super) fn integer(value: &Value, min: i64, max: i64) -> Result<i64, ValidationError> {
    let i = match value {
        Value::Int(i) => *i,
        other => return Err(mismatch("integer", other)),
    };
    if i < min || i > max {
        return Err(ValidationError::reason(format!(
            "{} is outside {}..={}",
            i, min, max
        )));
    }
    Ok(i)
}

/// Wide integers may arrive as JSON strings
pub(super) fn decode_integer(wire: &Json, min: i64, max: i64) -> Result<i64, ValidationError> {
    let i = match wire {
        Json::Number(n) => n
            .as_i64()
            .ok_or_else(|| ValidationError::reason(format!("{} is not an integer", n)))?,
        Json::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::reason(format!("'{}' is not an integer", s)))?,
        other => return Err(wire_mismatch("integer", other)),
    };
    integer(&Value::Int(i), min, max)
}

/// One magnitude check regardless of whether the input was integral
pub(super) fn float(value: &Value, bound: f64) -> Result<f64, ValidationError> {
    let f = match value {
        Value::Float(f) => *f,
        Value::Int(i) => *i as f64,
        other => return Err(mismatch("number", other)),
    };
    if !f.is_finite() {
        return Err(ValidationError::reason(format!("{} is not a finite number", f)));
    }
    if f.abs() > bound {
        return Err(ValidationError::reason(format!(
            "{} exceeds the magnitude bound {:e}",
            f, bound
        )));
    }
    Ok(f)
}

pub(super) fn decode_float(wire: &Json, bound: f64) -> Result<f64, ValidationError> {
    let f = match wire {
        Json::Number(n) => n
            .as_f64()
            .ok_or_else(|| ValidationError::reason(format!("{} is not representable", n)))?,
        Json::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ValidationError::reason(format!("'{}' is not a number", s)))?,
        other => return Err(wire_mismatch("number", other)),
    };
    float(&Value::Float(f), bound)
}

pub(super) fn encode_float(f: f64) -> Json {
    // Finite after validation, so the conversion cannot fail
    serde_json::Number::from_f64(f)
        .map(Json::Number)
        .unwrap_or(Json::Null)
}

pub(super) fn wire_mismatch(expected: &str, wire: &Json) -> ValidationError {
    let got = match wire {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    };
    ValidationError::reason(format!("expected {} on the wire, got {}", expected, got))
}
