//! Date, time and duration rules

use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDateTime, NaiveTime, SecondsFormat, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as Json;

use super::mismatch;
use super::numeric::wire_mismatch;
use crate::api::errors::ValidationError;
use crate::api::hydration::Value;

const LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const LOCAL_FORMAT_FRACTION: &str = "%Y-%m-%dT%H:%M:%S%.f";

pub(super) const MAX_DURATION_SECS: u64 = 24 * 60 * 60;

/// `/Date(1709294400000)/` or `/Date(1709294400000+0100)/`
static DATE_WRAPPER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/Date\((-?\d+)(?:([+-])(\d{2})(\d{2}))?\)/$").expect("date pattern is valid")
});

static DURATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)(?:\.(\d+))?S)?$")
        .expect("duration pattern is valid")
});

pub(super) fn datetime(value: &Value) -> Result<NaiveDateTime, ValidationError> {
    match value {
        Value::DateTime(dt) => Ok(*dt),
        Value::String(s) => NaiveDateTime::parse_from_str(s, LOCAL_FORMAT).map_err(|_| {
            ValidationError::reason(format!("'{}' is not a Y-m-dTH:i:s datetime", s))
        }),
        other => Err(mismatch("datetime", other)),
    }
}

pub(super) fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format(LOCAL_FORMAT).to_string()
}

fn wrapped_millis(s: &str) -> Option<(i64, Option<i32>)> {
    let caps = DATE_WRAPPER.captures(s)?;
    let millis = caps.get(1)?.as_str().parse::<i64>().ok()?;
    let offset = match (caps.get(2), caps.get(3), caps.get(4)) {
        (Some(sign), Some(hours), Some(minutes)) => {
            let hours: i32 = hours.as_str().parse().ok()?;
            let minutes: i32 = minutes.as_str().parse().ok()?;
            let seconds = hours * 3600 + minutes * 60;
            Some(if sign.as_str() == "-" { -seconds } else { seconds })
        }
        _ => None,
    };
    Some((millis, offset))
}

pub(super) fn decode_datetime(wire: &Json) -> Result<NaiveDateTime, ValidationError> {
    let s = match wire {
        Json::String(s) => s,
        other => return Err(wire_mismatch("datetime string", other)),
    };

    // The service reports local wall-clock time as if it were UTC
    if let Some((millis, _)) = wrapped_millis(s) {
        return DateTime::from_timestamp_millis(millis)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| ValidationError::reason(format!("'{}' is out of range", s)));
    }

    NaiveDateTime::parse_from_str(s, LOCAL_FORMAT_FRACTION)
        .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.naive_local()))
        .map_err(|_| ValidationError::reason(format!("'{}' is not a datetime", s)))
}

pub(super) fn datetime_offset(value: &Value) -> Result<DateTime<FixedOffset>, ValidationError> {
    match value {
        Value::DateTimeOffset(dt) => Ok(*dt),
        Value::String(s) => DateTime::parse_from_rfc3339(s).map_err(|_| {
            ValidationError::reason(format!("'{}' is not an ISO-8601 datetime with offset", s))
        }),
        other => Err(mismatch("datetimeoffset", other)),
    }
}

pub(super) fn format_offset(dt: &DateTime<FixedOffset>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, false)
}

pub(super) fn decode_offset(wire: &Json) -> Result<DateTime<FixedOffset>, ValidationError> {
    let s = match wire {
        Json::String(s) => s,
        other => return Err(wire_mismatch("datetimeoffset string", other)),
    };

    if let Some((millis, offset)) = wrapped_millis(s) {
        let offset = FixedOffset::east_opt(offset.unwrap_or(0))
            .ok_or_else(|| ValidationError::reason(format!("'{}' has an invalid offset", s)))?;
        return DateTime::from_timestamp_millis(millis)
            .map(|dt| dt.with_timezone(&offset))
            .ok_or_else(|| ValidationError::reason(format!("'{}' is out of range", s)));
    }

    datetime_offset(&Value::String(s.clone()))
}

/// Hours, minutes and seconds only; no day component, at most 24 hours
pub(super) fn duration(value: &Value) -> Result<Duration, ValidationError> {
    let d = match value {
        Value::Duration(d) => *d,
        Value::Int(secs) if *secs >= 0 => Duration::from_secs(*secs as u64),
        Value::Int(secs) => {
            return Err(ValidationError::reason(format!(
                "{} seconds is a negative duration",
                secs
            )));
        }
        other => return Err(mismatch("duration", other)),
    };
    if d.subsec_nanos() != 0 {
        return Err(ValidationError::reason(
            "durations have whole-second precision",
        ));
    }
    if d.as_secs() > MAX_DURATION_SECS {
        return Err(ValidationError::reason(format!(
            "{} seconds exceeds 24 hours",
            d.as_secs()
        )));
    }
    Ok(d)
}

pub(super) fn format_duration(d: &Duration) -> String {
    let secs = d.as_secs();
    format!("PT{}H{}M{}S", secs / 3600, (secs % 3600) / 60, secs % 60)
}

pub(super) fn decode_duration(wire: &Json) -> Result<Duration, ValidationError> {
    let secs = match wire {
        Json::String(s) => {
            if let Some(caps) = DURATION_PATTERN.captures(s) {
                if (1..=3).all(|i| caps.get(i).is_none()) {
                    return Err(ValidationError::reason(format!(
                        "'{}' has no hour, minute or second component",
                        s
                    )));
                }
                if caps.get(4).is_some_and(|f| f.as_str().bytes().any(|b| b != b'0')) {
                    return Err(ValidationError::reason(format!(
                        "'{}' has sub-second precision",
                        s
                    )));
                }
                let part = |i: usize| -> Result<u64, ValidationError> {
                    caps.get(i).map_or(Ok(0), |m| {
                        m.as_str().parse::<u64>().map_err(|_| {
                            ValidationError::reason(format!("'{}' is not a duration", s))
                        })
                    })
                };
                part(1)?
                    .saturating_mul(3600)
                    .saturating_add(part(2)?.saturating_mul(60))
                    .saturating_add(part(3)?)
            } else {
                let time = NaiveTime::parse_from_str(s, "%H:%M:%S").map_err(|_| {
                    ValidationError::reason(format!("'{}' is not a duration", s))
                })?;
                u64::from(time.num_seconds_from_midnight())
            }
        }
        Json::Number(n) => n
            .as_u64()
            .ok_or_else(|| ValidationError::reason(format!("{} is not a whole second count", n)))?,
        other => return Err(wire_mismatch("duration string", other)),
    };
    duration(&Value::Duration(Duration::from_secs(secs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn sample() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 30, 5)
            .unwrap()
    }

    #[test]
    fn test_local_datetime_literal() {
        assert_eq!(format_datetime(&sample()), "2024-03-01T12:30:05");
        assert_eq!(datetime(&Value::from("2024-03-01T12:30:05")).unwrap(), sample());
        assert!(datetime(&Value::from("2024-03-01 12:30:05")).is_err());
        assert!(datetime(&Value::from("01-03-2024")).is_err());
    }

    #[test]
    fn test_decode_wrapped_date() {
        // 2024-03-01T12:30:05Z
        let decoded = decode_datetime(&json!("/Date(1709296205000)/")).unwrap();
        assert_eq!(decoded, sample());

        let decoded = decode_datetime(&json!("2024-03-01T12:30:05.123")).unwrap();
        assert_eq!(format_datetime(&decoded), "2024-03-01T12:30:05");
    }

    #[test]
    fn test_decode_wrapped_offset() {
        let decoded = decode_offset(&json!("/Date(1709296205000+0100)/")).unwrap();
        assert_eq!(format_offset(&decoded), "2024-03-01T13:30:05+01:00");
    }

    #[test]
    fn test_duration_bounds() {
        assert_eq!(duration(&Value::Int(5400)).unwrap(), Duration::from_secs(5400));
        assert!(duration(&Value::Int(-1)).is_err());
        assert!(duration(&Value::Int(86_400)).is_ok());
        assert!(duration(&Value::Int(86_401)).is_err());
        assert!(duration(&Value::Duration(Duration::from_millis(1500))).is_err());
    }

    #[test]
    fn test_duration_wire_form() {
        assert_eq!(format_duration(&Duration::from_secs(5405)), "PT1H30M5S");
        assert_eq!(format_duration(&Duration::from_secs(0)), "PT0H0M0S");
        assert_eq!(decode_duration(&json!("PT1H30M5S")).unwrap(), Duration::from_secs(5405));
        assert_eq!(decode_duration(&json!("PT45M")).unwrap(), Duration::from_secs(2700));
        assert_eq!(decode_duration(&json!("08:15:00")).unwrap(), Duration::from_secs(29_700));
        assert!(decode_duration(&json!("PT25H")).is_err());
        assert!(decode_duration(&json!("P1DT2H")).is_err());

        assert!(decode_duration(&json!("PT1.5S")).is_err());
        assert_eq!(decode_duration(&json!("PT5.000S")).unwrap(), Duration::from_secs(5));
        assert!(decode_duration(&json!("PT")).is_err());
        assert!(decode_duration(&json!("PT99999999999999999999H")).is_err());
    }
}
