//! Go-style duration strings as spoken by the server ("10s", "1m30s", "250ms").
//!
//! The server also accepts and occasionally emits raw nanosecond counts, so
//! the deserializers take either form.

use std::time::Duration;
use serde::{Deserialize, Deserializer, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseDurationError {
    #[error("empty duration string")]
    Empty,
    #[error("negative durations are not supported: {0}")]
    Negative(String),
    #[error("invalid number in duration: {0}")]
    InvalidNumber(String),
    #[error("missing unit in duration: {0}")]
    MissingUnit(String),
    #[error("unknown unit {unit:?} in duration {input}")]
    UnknownUnit { unit: String, input: String },
    #[error("duration out of range: {0}")]
    Overflow(String),
}

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;
const NANOS_PER_MIN: u128 = 60 * NANOS_PER_SEC;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MIN;

/// Render a duration the way the server's own formatter does.
pub fn format(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < NANOS_PER_MICRO {
        return format!("{}ns", nanos);
    }
    if nanos < NANOS_PER_MILLI {
        return format!("{}us", decimal(nanos, NANOS_PER_MICRO));
    }
    if nanos < NANOS_PER_SEC {
        return format!("{}ms", decimal(nanos, NANOS_PER_MILLI));
    }

    let hours = nanos / NANOS_PER_HOUR;
    let minutes = (nanos % NANOS_PER_HOUR) / NANOS_PER_MIN;
    let seconds = nanos % NANOS_PER_MIN;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    out.push_str(&format!("{}s", decimal(seconds, NANOS_PER_SEC)));
    out
}

/// `value / unit` with the remainder as trailing-zero-free decimal digits
fn decimal(value: u128, unit: u128) -> String {
    let whole = value / unit;
    let rem = value % unit;
    if rem == 0 {
        return whole.to_string();
    }
    let width = unit.to_string().len() - 1;
    let frac = format!("{:0width$}", rem, width = width);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// Parse a duration string such as "1h15m", "1.5s" or "300ms".
pub fn parse(input: &str) -> Result<Duration, ParseDurationError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(ParseDurationError::Empty);
    }
    if s.starts_with('-') {
        return Err(ParseDurationError::Negative(input.to_string()));
    }
    let s = s.strip_prefix('+').unwrap_or(s);
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let overflow = || ParseDurationError::Overflow(input.to_string());
    let mut rest = s;
    let mut total: u128 = 0;

    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| ParseDurationError::MissingUnit(input.to_string()))?;
        let (number, tail) = rest.split_at(number_end);
        if number.is_empty() || number == "." {
            return Err(ParseDurationError::InvalidNumber(input.to_string()));
        }

        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_end);
        let scale = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => NANOS_PER_MICRO,
            "ms" => NANOS_PER_MILLI,
            "s" => NANOS_PER_SEC,
            "m" => NANOS_PER_MIN,
            "h" => NANOS_PER_HOUR,
            other => {
                return Err(ParseDurationError::UnknownUnit {
                    unit: other.to_string(),
                    input: input.to_string(),
                })
            }
        };

        let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
        let invalid = || ParseDurationError::InvalidNumber(input.to_string());
        let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| invalid())? };
        let mut nanos = whole.checked_mul(scale).ok_or_else(overflow)?;

        if !frac.is_empty() {
            if frac.contains('.') {
                return Err(invalid());
            }
            // anything past nanosecond precision is dropped
            let digits = frac.len().min(18);
            let frac_value: u128 = frac[..digits].parse().map_err(|_| invalid())?;
            nanos += frac_value * scale / 10u128.pow(digits as u32);
        }

        total = total.checked_add(nanos).ok_or_else(overflow)?;
        rest = tail;
    }

    let nanos = u64::try_from(total).map_err(|_| overflow())?;
    Ok(Duration::from_nanos(nanos))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Text(String),
    Nanos(u64),
}

impl RawDuration {
    fn into_duration(self) -> Result<Option<Duration>, ParseDurationError> {
        match self {
            RawDuration::Text(s) if s.trim().is_empty() => Ok(None),
            RawDuration::Text(s) => parse(&s).map(Some),
            RawDuration::Nanos(n) => Ok(Some(Duration::from_nanos(n))),
        }
    }
}

/// Serde adapter for `Option<Duration>` fields. Pair it with
/// `skip_serializing_if = "Option::is_none"` so unset values are omitted.
pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_str(&format(*d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        match Option::<RawDuration>::deserialize(deserializer)? {
            Some(raw) => raw.into_duration().map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
