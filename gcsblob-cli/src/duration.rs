//! Durations written the Go way: `300ms`, `1.5h`, `2h45m`.

use std::time::Duration;
use thiserror::Error;

const NANOS_PER_MICRO: u64 = 1_000;
const NANOS_PER_MILLI: u64 = 1_000_000;
const NANOS_PER_SEC: u64 = 1_000_000_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseDurationError {
    #[error("invalid duration \"{0}\"")]
    Invalid(String),

    #[error("missing unit in duration \"{0}\"")]
    MissingUnit(String),

    #[error("unknown unit \"{unit}\" in duration \"{input}\"")]
    UnknownUnit { unit: String, input: String },

    #[error("negative duration \"{0}\"")]
    Negative(String),
}

fn unit_nanos(unit: &str) -> Option<u64> {
    let nanos = match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => NANOS_PER_MICRO,
        "ms" => NANOS_PER_MILLI,
        "s" => NANOS_PER_SEC,
        "m" => 60 * NANOS_PER_SEC,
        "h" => 60 * 60 * NANOS_PER_SEC,
        _ => return None,
    };
    Some(nanos)
}

/// Splits the leading run of ASCII digits off `s`.
fn leading_digits(s: &str) -> (&str, &str) {
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or_else(|| s.len());
    s.split_at(end)
}

pub fn parse_duration(input: &str) -> Result<Duration, ParseDurationError> {
    let invalid = || ParseDurationError::Invalid(input.to_string());

    let (negative, mut rest) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };

    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let (int_part, after_int) = leading_digits(rest);
        let (frac_part, after_frac) = match after_int.strip_prefix('.') {
            Some(after_dot) => leading_digits(after_dot),
            None => ("", after_int),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }

        let unit_end = after_frac
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or_else(|| after_frac.len());
        let (unit, remaining) = after_frac.split_at(unit_end);
        if unit.is_empty() {
            return Err(ParseDurationError::MissingUnit(input.to_string()));
        }
        let unit_nanos = unit_nanos(unit).ok_or_else(|| ParseDurationError::UnknownUnit {
            unit: unit.to_string(),
            input: input.to_string(),
        })? as u128;

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid())?
        };
        total = whole
            .checked_mul(unit_nanos)
            .and_then(|nanos| total.checked_add(nanos))
            .ok_or_else(invalid)?;

        // Digits past nanosecond precision of the largest unit cannot matter.
        let frac_part = &frac_part[..frac_part.len().min(18)];
        if !frac_part.is_empty() {
            let numerator: u128 = frac_part.parse().map_err(|_| invalid())?;
            let scale = 10u128.pow(frac_part.len() as u32);
            total = total
                .checked_add(numerator * unit_nanos / scale)
                .ok_or_else(invalid)?;
        }

        rest = remaining;
    }

    if total > i64::MAX as u128 {
        return Err(invalid());
    }
    if negative && total != 0 {
        return Err(ParseDurationError::Negative(input.to_string()));
    }

    let secs = (total / NANOS_PER_SEC as u128) as u64;
    let nanos = (total % NANOS_PER_SEC as u128) as u32;
    Ok(Duration::new(secs, nanos))
}
