//! Duration strings such as `"300ms"`, `"1.5h"` or `"-1h30m"`.

use crate::error::DurationParseError;
use chrono::TimeDelta;

/// Largest magnitude representable as signed 64-bit nanoseconds, plus one
/// for the negative side.
const MAX_MAGNITUDE: u64 = 1 << 63;

fn unit_nanos(unit: &str) -> Option<u64> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(1_000_000_000),
        "m" => Some(60 * 1_000_000_000),
        "h" => Some(3_600 * 1_000_000_000),
        _ => None,
    }
}

/// Consumes leading decimal digits. Returns the value, the remainder and
/// the number of digits consumed, or `None` on overflow.
fn leading_int(s: &str) -> Option<(u64, &str, usize)> {
    let digits = s.bytes().take_while(u8::is_ascii_digit).count();
    let mut value: u64 = 0;
    for b in s[..digits].bytes() {
        if value > MAX_MAGNITUDE / 10 {
            return None;
        }
        value = value * 10 + u64::from(b - b'0');
        if value > MAX_MAGNITUDE {
            return None;
        }
    }
    Some((value, &s[digits..], digits))
}

/// Consumes fractional digits after the decimal point. Digits past the
/// precision of `u64` are dropped rather than treated as an error.
fn leading_fraction(s: &str) -> (u64, f64, &str, usize) {
    let digits = s.bytes().take_while(u8::is_ascii_digit).count();
    let mut value: u64 = 0;
    let mut scale = 1.0_f64;
    let mut saturated = false;
    for b in s[..digits].bytes() {
        if saturated {
            continue;
        }
        if value > (MAX_MAGNITUDE - 1) / 10 {
            saturated = true;
            continue;
        }
        let next = value * 10 + u64::from(b - b'0');
        if next > MAX_MAGNITUDE {
            saturated = true;
            continue;
        }
        value = next;
        scale *= 10.0;
    }
    (value, scale, &s[digits..], digits)
}

/// Parses a duration string.
///
/// A duration is an optional sign followed by one or more decimal numbers,
/// each with an optional fraction and a mandatory unit: `ns`, `us` (or `µs`),
/// `ms`, `s`, `m`, `h`. The bare string `"0"` needs no unit.
///
/// # Errors
///
/// Returns [`DurationParseError`] when the syntax is wrong, a unit is missing
/// or unknown, or the total overflows signed 64-bit nanoseconds.
///
/// # Examples
///
/// ```
/// use shiori_core::parse_duration;
/// use chrono::TimeDelta;
///
/// assert_eq!(parse_duration("1.5h").unwrap(), TimeDelta::minutes(90));
/// assert_eq!(parse_duration("-1m30s").unwrap(), TimeDelta::seconds(-90));
/// assert!(parse_duration("soon").is_err());
/// ```
pub fn parse_duration(input: &str) -> Result<TimeDelta, DurationParseError> {
    let invalid = || DurationParseError::Invalid(input.to_string());

    let mut s = input;
    let mut negative = false;
    if let Some(rest) = s.strip_prefix('-') {
        negative = true;
        s = rest;
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }

    if s == "0" {
        return Ok(TimeDelta::zero());
    }
    if s.is_empty() {
        return Err(invalid());
    }

    let mut total: u64 = 0;
    while !s.is_empty() {
        match s.chars().next() {
            Some(c) if c == '.' || c.is_ascii_digit() => {}
            _ => return Err(invalid()),
        }

        let (whole, rest, whole_digits) = leading_int(s).ok_or_else(invalid)?;
        s = rest;

        let mut fraction = 0;
        let mut scale = 1.0;
        let mut fraction_digits = 0;
        if let Some(rest) = s.strip_prefix('.') {
            let (f, sc, rest, n) = leading_fraction(rest);
            fraction = f;
            scale = sc;
            fraction_digits = n;
            s = rest;
        }
        if whole_digits == 0 && fraction_digits == 0 {
            // "." or "-.s"
            return Err(invalid());
        }

        let unit_len = s
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(s.len());
        if unit_len == 0 {
            return Err(DurationParseError::MissingUnit(input.to_string()));
        }
        let unit = &s[..unit_len];
        s = &s[unit_len..];
        let nanos = unit_nanos(unit).ok_or_else(|| DurationParseError::UnknownUnit {
            unit: unit.to_string(),
            input: input.to_string(),
        })?;

        if whole > MAX_MAGNITUDE / nanos {
            return Err(invalid());
        }
        let mut value = whole * nanos;
        if fraction > 0 {
            value += (fraction as f64 * (nanos as f64 / scale)) as u64;
            if value > MAX_MAGNITUDE {
                return Err(invalid());
            }
        }

        total = total
            .checked_add(value)
            .filter(|t| *t <= MAX_MAGNITUDE)
            .ok_or_else(invalid)?;
    }

    let signed = if negative {
        -(i128::from(total))
    } else {
        i128::from(total)
    };
    let nanos = i64::try_from(signed).map_err(|_| invalid())?;
    Ok(TimeDelta::nanoseconds(nanos))
}
