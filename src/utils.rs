use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationParseError {
    #[error("empty duration")]
    Empty,
    #[error("invalid duration '{0}': expected forms like 250ms, 30s, 2m, 1h or 1m30s")]
    Invalid(String),
}

/// Parses durations such as `250ms`, `30s`, `2m`, `1h`, `1m30s`.
/// A bare number is read as seconds. `us` and `ns` are accepted so that
/// [`duration_string`] output always reads back unchanged.
pub fn parse_duration(input: &str) -> Result<Duration, DurationParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(DurationParseError::Empty);
    }

    if let Ok(seconds) = input.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }

    let invalid = || DurationParseError::Invalid(input.to_string());
    let mut total = Duration::ZERO;
    let mut rest = input;

    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if digits == 0 {
            return Err(invalid());
        }
        let number = &rest[..digits];
        rest = &rest[digits..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        let nanos_per_unit: u64 = match &rest[..unit_len] {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60_000_000_000,
            "h" => 3_600_000_000_000,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];

        let nanos = if number.contains('.') {
            let value: f64 = number.parse().map_err(|_| invalid())?;
            let nanos = (value * nanos_per_unit as f64).round();
            if !nanos.is_finite() || nanos >= u64::MAX as f64 {
                return Err(invalid());
            }
            nanos as u64
        } else {
            number
                .parse::<u64>()
                .ok()
                .and_then(|value| value.checked_mul(nanos_per_unit))
                .ok_or_else(invalid)?
        };

        total = total
            .checked_add(Duration::from_nanos(nanos))
            .ok_or_else(invalid)?;
    }

    Ok(total)
}

/// Exact textual form of a duration, used when configs are written back
/// out. Whole seconds keep the schedule style (`1m30s`); anything finer
/// falls back to `ms` or `ns`.
pub fn duration_string(d: Duration) -> String {
    if d.subsec_nanos() == 0 {
        format_duration(d)
    } else if d.subsec_nanos() % 1_000_000 == 0 {
        format!("{}ms", d.as_millis())
    } else {
        format!("{}ns", d.as_nanos())
    }
}

/// Formats a duration the way stage schedules are written (`1m30s`, `45s`,
/// `250ms`). Display only: sub-second parts above one second are truncated
/// to tenths.
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let millis = d.subsec_millis();

    if total_secs == 0 {
        format!("{}ms", millis)
    } else if total_secs < 60 {
        if millis > 0 {
            format!("{}.{}s", total_secs, millis / 100)
        } else {
            format!("{}s", total_secs)
        }
    } else {
        let hours = total_secs / 3600;
        let mins = (total_secs % 3600) / 60;
        let secs = total_secs % 60;
        let mut out = String::new();
        if hours > 0 {
            out.push_str(&format!("{}h", hours));
        }
        if mins > 0 {
            out.push_str(&format!("{}m", mins));
        }
        if secs > 0 {
            out.push_str(&format!("{}s", secs));
        }
        out
    }
}

/// Formats a millisecond value for summaries: `812.4ms`, `1.52s`, `2m3s`.
pub fn format_millis(ms: f64) -> String {
    if ms < 1.0 {
        format!("{:.2}µs", ms * 1000.0)
    } else if ms < 1000.0 {
        format!("{:.2}ms", ms)
    } else if ms < 60_000.0 {
        format!("{:.2}s", ms / 1000.0)
    } else {
        format_duration(Duration::from_millis(ms as u64))
    }
}

pub fn format_size(bytes: f64) -> String {
    if bytes < 1000.0 {
        format!("{} B", bytes as u64)
    } else if bytes < 1_000_000.0 {
        format!("{:.1} kB", bytes / 1000.0)
    } else {
        format!("{:.1} MB", bytes / 1_000_000.0)
    }
}
