//! Parsers for the vendor-formatted strings RouterOS returns.
//!
//! RouterOS renders durations as run-together `<number><unit>` groups
//! (`4w2d3h37m8.5s`), counters as plain decimal strings and flags as the
//! literal `true`/`false`.

use std::time::Duration;

/// A field value that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatError {
    pub input: String,
    pub message: String,
}

impl FormatError {
    fn new(input: &str, message: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot parse '{}': {}", self.input, self.message)
    }
}

impl std::error::Error for FormatError {}

const NANOS_PER_MILLI: u64 = 1_000_000;
const NANOS_PER_SEC: u64 = 1_000 * NANOS_PER_MILLI;
const MINUTE: u64 = 60 * NANOS_PER_SEC;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;

/// Parse a RouterOS duration such as `4w2d3h37m8.5s` or `1m5s250ms`.
///
/// | Unit | Meaning      |
/// |------|--------------|
/// | `w`  | weeks        |
/// | `d`  | days         |
/// | `h`  | hours        |
/// | `m`  | minutes      |
/// | `s`  | seconds      |
/// | `ms` | milliseconds |
///
/// Every unit takes a whole or fractional value (`1.5ms`, `.5s`).
///
/// # Examples
///
/// ```
/// use ros_exporter::parse::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
/// assert!(parse_duration("10").is_err());
/// ```
pub fn parse_duration(input: &str) -> Result<Duration, FormatError> {
    if input.is_empty() {
        return Err(FormatError::new(input, "empty duration"));
    }

    let mut total = Duration::ZERO;
    let mut number = String::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_ascii_digit() || c == '.' {
            number.push(c);
            continue;
        }

        if number.is_empty() {
            return Err(FormatError::new(
                input,
                format!("unit '{}' without a value", c),
            ));
        }

        let unit = match c {
            'w' => WEEK,
            'd' => DAY,
            'h' => HOUR,
            'm' if chars.peek() == Some(&'s') => {
                chars.next();
                NANOS_PER_MILLI
            }
            'm' => MINUTE,
            's' => NANOS_PER_SEC,
            other => {
                return Err(FormatError::new(
                    input,
                    format!("unknown unit '{}'", other),
                ));
            }
        };

        total = total
            .checked_add(scaled(input, &number, unit)?)
            .ok_or_else(|| FormatError::new(input, "duration overflow"))?;
        number.clear();
    }

    if !number.is_empty() {
        return Err(FormatError::new(input, "trailing number without unit"));
    }

    Ok(total)
}

/// `number` units of `unit_nanos` each. Whole values are exact; fractional
/// ones round to the nearest nanosecond.
fn scaled(input: &str, number: &str, unit_nanos: u64) -> Result<Duration, FormatError> {
    let overflow = || FormatError::new(input, "duration overflow");

    if let Ok(whole) = number.parse::<u64>() {
        let nanos = u128::from(whole) * u128::from(unit_nanos);
        let secs = u64::try_from(nanos / u128::from(NANOS_PER_SEC)).map_err(|_| overflow())?;
        // remainder is below one second
        let sub = (nanos % u128::from(NANOS_PER_SEC)) as u32;
        return Ok(Duration::new(secs, sub));
    }

    let value: f64 = number
        .parse()
        .map_err(|e| FormatError::new(input, format!("bad value '{}': {}", number, e)))?;
    let nanos = (value * unit_nanos as f64).round();
    if !nanos.is_finite() || nanos >= u64::MAX as f64 {
        return Err(overflow());
    }
    Ok(Duration::from_nanos(nanos as u64))
}

/// Parse an unsigned decimal counter.
pub fn parse_bytes(input: &str) -> Result<u64, FormatError> {
    if input.is_empty() {
        return Err(FormatError::new(input, "empty value"));
    }
    input
        .parse::<u64>()
        .map_err(|e| FormatError::new(input, e.to_string()))
}

/// RouterOS flag: only a case-insensitive `true` is true.
pub fn parse_bool(input: &str) -> bool {
    input.eq_ignore_ascii_case("true")
}

/// Leading signed integer of a value like `-74@6Mbps`.
pub fn parse_signal(input: &str) -> Result<i64, FormatError> {
    let head = input.split('@').next().unwrap_or_default().trim();
    head.parse::<i64>()
        .map_err(|e| FormatError::new(input, e.to_string()))
}

/// Strip one of `units` from the end of `input` and parse the rest as a float.
///
/// Values carrying a suffix outside `units` are rejected rather than guessed at.
pub fn parse_measurement(input: &str, units: &[&str]) -> Result<f64, FormatError> {
    let trimmed = input.trim();
    let number = units
        .iter()
        .find_map(|unit| trimmed.strip_suffix(unit))
        .unwrap_or(trimmed)
        .trim_end();
    number
        .parse::<f64>()
        .map_err(|e| FormatError::new(input, e.to_string()))
}

/// Wireless rate such as `6Mbps` or `26Mbps-20MHz/1S` in bits per second.
///
/// Only the leading `<number><unit>` matters; the channel description that
/// may follow a `-` is ignored. A bare number is taken as bits per second.
pub fn parse_rate(input: &str) -> Result<f64, FormatError> {
    let head = input.split(['-', '/']).next().unwrap_or_default().trim();
    let split = head
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(head.len());
    let (number, unit) = head.split_at(split);
    let scale = match unit.trim() {
        "" | "bps" => 1.0,
        "kbps" | "Kbps" => 1e3,
        "Mbps" => 1e6,
        "Gbps" => 1e9,
        other => return Err(FormatError::new(input, format!("unknown rate unit '{}'", other))),
    };
    let value: f64 = number
        .parse()
        .map_err(|e| FormatError::new(input, format!("bad rate '{}': {}", number, e)))?;
    Ok(value * scale)
}
