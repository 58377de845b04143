//! Alias-table lookups across RouterOS API generations.
//!
//! Each logical attribute is described by an ordered list of field names,
//! newest spelling first. The first name present with a non-empty value wins;
//! when none match the attribute takes its zero value. A missing field is
//! never a collection failure.

use tracing::{debug, trace};

use crate::parse::{parse_bool, parse_bytes, parse_duration};
use crate::routeros::Record;
use std::time::Duration;

/// Ordered candidate names for one logical attribute.
pub type Aliases = &'static [&'static str];

/// First candidate present with a non-empty value, as `(field, value)`.
pub fn resolve<'a>(record: &'a Record, aliases: &[&str]) -> Option<(&'a str, &'a str)> {
    aliases.iter().find_map(|alias| {
        record
            .get_key_value(*alias)
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| (key.as_str(), value.as_str()))
    })
}

pub fn resolve_str(record: &Record, aliases: &[&str]) -> String {
    resolve(record, aliases)
        .map(|(_, value)| value.to_string())
        .unwrap_or_default()
}

/// Resolve an unsigned counter; unparseable values read as zero.
pub fn resolve_u64(record: &Record, aliases: &[&str]) -> u64 {
    let Some((field, value)) = resolve(record, aliases) else {
        return 0;
    };
    match parse_bytes(value) {
        Ok(n) => {
            trace!(field, value = n, "resolved counter");
            n
        }
        Err(e) => {
            debug!(field, error = %e, "unparseable counter, using 0");
            0
        }
    }
}

pub fn resolve_bool(record: &Record, aliases: &[&str]) -> bool {
    resolve(record, aliases)
        .map(|(_, value)| parse_bool(value))
        .unwrap_or(false)
}

/// Resolve a duration; unparseable values read as zero.
pub fn resolve_duration(record: &Record, aliases: &[&str]) -> Duration {
    let Some((field, value)) = resolve(record, aliases) else {
        return Duration::ZERO;
    };
    parse_duration(value).unwrap_or_else(|e| {
        debug!(field, error = %e, "unparseable duration, using 0");
        Duration::ZERO
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    const RX_BYTES: Aliases = &["rx-byte", "rx-bytes", "bytes-in"];

    #[test]
    fn falls_through_to_oldest_alias() {
        let r = record(&[("bytes-in", "42")]);
        assert_eq!(resolve(&r, RX_BYTES), Some(("bytes-in", "42")));
        assert_eq!(resolve_u64(&r, RX_BYTES), 42);
    }

    #[test]
    fn newest_alias_wins() {
        let r = record(&[("bytes-in", "1"), ("rx-byte", "2")]);
        assert_eq!(resolve_u64(&r, RX_BYTES), 2);
    }

    #[test]
    fn empty_values_are_skipped() {
        let r = record(&[("rx-byte", ""), ("rx-bytes", "7")]);
        assert_eq!(resolve_u64(&r, RX_BYTES), 7);
    }

    #[test]
    fn absent_attribute_is_zero_value() {
        let r = record(&[("name", "ether1")]);
        assert_eq!(resolve(&r, RX_BYTES), None);
        assert_eq!(resolve_u64(&r, RX_BYTES), 0);
        assert_eq!(resolve_str(&r, &["comment"]), "");
        assert!(!resolve_bool(&r, &["disabled"]));
        assert_eq!(resolve_duration(&r, &["uptime"]), Duration::ZERO);
    }

    #[test]
    fn garbage_counter_reads_zero() {
        let r = record(&[("rx-byte", "n/a")]);
        assert_eq!(resolve_u64(&r, RX_BYTES), 0);
    }
}
