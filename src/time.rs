//! Timestamp ingestion helpers.
//!
//! Upstream propagators emit ISO-8601 strings in a handful of UTC spellings
//! (`...Z`, `...+00:00`, bare, or with an explicit `UTC` suffix). Everything is parsed once
//! into a [`hifitime::Epoch`] here and the rest of the crate only deals with epochs.

use std::cmp::Ordering;
use std::str::FromStr;

use hifitime::{Duration, Epoch};

use crate::constants::Second;
use crate::pool_errors::PoolError;

/// Parse an ISO-8601 UTC timestamp into an [`Epoch`].
///
/// Accepted suffixes: `Z`, `+00:00`, ` UTC`, or none (UTC assumed).
/// Any other offset is rejected rather than silently shifted.
///
/// Errors
/// ----------
/// * [`PoolError::InvalidTimestamp`] if the string is not a valid UTC date-time.
pub fn parse_utc_timestamp(raw: &str) -> Result<Epoch, PoolError> {
    let trimmed = raw.trim();
    let core = trimmed
        .strip_suffix('Z')
        .or_else(|| trimmed.strip_suffix("+00:00"))
        .or_else(|| trimmed.strip_suffix(" UTC"))
        .unwrap_or(trimmed);

    // a remaining '+' or a '-' after the time separator means a non-UTC offset
    let has_offset = core
        .split_once('T')
        .map(|(_, time)| time.contains('+') || time.contains('-'))
        .unwrap_or(false);
    if core.is_empty() || has_offset {
        return Err(PoolError::InvalidTimestamp(raw.to_string()));
    }

    Epoch::from_str(&format!("{core} UTC")).map_err(|_| PoolError::InvalidTimestamp(raw.to_string()))
}

/// Signed number of seconds from `from` to `to`.
#[inline]
pub fn seconds_between(from: Epoch, to: Epoch) -> Second {
    (to - from).to_seconds()
}

/// Shift an epoch by a (possibly fractional) number of seconds.
#[inline]
pub fn shift_seconds(epoch: Epoch, seconds: Second) -> Epoch {
    epoch + Duration::from_seconds(seconds)
}

/// Total order on epochs for sorting; epochs never compare as unordered in practice.
#[inline]
pub fn cmp_epochs(a: &Epoch, b: &Epoch) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod time_test {
    use super::*;

    #[test]
    fn parses_common_utc_spellings() {
        let expected = Epoch::from_gregorian_utc_hms(2025, 9, 18, 12, 30, 0);
        for raw in [
            "2025-09-18T12:30:00Z",
            "2025-09-18T12:30:00+00:00",
            "2025-09-18T12:30:00",
            "2025-09-18T12:30:00 UTC",
        ] {
            assert_eq!(parse_utc_timestamp(raw).unwrap(), expected, "{raw}");
        }
    }

    #[test]
    fn rejects_garbage_and_offsets() {
        assert_eq!(
            parse_utc_timestamp("not a date"),
            Err(PoolError::InvalidTimestamp("not a date".into()))
        );
        assert!(parse_utc_timestamp("2025-09-18T12:30:00+08:00").is_err());
        assert!(parse_utc_timestamp("").is_err());
    }

    #[test]
    fn seconds_between_is_signed() {
        let a = Epoch::from_gregorian_utc_hms(2025, 9, 18, 0, 0, 0);
        let b = shift_seconds(a, 90.0);
        assert_eq!(seconds_between(a, b), 90.0);
        assert_eq!(seconds_between(b, a), -90.0);
        assert_eq!(cmp_epochs(&a, &b), Ordering::Less);
    }
}
