//! TimeSpan parsing and conversion to milliseconds
//!
//! TRX stores durations as .NET `TimeSpan` strings: `[d.]hh:mm:ss[.fffffff]`,
//! where the fraction has at most seven digits (100ns ticks).

const TICKS_PER_SECOND: u64 = 10_000_000;
const TICKS_PER_MILLISECOND: u64 = 10_000;

/// Parse a TimeSpan string into 100ns ticks. Returns `None` for anything
/// that is not a non-negative TimeSpan.
pub fn parse_timespan_ticks(value: &str) -> Option<u64> {
    let value = value.trim();
    let mut parts = value.split(':');
    let (days_hours, minutes, seconds) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let (days, hours) = match days_hours.split_once('.') {
        Some((d, h)) => (parse_digits(d)?, parse_digits(h)?),
        None => (0, parse_digits(days_hours)?),
    };
    let minutes = parse_digits(minutes)?;

    let (whole_seconds, fraction) = match seconds.split_once('.') {
        Some((s, f)) => (parse_digits(s)?, parse_fraction_ticks(f)?),
        None => (parse_digits(seconds)?, 0),
    };

    if hours > 23 || minutes > 59 || whole_seconds > 59 {
        return None;
    }

    let total_seconds = days
        .checked_mul(86_400)?
        .checked_add(hours * 3_600)?
        .checked_add(minutes * 60)?
        .checked_add(whole_seconds)?;
    total_seconds
        .checked_mul(TICKS_PER_SECOND)?
        .checked_add(fraction)
}

/// Convert ticks to milliseconds, rounding half up.
pub fn ticks_to_millis(ticks: u64) -> u64 {
    ticks.saturating_add(TICKS_PER_MILLISECOND / 2) / TICKS_PER_MILLISECOND
}

/// Parse a TimeSpan string straight to milliseconds.
pub fn parse_timespan_millis(value: &str) -> Option<u64> {
    parse_timespan_ticks(value).map(ticks_to_millis)
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Fraction digits right-padded to seven places
fn parse_fraction_ticks(s: &str) -> Option<u64> {
    if s.len() > 7 {
        return None;
    }
    let digits = parse_digits(s)?;
    Some(digits * 10u64.pow(7 - s.len() as u32))
}
