use std::time::Duration;

use crate::config::ConfigError;

/// Longest accepted interval, 30 days.
pub const MAX_INTERVAL: Duration = Duration::from_secs(30 * 24 * 3600);

/// Parses a logging interval such as `30s`, `15m` or `1h`.
///
/// A bare number is taken as seconds. Zero and anything above
/// [`MAX_INTERVAL`] are rejected.
///
/// ```
/// # use senceit_node::datalogger::interval::parse_interval;
/// # use std::time::Duration;
/// assert_eq!(parse_interval("15m").unwrap(), Duration::from_millis(900_000));
/// ```
pub fn parse_interval(interval: &str) -> Result<Duration, ConfigError> {
    let trimmed = interval.trim();
    let invalid = || ConfigError::InvalidInterval(interval.to_string());

    let (count, unit_secs) = match trimmed.char_indices().last() {
        Some((i, 's')) => (&trimmed[..i], 1),
        Some((i, 'm')) => (&trimmed[..i], 60),
        Some((i, 'h')) => (&trimmed[..i], 3600),
        Some(_) => (trimmed, 1),
        None => return Err(invalid()),
    };

    let count: u64 = count.trim().parse().map_err(|_| invalid())?;
    if count == 0 {
        return Err(invalid());
    }
    let secs = count.checked_mul(unit_secs).ok_or_else(invalid)?;
    let interval = Duration::from_secs(secs);
    if interval > MAX_INTERVAL {
        return Err(invalid());
    }

    Ok(interval)
}
