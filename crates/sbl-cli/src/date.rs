//! `--date` parsing: POSIX seconds or ISO-8601 `%Y-%m-%dT%H:%M:%S%z`
//! (spec.md §6, `certgen`/`sign`).

use anyhow::{Context, Result};
use chrono::DateTime;
use std::time::{SystemTime, UNIX_EPOCH};

/// Parses `--date`, defaulting to the current time when omitted.
pub fn parse_date(arg: Option<&str>) -> Result<u64> {
    match arg {
        None => Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs()),
        Some(s) => parse_date_str(s),
    }
}

fn parse_date_str(s: &str) -> Result<u64> {
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(secs);
    }
    let parsed = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z")
        .with_context(|| format!("{s:?} is neither POSIX seconds nor %Y-%m-%dT%H:%M:%S%z"))?;
    Ok(parsed.timestamp().max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_posix_seconds() {
        assert_eq!(parse_date_str("1700000000").unwrap(), 1700000000);
    }

    #[test]
    fn parses_iso8601() {
        let parsed = parse_date_str("2023-11-14T22:13:20+0000").unwrap();
        assert_eq!(parsed, 1700000000);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_date_str("not-a-date").is_err());
    }
}
