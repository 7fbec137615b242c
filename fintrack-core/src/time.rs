//! Date utilities: the two date forms the tracker deals with, and
//! timezone-aware "today".
//!
//! Users read and type dates as `DD/MM/YYYY`; the ledger stores `YYYY-MM-DD`.

use std::sync::LazyLock;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use regex::Regex;
use thiserror::Error;

/// Format used on the command line, in prompts and in the UI.
pub const DISPLAY_FORMAT: &str = "%d/%m/%Y";
/// Format persisted in the ledger.
pub const STORAGE_FORMAT: &str = "%Y-%m-%d";

static DISPLAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}/\d{2}/\d{4}$").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("date '{0}' must be in DD/MM/YYYY format")]
    Format(String),
    #[error("date '{0}' is not a real calendar date")]
    OutOfRange(String),
}

/// Parse a `DD/MM/YYYY` date. The shape is checked before the calendar, so
/// `1/3/2024` is a format error while `31/02/2024` is out of range.
pub fn parse_display_date(s: &str) -> Result<NaiveDate, DateError> {
    let s = s.trim();
    if !DISPLAY_RE.is_match(s) {
        return Err(DateError::Format(s.to_string()));
    }
    NaiveDate::parse_from_str(s, DISPLAY_FORMAT).map_err(|_| DateError::OutOfRange(s.to_string()))
}

/// `DD/MM/YYYY` -> `YYYY-MM-DD`.
pub fn display_to_storage(s: &str) -> Result<String, DateError> {
    Ok(parse_display_date(s)?.format(STORAGE_FORMAT).to_string())
}

/// `YYYY-MM-DD` -> `DD/MM/YYYY`. Values that are not in storage form are
/// returned untouched so hand-edited rows still render.
pub fn storage_to_display(s: &str) -> String {
    NaiveDate::parse_from_str(s.trim(), STORAGE_FORMAT)
        .map(|d| d.format(DISPLAY_FORMAT).to_string())
        .unwrap_or_else(|_| s.to_string())
}

pub fn format_display(date: NaiveDate) -> String {
    date.format(DISPLAY_FORMAT).to_string()
}

/// Today's calendar date in an IANA timezone like "Europe/Madrid".
pub fn today_in(tz: &str) -> Result<NaiveDate> {
    let tz: Tz = tz
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid timezone: {tz}"))?;
    Ok(Utc::now().with_timezone(&tz).date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_to_storage() {
        assert_eq!(display_to_storage("01/03/2024").unwrap(), "2024-03-01");
        assert_eq!(display_to_storage(" 29/02/2024 ").unwrap(), "2024-02-29");
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(matches!(parse_display_date("1/3/2024"), Err(DateError::Format(_))));
        assert!(matches!(parse_display_date("2024-03-01"), Err(DateError::Format(_))));
        assert!(matches!(parse_display_date("01-03-2024"), Err(DateError::Format(_))));
        assert!(matches!(parse_display_date("31/02/2024"), Err(DateError::OutOfRange(_))));
    }

    #[test]
    fn test_storage_to_display() {
        assert_eq!(storage_to_display("2024-03-01"), "01/03/2024");
        // Rows written by hand are shown as-is.
        assert_eq!(storage_to_display("yesterday"), "yesterday");
    }

    #[test]
    fn test_today_in_timezone() {
        assert!(today_in("America/Chicago").is_ok());
        assert!(today_in("Mars/Olympus").is_err());
    }
}
