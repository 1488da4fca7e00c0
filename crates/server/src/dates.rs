//! Client-supplied dates are normalized to the text forms SQLite's
//! `datetime()`/`date()` produce, so string comparison orders them.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Shared with the guardian's retention cutoffs.
pub use portal_core::infra::sqlite_probe::{DATE_FORMAT, TIMESTAMP_FORMAT};

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` or a
/// bare date (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<String> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).format(TIMESTAMP_FORMAT).to_string());
    }

    for fmt in [TIMESTAMP_FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.format(TIMESTAMP_FORMAT).to_string());
        }
    }

    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .map(|d| format!("{} 00:00:00", d.format(DATE_FORMAT)))
}

/// Calendar day of any accepted timestamp form.
pub fn parse_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return Some(d.format(DATE_FORMAT).to_string());
    }
    parse_timestamp(raw).map(|ts| ts[..10].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3339_is_converted_to_utc() {
        assert_eq!(
            parse_timestamp("2025-03-01T10:30:00+05:30").as_deref(),
            Some("2025-03-01 05:00:00")
        );
    }

    #[test]
    fn stored_forms_match_retention_cutoffs() {
        let cutoff = NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_opt(8, 15, 0)
            .unwrap();
        assert_eq!(
            parse_timestamp("2024-01-31T08:15:00").as_deref(),
            Some(cutoff.format(portal_core::infra::sqlite_probe::TIMESTAMP_FORMAT).to_string().as_str())
        );
        assert_eq!(
            parse_date("2024-01-31").as_deref(),
            Some(cutoff.format(portal_core::infra::sqlite_probe::DATE_FORMAT).to_string().as_str())
        );
    }

    #[test]
    fn bare_dates_are_accepted() {
        assert_eq!(parse_timestamp("2025-03-01").as_deref(), Some("2025-03-01 00:00:00"));
        assert_eq!(parse_date("2025-03-01T23:00:00Z").as_deref(), Some("2025-03-01"));
        assert_eq!(parse_date("01/03/2025"), None);
    }
}
