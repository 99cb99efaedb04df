//! Request and response payload types.

pub mod request;
pub mod response;

use chrono::{DateTime, NaiveDate, Utc};

use mailroom_core::error::AppError;
use mailroom_core::result::AppResult;

/// Parse an optional `YYYY-MM-DD` query value into the start of that day.
pub fn parse_date_from(raw: Option<&str>) -> AppResult<Option<DateTime<Utc>>> {
    parse_date(raw, 0, 0, 0)
}

/// Parse an optional `YYYY-MM-DD` query value into the end of that day.
pub fn parse_date_to(raw: Option<&str>) -> AppResult<Option<DateTime<Utc>>> {
    parse_date(raw, 23, 59, 59)
}

fn parse_date(
    raw: Option<&str>,
    hour: u32,
    min: u32,
    sec: u32,
) -> AppResult<Option<DateTime<Utc>>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("Invalid date '{trimmed}', expected YYYY-MM-DD")))?;
    let time = date
        .and_hms_opt(hour, min, sec)
        .ok_or_else(|| AppError::validation("Invalid date"))?;
    Ok(Some(time.and_utc()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_bounds_cover_the_whole_day() {
        let from = parse_date_from(Some("2026-08-01")).unwrap().unwrap();
        let to = parse_date_to(Some("2026-08-01")).unwrap().unwrap();
        assert!(from < to);
        assert_eq!(from.to_rfc3339(), "2026-08-01T00:00:00+00:00");
        assert_eq!(to.to_rfc3339(), "2026-08-01T23:59:59+00:00");
    }

    #[test]
    fn blank_dates_are_absent() {
        assert!(parse_date_from(None).unwrap().is_none());
        assert!(parse_date_from(Some("  ")).unwrap().is_none());
    }

    #[test]
    fn malformed_dates_are_rejected() {
        assert!(parse_date_from(Some("01/08/2026")).is_err());
    }
}
