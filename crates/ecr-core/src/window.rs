//! Inclusive time windows and FHIR date parsing.

use serde::{Deserialize, Serialize};
use std::fmt;
use time::format_description::well_known::Rfc3339;
use time::{Date, Month, OffsetDateTime};

/// Inclusive `[start, end]` interval a launch retrieves data for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
}

impl TimeWindow {
    pub fn new(start: OffsetDateTime, end: OffsetDateTime) -> Self {
        Self { start, end }
    }

    /// Returns `true` when `start <= end`.
    pub fn is_ordered(&self) -> bool {
        self.start <= self.end
    }

    pub fn contains(&self, instant: OffsetDateTime) -> bool {
        self.start <= instant && instant <= self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = self.start.format(&Rfc3339).map_err(|_| fmt::Error)?;
        let end = self.end.format(&Rfc3339).map_err(|_| fmt::Error)?;
        write!(f, "[{start}, {end}]")
    }
}

/// Parses a FHIR `date` or `dateTime` value.
///
/// Accepts full RFC 3339 timestamps as well as the partial forms `YYYY`,
/// `YYYY-MM` and `YYYY-MM-DD`; partial dates resolve to midnight UTC of their
/// first day.
pub fn parse_fhir_date_time(value: &str) -> Option<OffsetDateTime> {
    if let Ok(instant) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(instant);
    }

    let mut parts = value.splitn(3, '-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u8 = parts.next().map(str::parse::<u8>).transpose().ok()?.unwrap_or(1);
    let day: u8 = parts.next().map(str::parse::<u8>).transpose().ok()?.unwrap_or(1);

    let month = Month::try_from(month).ok()?;
    let date = Date::from_calendar_date(year, month, day).ok()?;
    Some(date.midnight().assume_utc())
}
