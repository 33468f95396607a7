//! Text formats for calendar dates and times of day.
//!
//! Dates are stored and transmitted as `YYYY-MM-DD`, times as `HH:MM:SS`.
//! The serde modules here are used with `#[serde(with = "...")]`.

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Time};

use crate::error::{ParseError, ParseResult};

/// `YYYY-MM-DD`
pub const DATE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

/// `HH:MM:SS`
pub const TIME_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[hour]:[minute]:[second]");

/// Format a date as `YYYY-MM-DD`.
#[must_use]
pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT).unwrap_or_else(|_| date.to_string())
}

/// Format a time of day as `HH:MM:SS`, dropping sub-second precision.
#[must_use]
pub fn format_time(time: Time) -> String {
    time.format(TIME_FORMAT).unwrap_or_else(|_| time.to_string())
}

/// Parse a `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns [`ParseError::InvalidData`] on malformed input.
pub fn parse_date(s: &str) -> ParseResult<Date> {
    Date::parse(s, DATE_FORMAT).map_err(|e| ParseError::InvalidData(format!("date {s:?}: {e}")))
}

/// Parse a `HH:MM:SS` time of day.
///
/// # Errors
///
/// Returns [`ParseError::InvalidData`] on malformed input.
pub fn parse_time(s: &str) -> ParseResult<Time> {
    Time::parse(s, TIME_FORMAT).map_err(|e| ParseError::InvalidData(format!("time {s:?}: {e}")))
}

/// Serde adapter for [`Date`] as `YYYY-MM-DD`.
#[cfg(feature = "serde")]
pub mod date {
    use serde::{Deserialize, Deserializer, Serializer, de};
    use time::Date;

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_date(&s).map_err(de::Error::custom)
    }
}

/// Serde adapter for [`Time`] as `HH:MM:SS`.
#[cfg(feature = "serde")]
pub mod time_of_day {
    use serde::{Deserialize, Deserializer, Serializer, de};
    use time::Time;

    pub fn serialize<S: Serializer>(time: &Time, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_time(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Time, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_time(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, time};

    #[test]
    fn test_format_date_and_time() {
        assert_eq!(format_date(date!(2024 - 01 - 09)), "2024-01-09");
        assert_eq!(format_time(time!(07:05:03.250)), "07:05:03");
    }

    #[test]
    fn test_parse_date_and_time() {
        assert_eq!(parse_date("2024-12-31"), Ok(date!(2024 - 12 - 31)));
        assert_eq!(parse_time("23:59:59"), Ok(time!(23:59:59)));
        assert!(parse_date("2024/12/31").is_err());
        assert!(parse_time("25:00:00").is_err());
    }
}
