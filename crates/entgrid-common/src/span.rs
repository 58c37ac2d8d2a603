//! Calendar-aware duration scalar.
//!
//! A `Span` is either a fixed length of time (minutes, hours, days) or a
//! variable calendar period (months, years). Variable spans only collapse
//! to a concrete length relative to a timestamp; for ordering against
//! fixed spans they use their upper bound (a month as 31 days, a year as
//! 366 days).

use std::fmt;
use std::sync::OnceLock;

use chrono::{Duration, Months, NaiveDateTime};
use regex::Regex;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{EngineError, EngineErrorKind};

const MINUTES_PER_HOUR: i64 = 60;
const MINUTES_PER_DAY: i64 = 24 * 60;
/// Upper bound used when a month is ordered against fixed spans.
const MINUTES_PER_MONTH_UB: i64 = 31 * MINUTES_PER_DAY;
/// Upper bound used when a year is ordered against fixed spans.
const MINUTES_PER_YEAR_UB: i64 = 366 * MINUTES_PER_DAY;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Span {
    Minutes(i64),
    Hours(i64),
    Days(i64),
    Months(u32),
    Years(u32),
}

impl Span {
    /// Parse the database duration grammar: an integer followed by a unit.
    ///
    /// Single-letter units are case-sensitive (`m` minute, `M` month,
    /// `h` hour, `D`/`d` day, `Y`/`y` year); spelled-out unit names are
    /// case-insensitive.
    pub fn parse(spec: &str) -> Result<Self, EngineError> {
        static GRAMMAR: OnceLock<Regex> = OnceLock::new();
        let grammar =
            GRAMMAR.get_or_init(|| Regex::new(r"^\s*(\d+)\s*([A-Za-z]+)\s*$").unwrap());
        let caps = grammar.captures(spec).ok_or_else(|| {
            EngineError::new(EngineErrorKind::Invariant)
                .with_message(format!("malformed duration '{spec}'"))
        })?;
        let count: i64 = caps[1].parse().map_err(|_| {
            EngineError::new(EngineErrorKind::Invariant)
                .with_message(format!("duration count out of range in '{spec}'"))
        })?;
        let unit = &caps[2];
        let span = match unit {
            "m" | "min" => Self::Minutes(count),
            "h" => Self::Hours(count),
            "D" | "d" => Self::Days(count),
            "M" => Self::Months(count as u32),
            "Y" | "y" => Self::Years(count as u32),
            _ => match unit.to_ascii_lowercase().as_str() {
                "minute" | "minutes" => Self::Minutes(count),
                "hour" | "hours" => Self::Hours(count),
                "day" | "days" => Self::Days(count),
                "month" | "months" => Self::Months(count as u32),
                "year" | "years" => Self::Years(count as u32),
                _ => {
                    return Err(EngineError::new(EngineErrorKind::Invariant)
                        .with_message(format!("unknown duration unit '{unit}'")));
                }
            },
        };
        Ok(span)
    }

    /// Whether this span has a calendar-independent length.
    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::Minutes(_) | Self::Hours(_) | Self::Days(_))
    }

    /// The fixed length, if there is one.
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Self::Minutes(n) => Some(Duration::minutes(*n)),
            Self::Hours(n) => Some(Duration::hours(*n)),
            Self::Days(n) => Some(Duration::days(*n)),
            Self::Months(_) | Self::Years(_) => None,
        }
    }

    /// Upper-bound length in minutes (month as 31 days, year as 366 days).
    pub fn upper_bound_minutes(&self) -> i64 {
        match self {
            Self::Minutes(n) => *n,
            Self::Hours(n) => n * MINUTES_PER_HOUR,
            Self::Days(n) => n * MINUTES_PER_DAY,
            Self::Months(n) => i64::from(*n) * MINUTES_PER_MONTH_UB,
            Self::Years(n) => i64::from(*n) * MINUTES_PER_YEAR_UB,
        }
    }

    /// Shift a timestamp forward by this span.
    pub fn add_to(&self, t: NaiveDateTime) -> NaiveDateTime {
        match self {
            Self::Minutes(_) | Self::Hours(_) | Self::Days(_) => {
                t + self.as_duration().unwrap_or_else(Duration::zero)
            }
            Self::Months(n) => t.checked_add_months(Months::new(*n)).unwrap_or(t),
            Self::Years(n) => t.checked_add_months(Months::new(n * 12)).unwrap_or(t),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minutes(n) => write!(f, "{n}m"),
            Self::Hours(n) => write!(f, "{n}h"),
            Self::Days(n) => write!(f, "{n}D"),
            Self::Months(n) => write!(f, "{n}M"),
            Self::Years(n) => write!(f, "{n}Y"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, mo: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_short_units() {
        assert_eq!(Span::parse("30m").unwrap(), Span::Minutes(30));
        assert_eq!(Span::parse("2h").unwrap(), Span::Hours(2));
        assert_eq!(Span::parse("1D").unwrap(), Span::Days(1));
        assert_eq!(Span::parse("3M").unwrap(), Span::Months(3));
        assert_eq!(Span::parse("1Y").unwrap(), Span::Years(1));
    }

    #[test]
    fn test_parse_is_case_sensitive_for_single_letters() {
        assert_eq!(Span::parse("1m").unwrap(), Span::Minutes(1));
        assert_eq!(Span::parse("1M").unwrap(), Span::Months(1));
    }

    #[test]
    fn test_parse_long_units() {
        assert_eq!(Span::parse("4 hours").unwrap(), Span::Hours(4));
        assert_eq!(Span::parse("2 Days").unwrap(), Span::Days(2));
        assert_eq!(Span::parse("1 month").unwrap(), Span::Months(1));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Span::parse("abc").is_err());
        assert!(Span::parse("1 parsec").is_err());
        assert!(Span::parse("-1h").is_err());
    }

    #[test]
    fn test_add_to_calendar_aware() {
        assert_eq!(Span::Months(1).add_to(dt(2000, 1, 31)), dt(2000, 2, 29));
        assert_eq!(Span::Years(1).add_to(dt(2000, 6, 15)), dt(2001, 6, 15));
        assert_eq!(Span::Hours(36).add_to(dt(2000, 1, 1)), dt(2000, 1, 2) + Duration::hours(12));
    }

    #[test]
    fn test_upper_bounds() {
        assert_eq!(Span::Months(1).upper_bound_minutes(), 31 * 24 * 60);
        assert_eq!(Span::Years(1).upper_bound_minutes(), 366 * 24 * 60);
        assert!(Span::Months(1).upper_bound_minutes() > Span::Days(30).upper_bound_minutes());
    }

    #[test]
    fn test_display_round_trip() {
        for spec in ["5m", "2h", "7D", "3M", "1Y"] {
            assert_eq!(Span::parse(spec).unwrap().to_string(), spec);
        }
    }
}
