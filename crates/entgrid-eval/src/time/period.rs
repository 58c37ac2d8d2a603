//! Calendar fields and period collections.
//!
//! A `PeriodCollection` is a union of intersections of named integer
//! intervals over the fields `Y M D WD h m s`. It is the index type of
//! time patterns: a pattern entry applies at an instant when every
//! interval of some intersection contains the corresponding calendar
//! component, and it applies to a time slice when the slice's calendar
//! footprint crosses every interval of some intersection.
//!
//! The string grammar is the one stored in the database: `-` spans a
//! range (`M1-4`), `;` joins intervals into an intersection, `,` joins
//! intersections into the union (`"M1-4,M9-12"`, `"M1-4;WD6-7"`).

use std::fmt;
use std::sync::OnceLock;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use regex::Regex;

use entgrid_common::{EngineError, EngineErrorKind};

/// A calendar field, ordered coarse to fine.
///
/// `h`, `m` and `s` components are 1-based; the rest are what the
/// calendar produces (month 1-12, day 1-31, weekday 1-7 Monday-first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeField {
    Year,
    Month,
    Day,
    WeekDay,
    Hour,
    Minute,
    Second,
}

impl TimeField {
    pub(crate) fn parse(tag: &str) -> Result<Self, EngineError> {
        match tag {
            "Y" => Ok(Self::Year),
            "M" => Ok(Self::Month),
            "D" => Ok(Self::Day),
            "WD" => Ok(Self::WeekDay),
            "h" => Ok(Self::Hour),
            "m" => Ok(Self::Minute),
            "s" => Ok(Self::Second),
            _ => Err(EngineError::new(EngineErrorKind::Invariant)
                .with_message(format!("unknown period field tag '{tag}'"))),
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Self::Year => "Y",
            Self::Month => "M",
            Self::Day => "D",
            Self::WeekDay => "WD",
            Self::Hour => "h",
            Self::Minute => "m",
            Self::Second => "s",
        }
    }

    /// The field component of an instant.
    pub fn component(self, t: NaiveDateTime) -> i64 {
        match self {
            Self::Year => i64::from(t.year()),
            Self::Month => i64::from(t.month()),
            Self::Day => i64::from(t.day()),
            Self::WeekDay => i64::from(t.weekday().number_from_monday()),
            Self::Hour => i64::from(t.hour()) + 1,
            Self::Minute => i64::from(t.minute()) + 1,
            Self::Second => i64::from(t.second()) + 1,
        }
    }

    /// Ordinal of the enclosing cycle within which the component wraps:
    /// months cycle in the year, days in the month, weekdays in the
    /// Monday-first week, hours in the day, and so on. Years never wrap.
    fn cycle(self, t: NaiveDateTime) -> i64 {
        let day_ord = i64::from(t.date().num_days_from_ce());
        match self {
            Self::Year => 0,
            Self::Month => i64::from(t.year()),
            Self::Day => i64::from(t.year()) * 12 + i64::from(t.month()),
            // 0001-01-01 (day ordinal 1) is a Monday, so shift by one.
            Self::WeekDay => (day_ord - 1).div_euclid(7),
            Self::Hour => day_ord,
            Self::Minute => day_ord * 24 + i64::from(t.hour()),
            Self::Second => (day_ord * 24 + i64::from(t.hour())) * 60 + i64::from(t.minute()),
        }
    }

    /// First instant after `t` at which this field's component changes.
    pub fn next_boundary(self, t: NaiveDateTime) -> NaiveDateTime {
        match self {
            Self::Year => NaiveDate::from_ymd_opt(t.year() + 1, 1, 1)
                .map(|d| d.and_hms_opt(0, 0, 0).unwrap())
                .unwrap_or(t),
            Self::Month => {
                let (y, m) = if t.month() == 12 {
                    (t.year() + 1, 1)
                } else {
                    (t.year(), t.month() + 1)
                };
                NaiveDate::from_ymd_opt(y, m, 1)
                    .map(|d| d.and_hms_opt(0, 0, 0).unwrap())
                    .unwrap_or(t)
            }
            Self::Day | Self::WeekDay => t
                .date()
                .succ_opt()
                .map(|d| d.and_hms_opt(0, 0, 0).unwrap())
                .unwrap_or(t),
            Self::Hour => {
                t.date().and_hms_opt(t.hour(), 0, 0).unwrap() + Duration::hours(1)
            }
            Self::Minute => {
                t.date().and_hms_opt(t.hour(), t.minute(), 0).unwrap() + Duration::minutes(1)
            }
            Self::Second => {
                t.date().and_hms_opt(t.hour(), t.minute(), t.second()).unwrap()
                    + Duration::seconds(1)
            }
        }
    }
}

/// One named interval: `lower <= component <= upper`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodInterval {
    pub field: TimeField,
    pub lower: i64,
    pub upper: i64,
}

impl PeriodInterval {
    fn contains_instant(&self, t: NaiveDateTime) -> bool {
        let c = self.field.component(t);
        self.lower <= c && c <= self.upper
    }

    /// Whether the window `[s, e_last]` (both inclusive instants) crosses
    /// this interval. `cs`/`ce` are the field components at the window
    /// ends; when both ends sit in the same cycle the touched components
    /// are the plain range `[cs, ce]`, when the cycles are adjacent the
    /// window wraps around the field maximum, and when they are further
    /// apart the window covers a full cycle.
    fn overlaps_window(&self, s: NaiveDateTime, e_last: NaiveDateTime) -> bool {
        let cs = self.field.component(s);
        let ce = self.field.component(e_last);
        let ps = self.field.cycle(s);
        let pe = self.field.cycle(e_last);
        if ps == pe {
            cs.max(self.lower) <= ce.min(self.upper)
        } else if pe == ps + 1 {
            cs <= self.upper || self.lower <= ce
        } else {
            true
        }
    }
}

impl fmt::Display for PeriodInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lower == self.upper {
            write!(f, "{}{}", self.field.tag(), self.lower)
        } else {
            write!(f, "{}{}-{}", self.field.tag(), self.lower, self.upper)
        }
    }
}

/// A union of intersections of [`PeriodInterval`]s.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PeriodCollection {
    intersections: Vec<Vec<PeriodInterval>>,
}

impl PeriodCollection {
    pub fn new(intersections: Vec<Vec<PeriodInterval>>) -> Self {
        Self { intersections }
    }

    /// Parse the database grammar, e.g. `"M1-4,M9-12"` or `"M1-4;WD6-7"`.
    pub fn parse(spec: &str) -> Result<Self, EngineError> {
        static INTERVAL: OnceLock<Regex> = OnceLock::new();
        let interval =
            INTERVAL.get_or_init(|| Regex::new(r"^([A-Za-z]+)(\d+)(?:-(\d+))?$").unwrap());
        let mut intersections = Vec::new();
        for union_part in spec.split(',') {
            let mut intervals = Vec::new();
            for part in union_part.split(';') {
                let part = part.trim();
                let caps = interval.captures(part).ok_or_else(|| {
                    EngineError::new(EngineErrorKind::Invariant)
                        .with_message(format!("malformed period interval '{part}'"))
                })?;
                let field = TimeField::parse(&caps[1])?;
                let lower: i64 = caps[2].parse().map_err(|_| {
                    EngineError::new(EngineErrorKind::Invariant)
                        .with_message(format!("period bound out of range in '{part}'"))
                })?;
                let upper: i64 = match caps.get(3) {
                    Some(m) => m.as_str().parse().map_err(|_| {
                        EngineError::new(EngineErrorKind::Invariant)
                            .with_message(format!("period bound out of range in '{part}'"))
                    })?,
                    None => lower,
                };
                if lower > upper {
                    return Err(EngineError::new(EngineErrorKind::Invariant)
                        .with_message(format!("inverted period range '{part}'")));
                }
                intervals.push(PeriodInterval { field, lower, upper });
            }
            intersections.push(intervals);
        }
        Ok(Self { intersections })
    }

    /// Whether some intersection contains the instant on every interval.
    pub fn matches_at(&self, t: NaiveDateTime) -> bool {
        self.intersections
            .iter()
            .any(|ivs| ivs.iter().all(|iv| iv.contains_instant(t)))
    }

    /// Whether some intersection crosses the half-open window `[start, end)`
    /// on every interval.
    pub fn overlaps_window(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        let e_last = if end > start {
            end - Duration::seconds(1)
        } else {
            start
        };
        self.intersections
            .iter()
            .any(|ivs| ivs.iter().all(|iv| iv.overlaps_window(start, e_last)))
    }

    /// The finest field named anywhere in the collection.
    pub fn finest_field(&self) -> Option<TimeField> {
        self.intersections
            .iter()
            .flatten()
            .map(|iv| iv.field)
            .max()
    }
}

impl fmt::Display for PeriodCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, ivs) in self.intersections.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            for (j, iv) in ivs.iter().enumerate() {
                if j > 0 {
                    write!(f, ";")?;
                }
                write!(f, "{iv}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, mo: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_union_and_intersection() {
        let pc = PeriodCollection::parse("M1-4,M9-12").unwrap();
        assert!(pc.matches_at(dt(2000, 2, 1, 0)));
        assert!(pc.matches_at(dt(2000, 10, 1, 0)));
        assert!(!pc.matches_at(dt(2000, 6, 1, 0)));

        let pc = PeriodCollection::parse("M1-4;WD6-7").unwrap();
        // 2000-01-01 was a Saturday.
        assert!(pc.matches_at(dt(2000, 1, 1, 0)));
        assert!(!pc.matches_at(dt(2000, 1, 3, 0)));
        assert!(!pc.matches_at(dt(2000, 7, 1, 0)));
    }

    #[test]
    fn test_parse_rejects_bad_specs() {
        assert!(PeriodCollection::parse("Q1-4").is_err());
        assert!(PeriodCollection::parse("M4-1").is_err());
        assert!(PeriodCollection::parse("M").is_err());
    }

    #[test]
    fn test_one_based_clock_fields() {
        let pc = PeriodCollection::parse("h1").unwrap();
        assert!(pc.matches_at(dt(2000, 1, 1, 0)));
        assert!(!pc.matches_at(dt(2000, 1, 1, 1)));
    }

    #[test]
    fn test_window_same_cycle() {
        let pc = PeriodCollection::parse("M3-5").unwrap();
        assert!(pc.overlaps_window(dt(2000, 4, 1, 0), dt(2000, 4, 15, 0)));
        assert!(pc.overlaps_window(dt(2000, 1, 1, 0), dt(2000, 3, 2, 0)));
        assert!(!pc.overlaps_window(dt(2000, 6, 1, 0), dt(2000, 8, 1, 0)));
    }

    #[test]
    fn test_window_wraps_over_year_end() {
        let pc = PeriodCollection::parse("M1-4").unwrap();
        // November 1999 to February 2000 wraps into the matching months.
        assert!(pc.overlaps_window(dt(1999, 11, 1, 0), dt(2000, 2, 1, 0)));
        // November to December only does not.
        assert!(!pc.overlaps_window(dt(1999, 11, 1, 0), dt(1999, 12, 15, 0)));
        // More than a full year always matches.
        assert!(pc.overlaps_window(dt(1999, 6, 1, 0), dt(2000, 7, 1, 0)));
    }

    #[test]
    fn test_window_weekday_uses_week_cycle() {
        let pc = PeriodCollection::parse("WD6-7").unwrap();
        // Monday to Wednesday of one week stays clear of the weekend.
        assert!(!pc.overlaps_window(dt(2000, 1, 3, 0), dt(2000, 1, 5, 0)));
        // Friday to Monday crosses it.
        assert!(pc.overlaps_window(dt(2000, 1, 7, 0), dt(2000, 1, 10, 0)));
    }

    #[test]
    fn test_window_end_is_exclusive() {
        let pc = PeriodCollection::parse("M2").unwrap();
        // [Jan 1, Feb 1) never touches February.
        assert!(!pc.overlaps_window(dt(2000, 1, 1, 0), dt(2000, 2, 1, 0)));
        assert!(pc.overlaps_window(dt(2000, 1, 1, 0), dt(2000, 2, 1, 1)));
    }

    #[test]
    fn test_next_boundary() {
        assert_eq!(TimeField::Month.next_boundary(dt(2000, 12, 15, 5)), dt(2001, 1, 1, 0));
        assert_eq!(TimeField::Day.next_boundary(dt(2000, 1, 1, 23)), dt(2000, 1, 2, 0));
        assert_eq!(TimeField::Hour.next_boundary(dt(2000, 1, 1, 4)), dt(2000, 1, 1, 5));
        assert_eq!(TimeField::Year.next_boundary(dt(2000, 6, 1, 0)), dt(2001, 1, 1, 0));
    }

    #[test]
    fn test_finest_field() {
        let pc = PeriodCollection::parse("M1-4;h1-12").unwrap();
        assert_eq!(pc.finest_field(), Some(TimeField::Hour));
        let pc = PeriodCollection::parse("Y2000-2005").unwrap();
        assert_eq!(pc.finest_field(), Some(TimeField::Year));
    }

    #[test]
    fn test_display_round_trip() {
        for spec in ["M1-4,M9-12", "M1-4;WD6-7", "h1-12", "D5"] {
            let pc = PeriodCollection::parse(spec).unwrap();
            assert_eq!(pc.to_string(), spec);
        }
    }
}
