//! Parameter values and the uniform evaluation contract.
//!
//! Every variant is callable with an optional query (`i`, `t`, map
//! keys) and answers with another `ParameterValue`; `Nothing` is the
//! miss sentinel throughout. Containers recurse, series and patterns
//! aggregate, scalars ignore the query.

pub mod map;
pub mod pattern;
pub mod series;

use std::fmt;

use chrono::NaiveDateTime;

use entgrid_common::{DbValue, EngineError, Span};

use crate::time::{PeriodCollection, TimeSlice, Update};

pub use map::{Map, MapKey};
pub use pattern::TimePattern;
pub use series::{RepeatingTimeSeries, TimeSeries};

/* ─────────────────────── queries ─────────────────────── */

#[derive(Debug, Clone)]
pub enum TimeQuery {
    At(NaiveDateTime),
    Window(TimeSlice),
}

/// Keyword arguments of a value invocation. `i` is 1-based (array
/// positions); `inds` descend nested maps outermost key first.
#[derive(Clone, Default)]
pub struct ValueQuery {
    pub i: Option<usize>,
    pub t: Option<TimeQuery>,
    pub inds: Vec<MapKey>,
    pub update: Option<Update>,
}

impl ValueQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, t: NaiveDateTime) -> Self {
        self.t = Some(TimeQuery::At(t));
        self
    }

    pub fn window(mut self, slice: TimeSlice) -> Self {
        self.t = Some(TimeQuery::Window(slice));
        self
    }

    pub fn index(mut self, i: usize) -> Self {
        self.i = Some(i);
        self
    }

    pub fn ind(mut self, key: impl Into<MapKey>) -> Self {
        self.inds.push(key.into());
        self
    }

    pub fn with_update(mut self, update: Update) -> Self {
        self.update = Some(update);
        self
    }
}

impl fmt::Debug for ValueQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueQuery")
            .field("i", &self.i)
            .field("t", &self.t)
            .field("inds", &self.inds)
            .field("update", &self.update.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/* ─────────────────────── the value union ─────────────────────── */

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ParameterValue {
    #[default]
    Nothing,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    DateTime(NaiveDateTime),
    Span(Span),
    Array(Vec<ParameterValue>),
    TimePattern(TimePattern),
    TimeSeries(TimeSeries),
    RepeatingTimeSeries(RepeatingTimeSeries),
    Map(Map),
}

impl ParameterValue {
    /// Evaluate with the given query. The result is again a value;
    /// [`ParameterValue::Nothing`] signals a miss.
    pub fn call(&self, q: &ValueQuery) -> ParameterValue {
        match self {
            Self::Nothing => Self::Nothing,
            Self::Bool(_)
            | Self::Int(_)
            | Self::Float(_)
            | Self::Str(_)
            | Self::DateTime(_)
            | Self::Span(_) => self.clone(),
            Self::Array(values) => match q.i {
                None => self.clone(),
                Some(i) if 1 <= i && i <= values.len() => values[i - 1].clone(),
                Some(_) => Self::Nothing,
            },
            Self::TimePattern(p) => p.call(q),
            Self::TimeSeries(ts) => ts.call(q),
            Self::RepeatingTimeSeries(rts) => rts.call(q),
            Self::Map(m) => m.call(q),
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Self::Nothing)
    }

    /// Numeric view for arithmetic and comparisons.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(x) => Some(*x),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Shallow overwrite, except maps which merge deeply per key.
    pub fn merge_from(&mut self, other: ParameterValue) {
        match (self, other) {
            (Self::Map(a), Self::Map(b)) => a.merge_from(b),
            (slot, other) => *slot = other,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nothing => write!(f, "nothing"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::DateTime(t) => write!(f, "{t}"),
            Self::Span(s) => write!(f, "{s}"),
            Self::Array(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Self::TimePattern(p) => {
                write!(f, "time-pattern(")?;
                for (i, (pc, v)) in p.entries().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{pc}: {v}")?;
                }
                write!(f, ")")
            }
            Self::TimeSeries(ts) => write!(f, "time-series({} points)", ts.indexes().len()),
            Self::RepeatingTimeSeries(rts) => {
                write!(f, "time-series({} points, repeating)", rts.indexes().len())
            }
            Self::Map(m) => write!(f, "{m}"),
        }
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

/* ─────────────────────── ingestion ─────────────────────── */

/// Wrap a parsed database value into its evaluating counterpart.
/// Repeating-series aggregates and pattern precision are computed here,
/// eagerly, so lookups never re-derive them.
pub fn parameter_value(v: DbValue) -> Result<ParameterValue, EngineError> {
    Ok(match v {
        DbValue::Null => ParameterValue::Nothing,
        DbValue::Bool(b) => ParameterValue::Bool(b),
        DbValue::Int(i) => ParameterValue::Int(i),
        DbValue::Float(x) => ParameterValue::Float(x),
        DbValue::Str(s) => ParameterValue::Str(s),
        DbValue::DateTime(t) => ParameterValue::DateTime(t),
        DbValue::Span(s) => ParameterValue::Span(s),
        DbValue::Vector(items) => ParameterValue::Array(
            items
                .into_iter()
                .map(parameter_value)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        DbValue::TimePattern(entries) => {
            let mut parsed = Vec::with_capacity(entries.len());
            for (spec, value) in entries {
                parsed.push((PeriodCollection::parse(&spec)?, value));
            }
            ParameterValue::TimePattern(TimePattern::new(parsed))
        }
        DbValue::TimeSeries { indexes, values, ignore_year, repeat } => {
            if repeat {
                ParameterValue::RepeatingTimeSeries(RepeatingTimeSeries::new(indexes, values)?)
            } else {
                ParameterValue::TimeSeries(TimeSeries::new(indexes, values, ignore_year)?)
            }
        }
        DbValue::Map { indexes, values } => {
            let keys = indexes.into_iter().map(MapKey::from).collect();
            let vals = values
                .into_iter()
                .map(parameter_value)
                .collect::<Result<Vec<_>, _>>()?;
            ParameterValue::Map(Map::new(keys, vals)?)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, mo: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn test_scalars_ignore_the_query() {
        let v = ParameterValue::Float(4.0);
        assert_eq!(v.call(&ValueQuery::default()), v);
        assert_eq!(v.call(&ValueQuery::default().at(dt(2000, 1, 1))), v);
        assert_eq!(v.call(&ValueQuery::default().index(3)), v);
    }

    #[test]
    fn test_nothing_stays_nothing() {
        let v = ParameterValue::Nothing;
        assert_eq!(v.call(&ValueQuery::default().at(dt(2000, 1, 1))), ParameterValue::Nothing);
    }

    #[test]
    fn test_array_lookup_is_one_based() {
        let v = parameter_value(DbValue::Vector(vec![
            DbValue::Int(10),
            DbValue::Int(20),
            DbValue::Int(30),
        ]))
        .unwrap();
        assert_eq!(v.call(&ValueQuery::default().index(1)), ParameterValue::Int(10));
        assert_eq!(v.call(&ValueQuery::default().index(3)), ParameterValue::Int(30));
        assert_eq!(v.call(&ValueQuery::default().index(0)), ParameterValue::Nothing);
        assert_eq!(v.call(&ValueQuery::default().index(4)), ParameterValue::Nothing);
        // Without `i` the whole vector comes back.
        assert_eq!(
            v.call(&ValueQuery::default()),
            ParameterValue::Array(vec![
                ParameterValue::Int(10),
                ParameterValue::Int(20),
                ParameterValue::Int(30),
            ])
        );
    }

    #[test]
    fn test_ingestion_wraps_each_tag() {
        assert_eq!(parameter_value(DbValue::Null).unwrap(), ParameterValue::Nothing);
        assert_eq!(parameter_value(DbValue::Bool(true)).unwrap(), ParameterValue::Bool(true));
        assert!(matches!(
            parameter_value(DbValue::TimePattern(vec![("M1-4".into(), 1.0)])).unwrap(),
            ParameterValue::TimePattern(_)
        ));
        let series = DbValue::TimeSeries {
            indexes: vec![dt(2000, 1, 1), dt(2000, 1, 2)],
            values: vec![1.0, 2.0],
            ignore_year: false,
            repeat: true,
        };
        assert!(matches!(
            parameter_value(series).unwrap(),
            ParameterValue::RepeatingTimeSeries(_)
        ));
    }

    #[test]
    fn test_ingestion_rejects_bad_pattern_tag() {
        let v = DbValue::TimePattern(vec![("X1-4".into(), 1.0)]);
        assert!(parameter_value(v).is_err());
    }

    #[test]
    fn test_merge_replaces_non_maps() {
        let mut v = ParameterValue::Int(1);
        v.merge_from(ParameterValue::Int(2));
        assert_eq!(v, ParameterValue::Int(2));
    }
}
