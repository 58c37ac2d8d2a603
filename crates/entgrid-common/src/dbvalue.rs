//! Parsed database values.
//!
//! This is the ingestion boundary: the persistence adapter parses the
//! remote database into `DbValue`s, and the engine wraps each one into
//! its evaluating counterpart. Time patterns arrive here as raw spec
//! strings; time series and maps arrive as parallel index/value vectors.

use std::fmt;

use chrono::NaiveDateTime;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Span;

/// A map key as stored in the database: a symbol, a timestamp, or a real.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum DbKey {
    Symbol(String),
    Stamp(NaiveDateTime),
    Real(f64),
}

/// A parsed database value.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DbValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    DateTime(NaiveDateTime),
    Span(Span),
    Vector(Vec<DbValue>),
    /// Period spec strings (the `,`/`;` grammar) paired with values.
    TimePattern(Vec<(String, f64)>),
    TimeSeries {
        indexes: Vec<NaiveDateTime>,
        values: Vec<f64>,
        ignore_year: bool,
        repeat: bool,
    },
    Map {
        indexes: Vec<DbKey>,
        values: Vec<DbValue>,
    },
}

impl fmt::Display for DbKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symbol(s) => write!(f, "{s}"),
            Self::Stamp(t) => write!(f, "{t}"),
            Self::Real(x) => write!(f, "{x}"),
        }
    }
}

impl fmt::Display for DbValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::DateTime(t) => write!(f, "{t}"),
            Self::Span(s) => write!(f, "{s}"),
            Self::Vector(elems) => {
                write!(f, "[")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, "]")
            }
            Self::TimePattern(entries) => {
                write!(f, "time-pattern(")?;
                for (i, (spec, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{spec}: {v}")?;
                }
                write!(f, ")")
            }
            Self::TimeSeries { indexes, repeat, .. } => {
                write!(f, "time-series({} points", indexes.len())?;
                if *repeat {
                    write!(f, ", repeating")?;
                }
                write!(f, ")")
            }
            Self::Map { indexes, .. } => write!(f, "map({} entries)", indexes.len()),
        }
    }
}

impl From<bool> for DbValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for DbValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for DbValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for DbValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<NaiveDateTime> for DbValue {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl From<Span> for DbValue {
    fn from(v: Span) -> Self {
        Self::Span(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_shapes() {
        assert_eq!(DbValue::Null.to_string(), "null");
        assert_eq!(DbValue::from(4.5).to_string(), "4.5");
        let v = DbValue::Vector(vec![DbValue::Int(1), DbValue::Int(2)]);
        assert_eq!(v.to_string(), "[1, 2]");
        let p = DbValue::TimePattern(vec![("M1-4".into(), 1.0)]);
        assert_eq!(p.to_string(), "time-pattern(M1-4: 1)");
    }
}
