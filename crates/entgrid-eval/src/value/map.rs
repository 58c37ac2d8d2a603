//! Recursive map values.
//!
//! A map pairs a sorted key vector with parameter values, which may
//! themselves be maps. Symbol keys resolve by exact match; timestamp
//! and real keys resolve nearest-or-last, clamped to the first entry.
//! A key miss falls back to the map's own no-key behaviour, which
//! resolves every leaf recursively.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDateTime;

use entgrid_common::{DbKey, EngineError, EngineErrorKind};

use crate::value::{ParameterValue, TimeQuery, ValueQuery};

/// A map key: a symbol, a timestamp, or a real. Reals order by total
/// order so keys always sort.
#[derive(Debug, Clone, PartialEq)]
pub enum MapKey {
    Symbol(String),
    Stamp(NaiveDateTime),
    Real(f64),
}

impl MapKey {
    fn rank(&self) -> u8 {
        match self {
            Self::Symbol(_) => 0,
            Self::Stamp(_) => 1,
            Self::Real(_) => 2,
        }
    }
}

impl Eq for MapKey {}

impl PartialOrd for MapKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MapKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Symbol(a), Self::Symbol(b)) => a.cmp(b),
            (Self::Stamp(a), Self::Stamp(b)) => a.cmp(b),
            (Self::Real(a), Self::Real(b)) => a.total_cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symbol(s) => write!(f, "{s}"),
            Self::Stamp(t) => write!(f, "{t}"),
            Self::Real(x) => write!(f, "{x}"),
        }
    }
}

impl From<DbKey> for MapKey {
    fn from(k: DbKey) -> Self {
        match k {
            DbKey::Symbol(s) => Self::Symbol(s),
            DbKey::Stamp(t) => Self::Stamp(t),
            DbKey::Real(x) => Self::Real(x),
        }
    }
}

impl From<&str> for MapKey {
    fn from(s: &str) -> Self {
        Self::Symbol(s.to_owned())
    }
}

impl From<NaiveDateTime> for MapKey {
    fn from(t: NaiveDateTime) -> Self {
        Self::Stamp(t)
    }
}

impl From<f64> for MapKey {
    fn from(x: f64) -> Self {
        Self::Real(x)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    indexes: Vec<MapKey>,
    values: Vec<ParameterValue>,
}

impl Map {
    /// Pairs are sorted by key on construction.
    pub fn new(indexes: Vec<MapKey>, values: Vec<ParameterValue>) -> Result<Self, EngineError> {
        if indexes.len() != values.len() {
            return Err(EngineError::new(EngineErrorKind::Invariant).with_message(format!(
                "map has {} indexes but {} values",
                indexes.len(),
                values.len()
            )));
        }
        let mut pairs: Vec<(MapKey, ParameterValue)> =
            indexes.into_iter().zip(values).collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        let (indexes, values) = pairs.into_iter().unzip();
        Ok(Self { indexes, values })
    }

    pub fn indexes(&self) -> &[MapKey] {
        &self.indexes
    }

    pub fn values(&self) -> &[ParameterValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MapKey, &ParameterValue)> {
        self.indexes.iter().zip(self.values.iter())
    }

    /// Position for a lookup key: exact for symbols, nearest-or-last
    /// (clamped to the first entry) for timestamps and reals.
    fn position(&self, key: &MapKey) -> Option<usize> {
        if self.indexes.is_empty() {
            return None;
        }
        match key {
            MapKey::Symbol(_) => self.indexes.binary_search(key).ok(),
            MapKey::Stamp(_) | MapKey::Real(_) => {
                let p = self.indexes.partition_point(|k| k <= key);
                Some(p.saturating_sub(1))
            }
        }
    }

    pub(crate) fn call(&self, q: &ValueQuery) -> ParameterValue {
        if let Some((head, rest)) = q.inds.split_first() {
            return match self.position(head) {
                Some(p) => {
                    let mut sub = q.clone();
                    sub.inds = rest.to_vec();
                    self.values[p].call(&sub)
                }
                None => {
                    // Key miss: the map's own no-key behaviour.
                    let mut sub = q.clone();
                    sub.inds = Vec::new();
                    self.call(&sub)
                }
            };
        }
        // A timestamp-keyed map consumes `t` to pick its branch and
        // still forwards it to the leaf.
        if let Some(tq) = &q.t {
            if matches!(self.indexes.first(), Some(MapKey::Stamp(_))) {
                let point = match tq {
                    TimeQuery::At(t) => *t,
                    TimeQuery::Window(slice) => slice.start(),
                };
                let p = self.indexes.partition_point(|k| match k {
                    MapKey::Stamp(s) => *s <= point,
                    _ => false,
                });
                if p > 0 {
                    return self.values[p - 1].call(q);
                }
            }
        }
        if q.t.is_some() || q.i.is_some() {
            // Forward the query to every value.
            return ParameterValue::Map(Self {
                indexes: self.indexes.clone(),
                values: self.values.iter().map(|v| v.call(q)).collect(),
            });
        }
        // No query: resolve every leaf recursively.
        let resolve = ValueQuery::default();
        ParameterValue::Map(Self {
            indexes: self.indexes.clone(),
            values: self.values.iter().map(|v| v.call(&resolve)).collect(),
        })
    }

    /// Deep merge: entries of `other` override or recursively merge
    /// into entries with an equal key; new keys are inserted in order.
    pub fn merge_from(&mut self, other: Map) {
        for (key, value) in other.indexes.into_iter().zip(other.values) {
            match self.indexes.binary_search(&key) {
                Ok(p) => self.values[p].merge_from(value),
                Err(p) => {
                    self.indexes.insert(p, key);
                    self.values.insert(p, value);
                }
            }
        }
    }
}

impl fmt::Display for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "map(")?;
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}: {v}")?;
        }
        write!(f, ")")
    }
}
