//! Relationship classes: n-tuples of objects under named dimensions,
//! with a per-dimension row index and memoized filter lookups.
//!
//! `row_map[label][object]` holds the sorted row positions where the
//! `label` dimension is `object`; filters resolve by unioning per-object
//! rows and intersecting across dimensions. Both the row-index memo and
//! the projection cache are dropped wholesale on any structural
//! mutation, so reads never see a partially updated cache.

use std::fmt;
use std::sync::{Arc, RwLock};

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use entgrid_common::{EngineError, EngineErrorKind};

use crate::class::{FilterOperand, Object};
use crate::value::ParameterValue;

use super::object_class::merge_into;

/// A relationship row, aligned with its class dimensions.
pub type ObjectTuple = SmallVec<[Object; 4]>;

/// Canonical filter key: filtered labels in dimension order, each with
/// its sorted object ids (`None` encodes the `anything` wildcard).
type FilterKey = Vec<(String, Option<Vec<u64>>)>;

/// A row handed out by queries, carrying its dimension labels.
#[derive(Clone, PartialEq, Eq)]
pub struct Relationship {
    labels: Arc<[String]>,
    objects: ObjectTuple,
}

impl Relationship {
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    pub fn object(&self, label: &str) -> Option<&Object> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| &self.objects[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Object)> {
        self.labels.iter().zip(self.objects.iter())
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, (label, object)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{label}={object}")?;
        }
        write!(f, ")")
    }
}

impl fmt::Debug for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Relationship{self}")
    }
}

/// Result of a compact query over the remaining dimensions.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Nothing matched, or nothing remained to project onto; the caller
    /// supplies the default.
    Empty,
    /// One remaining dimension: its objects, deduplicated.
    Objects(Vec<Object>),
    /// Several remaining dimensions: projected rows, deduplicated.
    Tuples(Vec<Relationship>),
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn into_objects(self) -> Option<Vec<Object>> {
        match self {
            Self::Objects(objects) => Some(objects),
            _ => None,
        }
    }

    pub fn into_tuples(self) -> Option<Vec<Relationship>> {
        match self {
            Self::Tuples(tuples) => Some(tuples),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct RelationshipClass {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    state: RwLock<State>,
    memo: RwLock<FxHashMap<FilterKey, Arc<Vec<usize>>>>,
    lookup: RwLock<FxHashMap<(FilterKey, bool), Arc<Selection>>>,
    env: RwLock<FxHashSet<String>>,
}

struct State {
    labels: Arc<[String]>,
    intact_labels: Vec<String>,
    rows: Vec<ObjectTuple>,
    row_set: FxHashSet<Vec<u64>>,
    row_map: FxHashMap<String, FxHashMap<u64, Vec<usize>>>,
    parameter_values: FxHashMap<ObjectTuple, FxHashMap<String, ParameterValue>>,
    parameter_defaults: FxHashMap<String, ParameterValue>,
}

fn row_ids(row: &[Object]) -> Vec<u64> {
    row.iter().map(Object::id).collect()
}

/// Duplicated dimension names get positional suffixes (`node`, `node`
/// becomes `node1`, `node2`) so every label addresses one dimension.
fn disambiguate(labels: &[String]) -> Vec<String> {
    let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
    for label in labels {
        *counts.entry(label.as_str()).or_default() += 1;
    }
    let mut seen: FxHashMap<&str, usize> = FxHashMap::default();
    labels
        .iter()
        .map(|label| {
            if counts[label.as_str()] > 1 {
                let n = seen.entry(label.as_str()).or_default();
                *n += 1;
                format!("{label}{n}")
            } else {
                label.clone()
            }
        })
        .collect()
}

fn intersect_sorted(a: &[usize], b: &[usize]) -> Vec<usize> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

impl RelationshipClass {
    /// `labels` are the dimension names; duplicates are allowed and get
    /// disambiguated with positional suffixes.
    pub fn new<S: Into<String>>(name: S, labels: Vec<String>) -> Self {
        let disambiguated = disambiguate(&labels);
        let row_map = disambiguated
            .iter()
            .map(|l| (l.clone(), FxHashMap::default()))
            .collect();
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                state: RwLock::new(State {
                    labels: disambiguated.into(),
                    intact_labels: labels,
                    rows: Vec::new(),
                    row_set: FxHashSet::default(),
                    row_map,
                    parameter_values: FxHashMap::default(),
                    parameter_defaults: FxHashMap::default(),
                }),
                memo: RwLock::new(FxHashMap::default()),
                lookup: RwLock::new(FxHashMap::default()),
                env: RwLock::new(FxHashSet::default()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Dimension labels, after disambiguation and dimension additions.
    pub fn labels(&self) -> Vec<String> {
        self.inner.state.read().unwrap().labels.to_vec()
    }

    /// The original dimension names, extended by dimension additions.
    pub fn intact_labels(&self) -> Vec<String> {
        self.inner.state.read().unwrap().intact_labels.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.state.read().unwrap().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.read().unwrap().rows.is_empty()
    }

    /// The raw row vector.
    pub fn relationships(&self) -> Vec<Relationship> {
        let state = self.inner.state.read().unwrap();
        state
            .rows
            .iter()
            .map(|row| Relationship { labels: state.labels.clone(), objects: row.clone() })
            .collect()
    }

    /// Full rows matching the filters, in row order.
    pub fn find(&self, filters: &[(&str, FilterOperand)]) -> Vec<Relationship> {
        match self.query(filters, false) {
            Selection::Tuples(rows) => rows,
            _ => Vec::new(),
        }
    }

    /// Rows matching the filters, projected onto the dimensions the
    /// filters leave free and deduplicated by first occurrence.
    pub fn select(&self, filters: &[(&str, FilterOperand)]) -> Selection {
        self.query(filters, true)
    }

    fn query(&self, filters: &[(&str, FilterOperand)], compact: bool) -> Selection {
        let state = self.inner.state.read().unwrap();
        let Some(key) = state.canonical_key(filters) else {
            // A filter named a dimension this class does not carry.
            tracing::debug!(class = self.name(), "filter names an unknown dimension");
            return if compact { Selection::Empty } else { Selection::Tuples(Vec::new()) };
        };
        if let Some(hit) = self.inner.lookup.read().unwrap().get(&(key.clone(), compact)) {
            return (**hit).clone();
        }
        let rows = self.find_rows(&state, &key);
        let selection = self.project(&state, &key, &rows, compact);
        self.inner
            .lookup
            .write()
            .unwrap()
            .insert((key, compact), Arc::new(selection.clone()));
        selection
    }

    /// Memoized filter resolution: per dimension, union the row lists of
    /// the wanted objects, then intersect across dimensions.
    fn find_rows(&self, state: &State, key: &FilterKey) -> Arc<Vec<usize>> {
        if let Some(hit) = self.inner.memo.read().unwrap().get(key) {
            return hit.clone();
        }
        let mut running: Option<Vec<usize>> = None;
        for (label, ids) in key {
            let Some(ids) = ids else { continue };
            let mut union: Vec<usize> = Vec::new();
            if let Some(by_object) = state.row_map.get(label.as_str()) {
                for id in ids {
                    if let Some(positions) = by_object.get(id) {
                        union.extend_from_slice(positions);
                    }
                }
            }
            union.sort_unstable();
            union.dedup();
            let next = match running {
                None => union,
                Some(current) => intersect_sorted(&current, &union),
            };
            let empty = next.is_empty();
            running = Some(next);
            if empty {
                break;
            }
        }
        let rows = Arc::new(running.unwrap_or_else(|| (0..state.rows.len()).collect()));
        self.inner.memo.write().unwrap().insert(key.clone(), rows.clone());
        rows
    }

    fn project(
        &self,
        state: &State,
        key: &FilterKey,
        rows: &[usize],
        compact: bool,
    ) -> Selection {
        if !compact {
            return Selection::Tuples(
                rows.iter()
                    .map(|&r| Relationship {
                        labels: state.labels.clone(),
                        objects: state.rows[r].clone(),
                    })
                    .collect(),
            );
        }
        let filtered: FxHashSet<&str> = key.iter().map(|(l, _)| l.as_str()).collect();
        let remaining: Vec<usize> = state
            .labels
            .iter()
            .enumerate()
            .filter(|(_, l)| !filtered.contains(l.as_str()))
            .map(|(i, _)| i)
            .collect();
        if rows.is_empty() || remaining.is_empty() {
            return Selection::Empty;
        }
        if remaining.len() == 1 {
            let pos = remaining[0];
            let mut seen = FxHashSet::default();
            let mut objects = Vec::new();
            for &r in rows {
                let object = &state.rows[r][pos];
                if seen.insert(object.id()) {
                    objects.push(object.clone());
                }
            }
            return Selection::Objects(objects);
        }
        let labels: Arc<[String]> = remaining
            .iter()
            .map(|&i| state.labels[i].clone())
            .collect::<Vec<_>>()
            .into();
        let mut seen = FxHashSet::default();
        let mut tuples = Vec::new();
        for &r in rows {
            let objects: ObjectTuple =
                remaining.iter().map(|&i| state.rows[r][i].clone()).collect();
            if seen.insert(row_ids(&objects)) {
                tuples.push(Relationship { labels: labels.clone(), objects });
            }
        }
        Selection::Tuples(tuples)
    }

    /* ─────────────────────── mutators ─────────────────────── */

    /// Append rows (ordered like the dimension labels); rows the class
    /// already holds are skipped.
    pub fn add_relationships(
        &self,
        rows: impl IntoIterator<Item = Vec<Object>>,
    ) -> Result<(), EngineError> {
        {
            let mut state = self.inner.state.write().unwrap();
            let labels = state.labels.clone();
            for row in rows {
                if row.len() != labels.len() {
                    return Err(EngineError::new(EngineErrorKind::Invariant)
                        .with_class(self.name())
                        .with_message(format!(
                            "relationship has {} objects for {} dimensions",
                            row.len(),
                            labels.len()
                        )));
                }
                if !state.row_set.insert(row_ids(&row)) {
                    continue;
                }
                let position = state.rows.len();
                for (label, object) in labels.iter().zip(&row) {
                    state
                        .row_map
                        .get_mut(label.as_str())
                        .expect("every label has a row map")
                        .entry(object.id())
                        .or_default()
                        .push(position);
                }
                state.rows.push(row.into());
            }
        }
        self.invalidate("rows added");
        Ok(())
    }

    /// Attach parameter values to an object tuple. With `merge_values`,
    /// maps merge deeply per key instead of being overwritten.
    pub fn add_parameter_values(
        &self,
        objects: &[Object],
        values: Vec<(String, ParameterValue)>,
        merge_values: bool,
    ) -> Result<(), EngineError> {
        let mut state = self.inner.state.write().unwrap();
        if objects.len() != state.labels.len() {
            return Err(EngineError::new(EngineErrorKind::BadFilter)
                .with_class(self.name())
                .with_message(format!(
                    "value key has {} objects for {} dimensions",
                    objects.len(),
                    state.labels.len()
                )));
        }
        let tuple: ObjectTuple = objects.iter().cloned().collect();
        let slot = state.parameter_values.entry(tuple).or_default();
        merge_into(slot, values, merge_values);
        Ok(())
    }

    pub fn add_parameter_defaults(
        &self,
        values: Vec<(String, ParameterValue)>,
        merge_values: bool,
    ) {
        let mut state = self.inner.state.write().unwrap();
        merge_into(&mut state.parameter_defaults, values, merge_values);
    }

    /// Append a dimension holding `object` on every existing row, rekey
    /// the stored parameter values, and drop the caches.
    pub fn add_dimension<S: Into<String>>(
        &self,
        label: S,
        object: Object,
    ) -> Result<(), EngineError> {
        let label = label.into();
        {
            let mut state = self.inner.state.write().unwrap();
            if state.labels.iter().any(|l| *l == label) {
                return Err(EngineError::new(EngineErrorKind::Invariant)
                    .with_class(self.name())
                    .with_message(format!("dimension {label} already exists")));
            }
            // Rekey into a fresh map before touching anything else, so a
            // rejected migration leaves the class unchanged.
            let mut rekeyed: FxHashMap<ObjectTuple, FxHashMap<String, ParameterValue>> =
                FxHashMap::default();
            for (tuple, values) in &state.parameter_values {
                let mut tuple = tuple.clone();
                tuple.push(object.clone());
                if rekeyed.insert(tuple, values.clone()).is_some() {
                    return Err(EngineError::new(EngineErrorKind::Invariant)
                        .with_class(self.name())
                        .with_message("duplicate parameter value key after dimension addition"));
                }
            }
            state.parameter_values = rekeyed;

            let mut labels = state.labels.to_vec();
            labels.push(label.clone());
            state.labels = labels.into();
            state.intact_labels.push(label.clone());
            for row in &mut state.rows {
                row.push(object.clone());
            }
            state.row_set = state.rows.iter().map(|row| row_ids(row)).collect();
            let positions: FxHashMap<u64, Vec<usize>> =
                std::iter::once((object.id(), (0..state.rows.len()).collect())).collect();
            state.row_map.insert(label.clone(), positions);
        }
        tracing::debug!(class = self.name(), dimension = %label, "dimension added");
        self.invalidate("dimension added");
        Ok(())
    }

    fn invalidate(&self, reason: &str) {
        self.inner.memo.write().unwrap().clear();
        self.inner.lookup.write().unwrap().clear();
        tracing::debug!(class = self.name(), reason, "caches invalidated");
    }

    /* ─────────────────────── internals ─────────────────────── */

    /// Stored value, else class default, else `None`.
    pub(crate) fn value_for(
        &self,
        objects: &[Object],
        parameter: &str,
    ) -> Option<ParameterValue> {
        let state = self.inner.state.read().unwrap();
        let tuple: ObjectTuple = objects.iter().cloned().collect();
        state
            .parameter_values
            .get(&tuple)
            .and_then(|vals| vals.get(parameter))
            .or_else(|| state.parameter_defaults.get(parameter))
            .cloned()
    }

    pub(crate) fn object_tuples(&self) -> Vec<ObjectTuple> {
        self.inner.state.read().unwrap().rows.clone()
    }

    /// Stored value keys that carry `parameter`, sorted for stable
    /// enumeration.
    pub(crate) fn tuples_with_value(&self, parameter: &str) -> Vec<ObjectTuple> {
        let state = self.inner.state.read().unwrap();
        let mut tuples: Vec<ObjectTuple> = state
            .parameter_values
            .iter()
            .filter(|(_, vals)| vals.contains_key(parameter))
            .map(|(tuple, _)| tuple.clone())
            .collect();
        tuples.sort();
        tuples
    }

    pub(crate) fn parameter_names(&self) -> Vec<String> {
        let state = self.inner.state.read().unwrap();
        let mut names: FxHashSet<String> = state.parameter_defaults.keys().cloned().collect();
        for vals in state.parameter_values.values() {
            names.extend(vals.keys().cloned());
        }
        let mut names: Vec<String> = names.into_iter().collect();
        names.sort();
        names
    }

    pub(crate) fn activate_in(&self, env: &str) {
        self.inner.env.write().unwrap().insert(env.to_owned());
    }

    pub(crate) fn active_in(&self, env: &str) -> bool {
        self.inner.env.read().unwrap().contains(env)
    }
}

impl State {
    fn canonical_key(&self, filters: &[(&str, FilterOperand)]) -> Option<FilterKey> {
        for (label, _) in filters {
            if !self.labels.iter().any(|l| l.as_str() == *label) {
                return None;
            }
        }
        let mut key = Vec::with_capacity(filters.len());
        for label in self.labels.iter() {
            if let Some((_, operand)) = filters.iter().find(|(l, _)| *l == label.as_str()) {
                key.push((label.clone(), operand.ids()));
            }
        }
        Some(key)
    }
}

impl PartialEq for RelationshipClass {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for RelationshipClass {}

impl fmt::Display for RelationshipClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for RelationshipClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RelationshipClass({}, {} rows)", self.name(), self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        rc: RelationshipClass,
        nodes: FxHashMap<&'static str, Object>,
        commodities: FxHashMap<&'static str, Object>,
    }

    fn fixture() -> Fixture {
        let nodes: FxHashMap<&'static str, Object> =
            ["Sthlm", "Dublin", "Nimes", "Espoo", "Leuven"]
                .into_iter()
                .map(|n| (n, Object::new(n)))
                .collect();
        let commodities: FxHashMap<&'static str, Object> = ["wind", "water"]
            .into_iter()
            .map(|n| (n, Object::new(n)))
            .collect();
        let rc = RelationshipClass::new("node__commodity", vec!["node".into(), "commodity".into()]);
        rc.add_relationships(vec![
            vec![nodes["Dublin"].clone(), commodities["wind"].clone()],
            vec![nodes["Espoo"].clone(), commodities["wind"].clone()],
            vec![nodes["Leuven"].clone(), commodities["wind"].clone()],
            vec![nodes["Nimes"].clone(), commodities["water"].clone()],
            vec![nodes["Sthlm"].clone(), commodities["water"].clone()],
        ])
        .unwrap();
        Fixture { rc, nodes, commodities }
    }

    fn names(objects: &[Object]) -> Vec<&str> {
        objects.iter().map(|o| o.name()).collect()
    }

    #[test]
    fn test_row_map_invariant() {
        let f = fixture();
        // Every row is listed under each of its components.
        for rel in f.rc.relationships() {
            for (label, object) in rel.iter() {
                let found = f.rc.find(&[(label.as_str(), FilterOperand::from(object))]);
                assert!(found.iter().any(|r| r.objects() == rel.objects()));
            }
        }
    }

    #[test]
    fn test_filter_on_one_dimension() {
        let f = fixture();
        let sel = f.rc.select(&[("commodity", FilterOperand::from(&f.commodities["water"]))]);
        let objs = sel.into_objects();
        assert_eq!(objs.as_ref().map(|o| names(o)), Some(vec!["Nimes", "Sthlm"]));
    }

    #[test]
    fn test_filter_with_several_objects() {
        let f = fixture();
        let op = FilterOperand::from(vec![f.nodes["Dublin"].clone(), f.nodes["Espoo"].clone()]);
        let sel = f.rc.select(&[("node", op)]);
        let objs = sel.into_objects();
        assert_eq!(objs.as_ref().map(|o| names(o)), Some(vec!["wind"]));
    }

    #[test]
    fn test_anything_projects_and_dedups() {
        let f = fixture();
        let sel = f.rc.select(&[("node", FilterOperand::Anything)]);
        let objs = sel.into_objects();
        assert_eq!(objs.as_ref().map(|o| names(o)), Some(vec!["wind", "water"]));
    }

    #[test]
    fn test_no_match_is_empty_selection() {
        let f = fixture();
        let gas = Object::new("gas");
        let sel = f.rc.select(&[("commodity", FilterOperand::from(gas))]);
        assert!(sel.is_empty());
    }

    #[test]
    fn test_unknown_dimension_is_empty() {
        let f = fixture();
        let sel = f.rc.select(&[("scenario", FilterOperand::Anything)]);
        assert!(sel.is_empty());
        assert!(f.rc.find(&[("scenario", FilterOperand::Anything)]).is_empty());
    }

    #[test]
    fn test_filters_agree_with_naive_scan() {
        let f = fixture();
        let op = FilterOperand::from(&f.commodities["wind"]);
        let filtered = f.rc.find(&[("commodity", op.clone())]);
        let naive: Vec<Relationship> = f
            .rc
            .relationships()
            .into_iter()
            .filter(|r| op.contains(r.object("commodity").unwrap()))
            .collect();
        assert_eq!(filtered, naive);
    }

    #[test]
    fn test_compact_equals_dedup_of_projected_full_rows() {
        let f = fixture();
        let op = FilterOperand::from(&f.commodities["wind"]);
        let compact = f
            .rc
            .select(&[("commodity", op.clone())])
            .into_objects()
            .unwrap();
        let mut seen = FxHashSet::default();
        let manual: Vec<Object> = f
            .rc
            .find(&[("commodity", op)])
            .into_iter()
            .map(|r| r.object("node").unwrap().clone())
            .filter(|o| seen.insert(o.id()))
            .collect();
        assert_eq!(compact, manual);
    }

    #[test]
    fn test_memo_survives_repeat_and_invalidates_on_growth() {
        let f = fixture();
        let op = FilterOperand::from(&f.commodities["wind"]);
        assert_eq!(f.rc.find(&[("commodity", op.clone())]).len(), 3);
        assert_eq!(f.rc.find(&[("commodity", op.clone())]).len(), 3);
        let galway = Object::new("Galway");
        f.rc.add_relationships(vec![vec![galway, f.commodities["wind"].clone()]]).unwrap();
        assert_eq!(f.rc.find(&[("commodity", op)]).len(), 4);
    }

    #[test]
    fn test_duplicate_rows_are_skipped() {
        let f = fixture();
        f.rc.add_relationships(vec![vec![
            f.nodes["Dublin"].clone(),
            f.commodities["wind"].clone(),
        ]])
        .unwrap();
        assert_eq!(f.rc.len(), 5);
    }

    #[test]
    fn test_arity_mismatch_is_rejected() {
        let f = fixture();
        assert!(f.rc.add_relationships(vec![vec![f.nodes["Dublin"].clone()]]).is_err());
    }

    #[test]
    fn test_add_dimension_migrates_rows_and_values() {
        let f = fixture();
        f.rc.add_parameter_values(
            &[f.nodes["Sthlm"].clone(), f.commodities["water"].clone()],
            vec![("tax".into(), ParameterValue::Int(4))],
            false,
        )
        .unwrap();

        let scen_a = Object::new("scen_a");
        f.rc.add_dimension("scenario", scen_a.clone()).unwrap();
        assert_eq!(f.rc.labels(), vec!["node", "commodity", "scenario"]);

        // Every original row now carries the new object.
        let sel = f.rc.select(&[("scenario", FilterOperand::from(&scen_a))]);
        match sel {
            Selection::Tuples(tuples) => assert_eq!(tuples.len(), 5),
            other => panic!("expected tuples, got {other:?}"),
        }
        // A different object in the new dimension matches nothing.
        let scen_b = Object::new("scen_b");
        assert!(f.rc.select(&[("scenario", FilterOperand::from(scen_b))]).is_empty());

        // Stored values were rekeyed onto the widened tuple.
        let key = [
            f.nodes["Sthlm"].clone(),
            f.commodities["water"].clone(),
            scen_a,
        ];
        assert_eq!(f.rc.value_for(&key, "tax"), Some(ParameterValue::Int(4)));
    }

    #[test]
    fn test_add_dimension_rejects_duplicate_label() {
        let f = fixture();
        assert!(f.rc.add_dimension("node", Object::new("x")).is_err());
    }

    #[test]
    fn test_duplicate_dimension_names_are_suffixed() {
        let rc = RelationshipClass::new("node__node", vec!["node".into(), "node".into()]);
        assert_eq!(rc.labels(), vec!["node1", "node2"]);
        assert_eq!(rc.intact_labels(), vec!["node", "node"]);
        let a = Object::new("a");
        let b = Object::new("b");
        rc.add_relationships(vec![vec![a.clone(), b.clone()]]).unwrap();
        let sel = rc.select(&[("node1", FilterOperand::from(&a))]);
        assert_eq!(sel.into_objects().unwrap(), vec![b]);
    }
}
