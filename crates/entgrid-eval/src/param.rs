//! Parameters and their evaluation at entities.
//!
//! A parameter may be defined on several classes. A call resolves to
//! the class of greatest dimensionality whose dimension labels are all
//! bound, fetches the stored value (falling back to the class default,
//! then to nothing), and forwards the remaining query to the value.
//! Unbound components wildcard-match against the stored value keys and
//! resolve to nothing when ambiguous.

use std::fmt;
use std::sync::{Arc, RwLock};

use chrono::NaiveDateTime;
use rustc_hash::FxHashSet;

use entgrid_common::{EngineError, EngineErrorKind};

use crate::class::{FilterOperand, Object, ObjectClass, ObjectTuple, RelationshipClass};
use crate::time::{TimeSlice, Update};
use crate::value::{MapKey, ParameterValue, ValueQuery};

/// A class a parameter is defined on.
#[derive(Clone, Debug)]
pub enum ClassHandle {
    Object(ObjectClass),
    Relationship(RelationshipClass),
}

impl ClassHandle {
    pub fn name(&self) -> String {
        match self {
            Self::Object(oc) => oc.name().to_owned(),
            Self::Relationship(rc) => rc.name().to_owned(),
        }
    }

    /// Dimension labels: the class name itself for an object class, the
    /// dimension labels for a relationship class.
    pub fn dimension_labels(&self) -> Vec<String> {
        match self {
            Self::Object(oc) => vec![oc.name().to_owned()],
            Self::Relationship(rc) => rc.labels(),
        }
    }

    fn dimensionality(&self) -> usize {
        match self {
            Self::Object(_) => 1,
            Self::Relationship(rc) => rc.labels().len(),
        }
    }
}

impl From<ObjectClass> for ClassHandle {
    fn from(oc: ObjectClass) -> Self {
        Self::Object(oc)
    }
}

impl From<RelationshipClass> for ClassHandle {
    fn from(rc: RelationshipClass) -> Self {
        Self::Relationship(rc)
    }
}

/// An entity a parameter is indexed by.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityIndex {
    Object {
        class: String,
        object: Object,
    },
    Relationship {
        class: String,
        labels: Vec<String>,
        objects: ObjectTuple,
    },
}

impl EntityIndex {
    /// `(label, object)` pairs for this entity.
    pub fn as_tuples(&self) -> Vec<(String, Object)> {
        match self {
            Self::Object { class, object } => vec![(class.clone(), object.clone())],
            Self::Relationship { labels, objects, .. } => labels
                .iter()
                .cloned()
                .zip(objects.iter().cloned())
                .collect(),
        }
    }
}

impl fmt::Display for EntityIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, (label, object)) in self.as_tuples().into_iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{label}={object}")?;
        }
        write!(f, ")")
    }
}

#[derive(Clone)]
pub struct Parameter {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    classes: RwLock<Vec<ClassHandle>>,
    env: RwLock<FxHashSet<String>>,
}

impl Parameter {
    pub fn new<S: Into<String>>(name: S, classes: Vec<ClassHandle>) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                classes: RwLock::new(classes),
                env: RwLock::new(FxHashSet::default()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Classes sorted by descending dimensionality.
    pub fn classes(&self) -> Vec<ClassHandle> {
        let mut classes = self.inner.classes.read().unwrap().clone();
        classes.sort_by_key(|c| std::cmp::Reverse(c.dimensionality()));
        classes
    }

    pub fn add_class(&self, class: ClassHandle) {
        self.inner.classes.write().unwrap().push(class);
    }

    /// Start building a call; see [`ParameterCall`].
    pub fn call(&self) -> ParameterCall<'_> {
        ParameterCall {
            parameter: self,
            bindings: Vec::new(),
            query: ValueQuery::default(),
            strict: false,
            default: ParameterValue::Nothing,
        }
    }

    /// Every entity, over every class of the parameter, whose resolved
    /// value is not nothing, optionally filtered per dimension.
    pub fn indices(&self, filters: &[(&str, FilterOperand)]) -> Vec<EntityIndex> {
        let mut out = Vec::new();
        for class in self.classes() {
            let labels = class.dimension_labels();
            if filters
                .iter()
                .any(|(l, _)| !labels.iter().any(|cl| cl.as_str() == *l))
            {
                continue;
            }
            match &class {
                ClassHandle::Object(oc) => {
                    let filter = filters.iter().find(|(l, _)| *l == oc.name());
                    for object in oc.objects() {
                        if let Some((_, op)) = filter {
                            if !op.contains(&object) {
                                continue;
                            }
                        }
                        let defined = oc
                            .value_for(&object, self.name())
                            .is_some_and(|v| !v.is_nothing());
                        if defined {
                            out.push(EntityIndex::Object {
                                class: oc.name().to_owned(),
                                object,
                            });
                        }
                    }
                }
                ClassHandle::Relationship(rc) => {
                    for tuple in entity_tuples(rc, self.name()) {
                        let keep = labels.iter().zip(tuple.iter()).all(|(label, object)| {
                            filters
                                .iter()
                                .find(|(l, _)| *l == label.as_str())
                                .is_none_or(|(_, op)| op.contains(object))
                        });
                        if !keep {
                            continue;
                        }
                        let defined = rc
                            .value_for(&tuple, self.name())
                            .is_some_and(|v| !v.is_nothing());
                        if defined {
                            out.push(EntityIndex::Relationship {
                                class: rc.name().to_owned(),
                                labels: labels.clone(),
                                objects: tuple,
                            });
                        }
                    }
                }
            }
        }
        out
    }

    /// [`Parameter::indices`] as `(label, object)` pair vectors.
    pub fn indices_as_tuples(&self, filters: &[(&str, FilterOperand)]) -> Vec<Vec<(String, Object)>> {
        self.indices(filters)
            .into_iter()
            .map(|e| e.as_tuples())
            .collect()
    }

    /// Maximum over every indexed entity, descending into containers,
    /// skipping NaN, ordering spans by their upper bounds.
    pub fn maximum_parameter_value(&self) -> ParameterValue {
        let resolve = ValueQuery::default();
        let mut best: Option<(f64, ParameterValue)> = None;
        for entity in self.indices(&[]) {
            let value = match &entity {
                EntityIndex::Object { class, object } => self
                    .classes()
                    .iter()
                    .find_map(|c| match c {
                        ClassHandle::Object(oc) if oc.name() == class => {
                            oc.value_for(object, self.name())
                        }
                        _ => None,
                    }),
                EntityIndex::Relationship { class, objects, .. } => self
                    .classes()
                    .iter()
                    .find_map(|c| match c {
                        ClassHandle::Relationship(rc) if rc.name() == class => {
                            rc.value_for(objects, self.name())
                        }
                        _ => None,
                    }),
            };
            if let Some(value) = value {
                collect_max(&value.call(&resolve), &mut best);
            }
        }
        best.map(|(_, v)| v).unwrap_or(ParameterValue::Nothing)
    }

    pub(crate) fn activate_in(&self, env: &str) {
        self.inner.env.write().unwrap().insert(env.to_owned());
    }

    pub(crate) fn active_in(&self, env: &str) -> bool {
        self.inner.env.read().unwrap().contains(env)
    }
}

/// Relationship rows plus stored value keys off the row list.
fn entity_tuples(rc: &RelationshipClass, parameter: &str) -> Vec<ObjectTuple> {
    let mut tuples = rc.object_tuples();
    let mut seen: FxHashSet<Vec<u64>> = tuples
        .iter()
        .map(|t| t.iter().map(Object::id).collect())
        .collect();
    for tuple in rc.tuples_with_value(parameter) {
        let ids: Vec<u64> = tuple.iter().map(Object::id).collect();
        if seen.insert(ids) {
            tuples.push(tuple);
        }
    }
    tuples
}

/// Comparison key: numbers by value, spans by upper-bound minutes;
/// NaN and non-numerics are skipped.
fn measure(value: &ParameterValue) -> Option<f64> {
    match value {
        ParameterValue::Int(i) => Some(*i as f64),
        ParameterValue::Float(x) if !x.is_nan() => Some(*x),
        ParameterValue::Span(s) => Some(s.upper_bound_minutes() as f64),
        _ => None,
    }
}

fn collect_max(value: &ParameterValue, best: &mut Option<(f64, ParameterValue)>) {
    match value {
        ParameterValue::Array(values) => {
            for v in values {
                collect_max(v, best);
            }
        }
        ParameterValue::Map(map) => {
            for v in map.values() {
                collect_max(v, best);
            }
        }
        ParameterValue::TimeSeries(ts) => {
            for v in ts.values() {
                collect_max(&ParameterValue::Float(*v), best);
            }
        }
        ParameterValue::RepeatingTimeSeries(rts) => {
            for v in rts.values() {
                collect_max(&ParameterValue::Float(*v), best);
            }
        }
        ParameterValue::TimePattern(p) => {
            for (_, v) in p.entries() {
                collect_max(&ParameterValue::Float(*v), best);
            }
        }
        scalar => {
            if let Some(key) = measure(scalar) {
                if best.as_ref().is_none_or(|(b, _)| key > *b) {
                    *best = Some((key, scalar.clone()));
                }
            }
        }
    }
}

impl PartialEq for Parameter {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Parameter {}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parameter({})", self.name())
    }
}

/* ─────────────────────── calls ─────────────────────── */

/// A parameter invocation under construction: dimension bindings plus
/// the value query, the strictness policy, and the fallback value.
pub struct ParameterCall<'p> {
    parameter: &'p Parameter,
    bindings: Vec<(String, Option<Object>)>,
    query: ValueQuery,
    strict: bool,
    default: ParameterValue,
}

impl<'p> ParameterCall<'p> {
    pub fn bind<S: Into<String>>(mut self, label: S, object: &Object) -> Self {
        self.bindings.push((label.into(), Some(object.clone())));
        self
    }

    /// Bind a dimension as a wildcard: the component resolves by a
    /// uniqueness match against the stored value keys.
    pub fn bind_any<S: Into<String>>(mut self, label: S) -> Self {
        self.bindings.push((label.into(), None));
        self
    }

    pub fn at(mut self, t: NaiveDateTime) -> Self {
        self.query = self.query.at(t);
        self
    }

    pub fn window(mut self, slice: TimeSlice) -> Self {
        self.query = self.query.window(slice);
        self
    }

    pub fn index(mut self, i: usize) -> Self {
        self.query = self.query.index(i);
        self
    }

    pub fn ind(mut self, key: impl Into<MapKey>) -> Self {
        self.query = self.query.ind(key);
        self
    }

    pub fn with_update(mut self, update: Update) -> Self {
        self.query = self.query.with_update(update);
        self
    }

    /// Raise `NotFound` instead of returning the default when no class
    /// resolves.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn default_value(mut self, value: ParameterValue) -> Self {
        self.default = value;
        self
    }

    pub fn eval(self) -> Result<ParameterValue, EngineError> {
        let name = self.parameter.name();
        for class in self.parameter.classes() {
            let labels = class.dimension_labels();
            let bound: Option<Vec<Option<Object>>> = labels
                .iter()
                .map(|label| {
                    self.bindings
                        .iter()
                        .find(|(l, _)| l == label)
                        .map(|(_, o)| o.clone())
                })
                .collect();
            let Some(components) = bound else { continue };
            match resolve_entity(&class, name, components) {
                Resolution::Ambiguous => return Ok(ParameterValue::Nothing),
                Resolution::NoMatch => continue,
                Resolution::Entity(value) => {
                    let value = value.unwrap_or(ParameterValue::Nothing);
                    return Ok(value.call(&self.query));
                }
            }
        }
        tracing::debug!(parameter = name, "no class matched the bindings");
        if self.strict {
            let shown: Vec<String> = self
                .bindings
                .iter()
                .map(|(l, o)| match o {
                    Some(o) => format!("{l}={o}"),
                    None => format!("{l}=?"),
                })
                .collect();
            Err(EngineError::new(EngineErrorKind::NotFound)
                .with_parameter(name)
                .with_message(format!("not defined for ({})", shown.join(", "))))
        } else {
            Ok(self.default)
        }
    }
}

enum Resolution {
    /// The class resolved; the value chain result (may be `None`).
    Entity(Option<ParameterValue>),
    /// A wildcard matched several stored keys.
    Ambiguous,
    /// A wildcard matched no stored key; try the next class.
    NoMatch,
}

fn resolve_entity(
    class: &ClassHandle,
    parameter: &str,
    components: Vec<Option<Object>>,
) -> Resolution {
    match class {
        ClassHandle::Object(oc) => match components.into_iter().next().flatten() {
            Some(object) => Resolution::Entity(oc.value_for(&object, parameter)),
            None => {
                let candidates = oc.objects_with_value(parameter);
                match candidates.len() {
                    0 => Resolution::NoMatch,
                    1 => Resolution::Entity(oc.value_for(&candidates[0], parameter)),
                    _ => Resolution::Ambiguous,
                }
            }
        },
        ClassHandle::Relationship(rc) => {
            if components.iter().all(Option::is_some) {
                let tuple: ObjectTuple = components.into_iter().flatten().collect();
                return Resolution::Entity(rc.value_for(&tuple, parameter));
            }
            // Wildcard components: match the bound ones against the
            // stored value keys and require a unique completion.
            let candidates: Vec<ObjectTuple> = rc
                .tuples_with_value(parameter)
                .into_iter()
                .filter(|tuple| {
                    components
                        .iter()
                        .zip(tuple.iter())
                        .all(|(wanted, actual)| {
                            wanted.as_ref().is_none_or(|w| w == actual)
                        })
                })
                .collect();
            match candidates.len() {
                0 => Resolution::NoMatch,
                1 => Resolution::Entity(rc.value_for(&candidates[0], parameter)),
                _ => Resolution::Ambiguous,
            }
        }
    }
}
