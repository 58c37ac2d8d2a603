//! Object classes: ordered objects with attached parameter values.

use std::fmt;
use std::sync::{Arc, RwLock};

use rustc_hash::{FxHashMap, FxHashSet};

use entgrid_common::{EngineError, EngineErrorKind};

use crate::class::Object;
use crate::value::{ParameterValue, ValueQuery};

#[derive(Clone)]
pub struct ObjectClass {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    state: RwLock<State>,
    env: RwLock<FxHashSet<String>>,
}

#[derive(Default)]
struct State {
    objects: Vec<Object>,
    by_name: FxHashMap<String, usize>,
    parameter_values: FxHashMap<u64, FxHashMap<String, ParameterValue>>,
    parameter_defaults: FxHashMap<String, ParameterValue>,
}

impl ObjectClass {
    pub fn new<S: Into<String>>(name: S, objects: Vec<Object>) -> Self {
        let class = Self {
            inner: Arc::new(Inner {
                name: name.into(),
                state: RwLock::new(State::default()),
                env: RwLock::new(FxHashSet::default()),
            }),
        };
        class.add_objects(objects);
        class
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// All objects, in insertion order.
    pub fn objects(&self) -> Vec<Object> {
        self.inner.state.read().unwrap().objects.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.state.read().unwrap().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.read().unwrap().objects.is_empty()
    }

    /// The unique object with that name, if any.
    pub fn object(&self, name: &str) -> Option<Object> {
        let state = self.inner.state.read().unwrap();
        state.by_name.get(name).map(|&i| state.objects[i].clone())
    }

    pub fn contains(&self, object: &Object) -> bool {
        let state = self.inner.state.read().unwrap();
        state
            .by_name
            .get(object.name())
            .is_some_and(|&i| state.objects[i] == *object)
    }

    /// Objects whose effective parameter values match every filter.
    /// The effective value falls back from the stored value to the
    /// class default to nothing, evaluated with no query.
    pub fn filtered(&self, filters: &[(&str, ParameterValue)]) -> Vec<Object> {
        let state = self.inner.state.read().unwrap();
        let resolve = ValueQuery::default();
        state
            .objects
            .iter()
            .filter(|object| {
                filters.iter().all(|(parameter, wanted)| {
                    let effective = state
                        .value_for(object, parameter)
                        .unwrap_or(ParameterValue::Nothing);
                    effective.call(&resolve) == *wanted
                })
            })
            .cloned()
            .collect()
    }

    /* ─────────────────────── mutators ─────────────────────── */

    /// Append an object; an object whose name the class already holds
    /// is skipped.
    pub fn add_object(&self, object: Object) {
        self.add_objects(vec![object]);
    }

    pub fn add_objects(&self, objects: Vec<Object>) {
        let mut state = self.inner.state.write().unwrap();
        for object in objects {
            if state.by_name.contains_key(object.name()) {
                continue;
            }
            let position = state.objects.len();
            state.by_name.insert(object.name().to_owned(), position);
            state.objects.push(object);
        }
    }

    /// Attach parameter values to an object of the class. With
    /// `merge_values`, maps merge deeply per key instead of being
    /// overwritten.
    pub fn add_parameter_values(
        &self,
        object: &Object,
        values: Vec<(String, ParameterValue)>,
        merge_values: bool,
    ) -> Result<(), EngineError> {
        if !self.contains(object) {
            return Err(EngineError::new(EngineErrorKind::NotFound)
                .with_class(self.name())
                .with_message(format!("object {object} is not in the class")));
        }
        let mut state = self.inner.state.write().unwrap();
        let slot = state.parameter_values.entry(object.id()).or_default();
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

    /* ─────────────────────── internals ─────────────────────── */

    /// Stored value, else class default, else `None`.
    pub(crate) fn value_for(&self, object: &Object, parameter: &str) -> Option<ParameterValue> {
        self.inner.state.read().unwrap().value_for(object, parameter)
    }

    /// Objects with a value of their own for `parameter`.
    pub(crate) fn objects_with_value(&self, parameter: &str) -> Vec<Object> {
        let state = self.inner.state.read().unwrap();
        state
            .objects
            .iter()
            .filter(|o| {
                state
                    .parameter_values
                    .get(&o.id())
                    .is_some_and(|vals| vals.contains_key(parameter))
            })
            .cloned()
            .collect()
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
    fn value_for(&self, object: &Object, parameter: &str) -> Option<ParameterValue> {
        self.parameter_values
            .get(&object.id())
            .and_then(|vals| vals.get(parameter))
            .or_else(|| self.parameter_defaults.get(parameter))
            .cloned()
    }
}

pub(crate) fn merge_into(
    slot: &mut FxHashMap<String, ParameterValue>,
    values: Vec<(String, ParameterValue)>,
    merge_values: bool,
) {
    for (name, value) in values {
        if merge_values {
            slot.entry(name).or_insert(ParameterValue::Nothing).merge_from(value);
        } else {
            slot.insert(name, value);
        }
    }
}

impl PartialEq for ObjectClass {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for ObjectClass {}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectClass({}, {} objects)", self.name(), self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commodity() -> (ObjectClass, Object, Object) {
        let wind = Object::new("wind");
        let water = Object::new("water");
        let class = ObjectClass::new("commodity", vec![wind.clone(), water.clone()]);
        class
            .add_parameter_values(
                &wind,
                vec![("state_of_matter".into(), ParameterValue::from("gas"))],
                false,
            )
            .unwrap();
        class
            .add_parameter_values(
                &water,
                vec![("state_of_matter".into(), ParameterValue::from("liquid"))],
                false,
            )
            .unwrap();
        (class, wind, water)
    }

    #[test]
    fn test_lookup_by_name() {
        let (class, wind, _) = commodity();
        assert_eq!(class.object("wind"), Some(wind));
        assert_eq!(class.object("uranium"), None);
    }

    #[test]
    fn test_filter_by_parameter_value() {
        let (class, wind, water) = commodity();
        assert_eq!(
            class.filtered(&[("state_of_matter", ParameterValue::from("gas"))]),
            vec![wind]
        );
        assert_eq!(
            class.filtered(&[("state_of_matter", ParameterValue::from("liquid"))]),
            vec![water]
        );
        assert!(class.filtered(&[("state_of_matter", ParameterValue::from("plasma"))]).is_empty());
    }

    #[test]
    fn test_filter_uses_default_chain() {
        let (class, _, _) = commodity();
        let coal = Object::new("coal");
        class.add_object(coal.clone());
        // No stored value and no default: only a `Nothing` filter matches.
        assert!(class.filtered(&[("state_of_matter", ParameterValue::from("solid"))]).is_empty());
        class.add_parameter_defaults(
            vec![("state_of_matter".into(), ParameterValue::from("solid"))],
            false,
        );
        assert_eq!(
            class.filtered(&[("state_of_matter", ParameterValue::from("solid"))]),
            vec![coal]
        );
    }

    #[test]
    fn test_duplicate_names_are_skipped() {
        let (class, wind, _) = commodity();
        class.add_object(Object::new("wind"));
        assert_eq!(class.len(), 2);
        assert_eq!(class.object("wind"), Some(wind));
    }

    #[test]
    fn test_values_require_class_membership() {
        let (class, _, _) = commodity();
        let stranger = Object::new("stranger");
        assert!(class
            .add_parameter_values(&stranger, vec![("p".into(), ParameterValue::Int(1))], false)
            .is_err());
    }

    #[test]
    fn test_merge_values_deep_merges_maps() {
        use crate::value::{Map, MapKey};
        let (class, wind, _) = commodity();
        let base = ParameterValue::Map(
            Map::new(vec![MapKey::from("a")], vec![ParameterValue::Int(1)]).unwrap(),
        );
        let extra = ParameterValue::Map(
            Map::new(vec![MapKey::from("b")], vec![ParameterValue::Int(2)]).unwrap(),
        );
        class
            .add_parameter_values(&wind, vec![("cost".into(), base)], false)
            .unwrap();
        class
            .add_parameter_values(&wind, vec![("cost".into(), extra)], true)
            .unwrap();
        let merged = class.value_for(&wind, "cost").unwrap();
        let q = ValueQuery::default().ind("a");
        assert_eq!(merged.call(&q), ParameterValue::Int(1));
        let q = ValueQuery::default().ind("b");
        assert_eq!(merged.call(&q), ParameterValue::Int(2));
    }
}
