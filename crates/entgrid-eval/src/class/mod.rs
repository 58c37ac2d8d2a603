//! Object and relationship classes.

pub mod object;
pub mod object_class;
pub mod relationship;

pub use object::Object;
pub use object_class::ObjectClass;
pub use relationship::{ObjectTuple, Relationship, RelationshipClass, Selection};

/// A per-dimension filter operand: one object, several, or the
/// wildcard. `Anything` satisfies every membership test and
/// short-circuits set intersection.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOperand {
    Anything,
    One(Object),
    Many(Vec<Object>),
}

impl FilterOperand {
    pub fn contains(&self, object: &Object) -> bool {
        match self {
            Self::Anything => true,
            Self::One(o) => o == object,
            Self::Many(objects) => objects.contains(object),
        }
    }

    /// Sorted ids, or `None` for the wildcard.
    pub(crate) fn ids(&self) -> Option<Vec<u64>> {
        match self {
            Self::Anything => None,
            Self::One(o) => Some(vec![o.id()]),
            Self::Many(objects) => {
                let mut ids: Vec<u64> = objects.iter().map(Object::id).collect();
                ids.sort_unstable();
                ids.dedup();
                Some(ids)
            }
        }
    }
}

impl From<Object> for FilterOperand {
    fn from(o: Object) -> Self {
        Self::One(o)
    }
}

impl From<&Object> for FilterOperand {
    fn from(o: &Object) -> Self {
        Self::One(o.clone())
    }
}

impl From<Vec<Object>> for FilterOperand {
    fn from(objects: Vec<Object>) -> Self {
        Self::Many(objects)
    }
}

impl From<&[Object]> for FilterOperand {
    fn from(objects: &[Object]) -> Self {
        Self::Many(objects.to_vec())
    }
}
