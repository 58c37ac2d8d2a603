//! Named entities.
//!
//! An `Object` is a cheap cloneable handle: equality and hashing go by
//! the stable id, ordering by name (then id, so listings are stable
//! even with shadowed names). Group membership links are set when the
//! persistence adapter or a mutator builds the group; they form a DAG
//! by construction and no cycle check is made on insert.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, RwLock};

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone)]
pub struct Object {
    inner: Arc<ObjectInner>,
}

struct ObjectInner {
    name: String,
    id: u64,
    members: RwLock<Vec<Object>>,
    groups: RwLock<Vec<Object>>,
}

impl Object {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            inner: Arc::new(ObjectInner {
                name: name.into(),
                id: NEXT_OBJECT_ID.fetch_add(1, AtomicOrdering::Relaxed),
                members: RwLock::new(Vec::new()),
                groups: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Build a group: a named object whose members are the given objects.
    /// Each member gets a back-link to the group.
    pub fn group<S: Into<String>>(name: S, members: &[Object]) -> Self {
        let group = Self::new(name);
        group.inner.members.write().unwrap().extend_from_slice(members);
        for member in members {
            member.inner.groups.write().unwrap().push(group.clone());
        }
        group
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Members of a group; a plain object is its own single member.
    pub fn members(&self) -> Vec<Object> {
        let members = self.inner.members.read().unwrap();
        if members.is_empty() {
            vec![self.clone()]
        } else {
            members.clone()
        }
    }

    /// Groups this object belongs to.
    pub fn groups(&self) -> Vec<Object> {
        self.inner.groups.read().unwrap().clone()
    }

    pub fn is_group(&self) -> bool {
        !self.inner.members.read().unwrap().is_empty()
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Object {}

impl Hash for Object {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl PartialOrd for Object {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Object {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner
            .name
            .cmp(&other.inner.name)
            .then_with(|| self.inner.id.cmp(&other.inner.id))
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({} #{})", self.name(), self.id())
    }
}
