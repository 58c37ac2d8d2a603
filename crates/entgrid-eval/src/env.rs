//! Environments: named scopes partitioning the registered classes and
//! parameters across logical databases.
//!
//! Registration attaches an entity to an environment; the query
//! functions return it only where it is active. A single process-wide
//! slot holds the active environment; `with_env` swaps it in with
//! save-and-restore discipline on every exit path, panics included.

use std::fmt::Write as _;
use std::sync::RwLock;

use once_cell::sync::Lazy;

use crate::class::{ObjectClass, RelationshipClass};
use crate::param::Parameter;

/// The environment everything lands in unless told otherwise.
pub const BASE_ENV: &str = "__base__";

#[derive(Default)]
struct Registry {
    object_classes: Vec<ObjectClass>,
    relationship_classes: Vec<RelationshipClass>,
    parameters: Vec<Parameter>,
}

static REGISTRY: Lazy<RwLock<Registry>> = Lazy::new(|| RwLock::new(Registry::default()));

static ACTIVE_ENV: Lazy<RwLock<String>> = Lazy::new(|| RwLock::new(BASE_ENV.to_owned()));

/// The currently active environment name.
pub fn active_env() -> String {
    ACTIVE_ENV.read().unwrap().clone()
}

/// Run `f` with `env` active, restoring the prior environment on the
/// way out even if `f` panics.
pub fn with_env<R>(env: &str, f: impl FnOnce() -> R) -> R {
    struct Restore(String);
    impl Drop for Restore {
        fn drop(&mut self) {
            *ACTIVE_ENV.write().unwrap() = std::mem::take(&mut self.0);
        }
    }

    let prior = std::mem::replace(&mut *ACTIVE_ENV.write().unwrap(), env.to_owned());
    let _restore = Restore(prior);
    f()
}

/* ─────────────────────── registration ─────────────────────── */

pub fn register_object_class(class: &ObjectClass, env: &str) {
    class.activate_in(env);
    let mut registry = REGISTRY.write().unwrap();
    if !registry.object_classes.iter().any(|c| c == class) {
        registry.object_classes.push(class.clone());
    }
}

pub fn register_relationship_class(class: &RelationshipClass, env: &str) {
    class.activate_in(env);
    let mut registry = REGISTRY.write().unwrap();
    if !registry.relationship_classes.iter().any(|c| c == class) {
        registry.relationship_classes.push(class.clone());
    }
}

pub fn register_parameter(parameter: &Parameter, env: &str) {
    parameter.activate_in(env);
    let mut registry = REGISTRY.write().unwrap();
    if !registry.parameters.iter().any(|p| p == parameter) {
        registry.parameters.push(parameter.clone());
    }
}

/* ─────────────────────── queries ─────────────────────── */

/// Object classes active in `env`, in registration order.
pub fn object_classes(env: &str) -> Vec<ObjectClass> {
    REGISTRY
        .read()
        .unwrap()
        .object_classes
        .iter()
        .filter(|c| c.active_in(env))
        .cloned()
        .collect()
}

pub fn relationship_classes(env: &str) -> Vec<RelationshipClass> {
    REGISTRY
        .read()
        .unwrap()
        .relationship_classes
        .iter()
        .filter(|c| c.active_in(env))
        .cloned()
        .collect()
}

pub fn parameters(env: &str) -> Vec<Parameter> {
    REGISTRY
        .read()
        .unwrap()
        .parameters
        .iter()
        .filter(|p| p.active_in(env))
        .cloned()
        .collect()
}

/// The named object class, iff active in `env`.
pub fn object_class(name: &str, env: &str) -> Option<ObjectClass> {
    REGISTRY
        .read()
        .unwrap()
        .object_classes
        .iter()
        .find(|c| c.name() == name && c.active_in(env))
        .cloned()
}

pub fn relationship_class(name: &str, env: &str) -> Option<RelationshipClass> {
    REGISTRY
        .read()
        .unwrap()
        .relationship_classes
        .iter()
        .find(|c| c.name() == name && c.active_in(env))
        .cloned()
}

pub fn parameter(name: &str, env: &str) -> Option<Parameter> {
    REGISTRY
        .read()
        .unwrap()
        .parameters
        .iter()
        .find(|p| p.name() == name && p.active_in(env))
        .cloned()
}

/* ─────────────────────── difference ─────────────────────── */

/// Printable summary of the class and parameter names active in `left`
/// but not in `right`.
pub fn difference(left: &str, right: &str) -> String {
    fn missing(names_left: Vec<String>, names_right: Vec<String>) -> Vec<String> {
        names_left
            .into_iter()
            .filter(|n| !names_right.contains(n))
            .collect()
    }

    let oc = missing(
        object_classes(left).iter().map(|c| c.name().to_owned()).collect(),
        object_classes(right).iter().map(|c| c.name().to_owned()).collect(),
    );
    let rc = missing(
        relationship_classes(left).iter().map(|c| c.name().to_owned()).collect(),
        relationship_classes(right).iter().map(|c| c.name().to_owned()).collect(),
    );
    let ps = missing(
        parameters(left).iter().map(|p| p.name().to_owned()).collect(),
        parameters(right).iter().map(|p| p.name().to_owned()).collect(),
    );

    let mut out = String::new();
    let _ = writeln!(out, "in {left} but not in {right}:");
    for (title, names) in [
        ("object classes", oc),
        ("relationship classes", rc),
        ("parameters", ps),
    ] {
        if names.is_empty() {
            continue;
        }
        let _ = writeln!(out, "  {title}: {}", names.join(", "));
    }
    if out.lines().count() == 1 {
        let _ = writeln!(out, "  nothing");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Object;

    #[test]
    fn test_with_env_restores_on_exit_and_panic() {
        let before = active_env();
        with_env("env_a", || {
            assert_eq!(active_env(), "env_a");
            with_env("env_b", || assert_eq!(active_env(), "env_b"));
            assert_eq!(active_env(), "env_a");
        });
        assert_eq!(active_env(), before);

        let caught = std::panic::catch_unwind(|| {
            with_env("env_panic", || panic!("boom"));
        });
        assert!(caught.is_err());
        assert_eq!(active_env(), before);
    }

    #[test]
    fn test_registration_scopes_lookups() {
        let oc = ObjectClass::new("env_test_class", vec![Object::new("o")]);
        register_object_class(&oc, "env_left");
        assert!(object_class("env_test_class", "env_left").is_some());
        assert!(object_class("env_test_class", "env_other").is_none());
        assert!(object_classes("env_left").iter().any(|c| c == &oc));

        // Registering the same class again in another environment does
        // not duplicate it.
        register_object_class(&oc, "env_other");
        let count = object_classes("env_other")
            .iter()
            .filter(|c| c.name() == "env_test_class")
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_difference_lists_left_only_names() {
        let oc = ObjectClass::new("diff_only_left", vec![]);
        register_object_class(&oc, "diff_left");
        let p = Parameter::new("diff_param", vec![oc.clone().into()]);
        register_parameter(&p, "diff_left");
        let summary = difference("diff_left", "diff_right");
        assert!(summary.contains("diff_only_left"));
        assert!(summary.contains("diff_param"));
        let reverse = difference("diff_right", "diff_left");
        assert!(reverse.contains("nothing"));
    }
}
