//! entgrid-eval – the query and evaluation engine core.
//!
//! A persistence adapter fills [`class::ObjectClass`] and
//! [`class::RelationshipClass`] instances with objects, rows and
//! [`value::ParameterValue`]s; queries go through class invocation
//! (filters, projection) and [`param::Parameter`] invocation (entity
//! resolution plus a value query). Evaluations at a
//! [`time::TimeSlice`] register observers that fire when the slice
//! rolls past the answer's validity horizon.

pub mod call;
pub mod class;
pub mod env;
pub mod param;
pub mod time;
pub mod value;

pub use entgrid_common::{DbKey, DbValue, EngineError, EngineErrorKind, Span};

pub use call::{Call, CallOp, realize};
pub use class::{FilterOperand, Object, ObjectClass, ObjectTuple, Relationship,
    RelationshipClass, Selection};
pub use env::{
    BASE_ENV, active_env, difference, object_class, object_classes, parameter, parameters,
    register_object_class, register_parameter, register_relationship_class, relationship_class,
    relationship_classes, with_env,
};
pub use param::{ClassHandle, EntityIndex, Parameter, ParameterCall};
pub use time::{
    PeriodCollection, PeriodInterval, TimeField, TimeSlice, Update, t_highest_resolution,
    t_highest_resolution_in_place, t_lowest_resolution, t_lowest_resolution_in_place,
};
pub use value::{
    Map, MapKey, ParameterValue, RepeatingTimeSeries, TimePattern, TimeQuery, TimeSeries,
    ValueQuery, parameter_value,
};
