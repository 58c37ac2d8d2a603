//! The time model: calendar periods and rollable slices.

pub mod period;
pub mod slice;

pub use period::{PeriodCollection, PeriodInterval, TimeField};
pub use slice::{
    TimeSlice, Update, t_highest_resolution, t_highest_resolution_in_place, t_lowest_resolution,
    t_lowest_resolution_in_place,
};
