//! Time pattern evaluation.

use chrono::Duration;

use crate::time::{PeriodCollection, TimeField, TimeSlice, Update};
use crate::value::{ParameterValue, TimeQuery, ValueQuery};

/// Period collections paired with values. The `precision` (the finest
/// calendar field named anywhere in the pattern) caps how long a
/// resolved answer can stay valid.
#[derive(Debug, Clone, PartialEq)]
pub struct TimePattern {
    entries: Vec<(PeriodCollection, f64)>,
    precision: TimeField,
}

impl TimePattern {
    pub fn new(entries: Vec<(PeriodCollection, f64)>) -> Self {
        let precision = entries
            .iter()
            .filter_map(|(pc, _)| pc.finest_field())
            .max()
            .unwrap_or(TimeField::Year);
        Self { entries, precision }
    }

    pub fn entries(&self) -> &[(PeriodCollection, f64)] {
        &self.entries
    }

    pub fn precision(&self) -> TimeField {
        self.precision
    }

    pub(crate) fn call(&self, q: &ValueQuery) -> ParameterValue {
        match &q.t {
            None => ParameterValue::TimePattern(self.clone()),
            Some(TimeQuery::At(t)) => {
                self.mean_over(|pc| pc.matches_at(*t))
            }
            Some(TimeQuery::Window(slice)) => {
                self.register(slice, q.update.as_ref());
                self.mean_over(|pc| slice.overlaps_period(pc))
            }
        }
    }

    /// NaN-skipping mean of the entries selected by `applies`.
    fn mean_over(&self, applies: impl Fn(&PeriodCollection) -> bool) -> ParameterValue {
        let (sum, n) = self
            .entries
            .iter()
            .filter(|(pc, v)| !v.is_nan() && applies(pc))
            .fold((0.0, 0usize), |(sum, n), (_, v)| (sum + v, n + 1));
        if n == 0 {
            ParameterValue::Nothing
        } else {
            ParameterValue::Float(sum / n as f64)
        }
    }

    /// The answer can only change when an endpoint crosses a boundary at
    /// the pattern's precision.
    fn register(&self, slice: &TimeSlice, update: Option<&Update>) {
        let Some(update) = update else { return };
        let timeout = [slice.start(), slice.end()]
            .into_iter()
            .map(|x| self.precision.next_boundary(x) - x)
            .min()
            .unwrap_or_else(Duration::zero);
        slice.add_update(timeout.max(Duration::zero()), update.clone());
    }
}
