//! Time series evaluation.
//!
//! A standard series answers point lookups with the value at the last
//! index not after the query, and window lookups with the NaN-skipping
//! mean of the indexes the window crosses. A repeating series wraps
//! both kinds of lookup around its span, answering whole-period windows
//! from precomputed aggregates instead of walking every repetition.
//!
//! `ignore_year` makes lookups year-agnostic: the query is shifted into
//! the series' own first year before searching, and the series keeps
//! answering past its last index.

use chrono::{Duration, Months, NaiveDateTime};

use entgrid_common::{EngineError, EngineErrorKind};

use crate::time::{TimeSlice, Update};
use crate::value::{ParameterValue, TimeQuery, ValueQuery};

/* ─────────────────── sorted-index searches ─────────────────── */

/// Index of the last entry `<= t`, if any.
pub(crate) fn search_sorted_last(xs: &[NaiveDateTime], t: NaiveDateTime) -> Option<usize> {
    let p = xs.partition_point(|x| *x <= t);
    if p == 0 { None } else { Some(p - 1) }
}

/// Index of the first entry `>= t` (== `xs.len()` when none).
pub(crate) fn search_sorted_first(xs: &[NaiveDateTime], t: NaiveDateTime) -> usize {
    xs.partition_point(|x| *x < t)
}

fn nan_skip_sum(values: &[f64]) -> (f64, usize) {
    values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0), |(sum, n), v| (sum + v, n + 1))
}

fn nan_skip_mean(values: &[f64]) -> ParameterValue {
    let (sum, n) = nan_skip_sum(values);
    if n == 0 {
        ParameterValue::Nothing
    } else {
        ParameterValue::Float(sum / n as f64)
    }
}

fn validate_parallel(indexes: &[NaiveDateTime], values: &[f64]) -> Result<(), EngineError> {
    if indexes.len() != values.len() {
        return Err(EngineError::new(EngineErrorKind::Invariant).with_message(format!(
            "time series has {} indexes but {} values",
            indexes.len(),
            values.len()
        )));
    }
    if indexes.windows(2).any(|w| w[0] >= w[1]) {
        return Err(EngineError::new(EngineErrorKind::Invariant)
            .with_message("time series indexes are not strictly ascending"));
    }
    Ok(())
}

fn shift_years(t: NaiveDateTime, years: i32) -> NaiveDateTime {
    if years == 0 {
        return t;
    }
    let months = Months::new(years.unsigned_abs() * 12);
    if years > 0 {
        t.checked_add_months(months).unwrap_or(t)
    } else {
        t.checked_sub_months(months).unwrap_or(t)
    }
}

fn register(slice: &TimeSlice, update: Option<&Update>, timeout: Option<Duration>) {
    if let (Some(update), Some(timeout)) = (update, timeout) {
        slice.add_update(timeout.max(Duration::zero()), update.clone());
    }
}

/* ─────────────────── standard series ─────────────────── */

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    indexes: Vec<NaiveDateTime>,
    values: Vec<f64>,
    ignore_year: bool,
}

impl TimeSeries {
    pub fn new(
        indexes: Vec<NaiveDateTime>,
        values: Vec<f64>,
        ignore_year: bool,
    ) -> Result<Self, EngineError> {
        validate_parallel(&indexes, &values)?;
        Ok(Self { indexes, values, ignore_year })
    }

    pub fn indexes(&self) -> &[NaiveDateTime] {
        &self.indexes
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn ignore_year(&self) -> bool {
        self.ignore_year
    }

    /// Years to subtract so `anchor` falls in the series' first year.
    fn year_shift(&self, anchor: NaiveDateTime) -> i32 {
        if self.ignore_year {
            chrono::Datelike::year(&anchor) - chrono::Datelike::year(&self.indexes[0])
        } else {
            0
        }
    }

    /// Time until the first index strictly after `x`.
    fn next_transition(&self, x: NaiveDateTime) -> Option<Duration> {
        let p = self.indexes.partition_point(|i| *i <= x);
        self.indexes.get(p).map(|i| *i - x)
    }

    fn window_timeout(&self, ws: NaiveDateTime, we: NaiveDateTime) -> Option<Duration> {
        [self.next_transition(ws), self.next_transition(we)]
            .into_iter()
            .flatten()
            .min()
    }

    pub fn call(&self, q: &ValueQuery) -> ParameterValue {
        match &q.t {
            None => ParameterValue::TimeSeries(self.clone()),
            Some(TimeQuery::At(t)) => self.value_at(*t),
            Some(TimeQuery::Window(slice)) => self.value_over(slice, q.update.as_ref()),
        }
    }

    fn value_at(&self, t: NaiveDateTime) -> ParameterValue {
        if self.indexes.is_empty() {
            return ParameterValue::Nothing;
        }
        let t = shift_years(t, -self.year_shift(t));
        match search_sorted_last(&self.indexes, t) {
            None => ParameterValue::Nothing,
            Some(k) => {
                if !self.ignore_year && t > *self.indexes.last().unwrap() {
                    ParameterValue::Nothing
                } else {
                    ParameterValue::Float(self.values[k])
                }
            }
        }
    }

    fn value_over(&self, slice: &TimeSlice, update: Option<&Update>) -> ParameterValue {
        if self.indexes.is_empty() {
            return ParameterValue::Nothing;
        }
        let shift = self.year_shift(slice.start());
        let ws = shift_years(slice.start(), -shift);
        let we = shift_years(slice.end(), -shift);
        register(slice, update, self.window_timeout(ws, we));

        let first = self.indexes[0];
        let last = *self.indexes.last().unwrap();
        if we <= first {
            return ParameterValue::Nothing;
        }
        if !self.ignore_year && ws > last {
            return ParameterValue::Nothing;
        }
        let a = search_sorted_last(&self.indexes, ws).unwrap_or(0);
        let b = search_sorted_first(&self.indexes, we).saturating_sub(1);
        if b < a {
            return ParameterValue::Nothing;
        }
        nan_skip_mean(&self.values[a..=b])
    }
}

/* ─────────────────── repeating series ─────────────────── */

/// A series that repeats with period `span = last index - first index`.
/// `valsum`/`len` aggregate the non-NaN values once so whole-period
/// windows reduce to arithmetic.
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatingTimeSeries {
    indexes: Vec<NaiveDateTime>,
    values: Vec<f64>,
    span: Duration,
    valsum: f64,
    len: usize,
}

impl RepeatingTimeSeries {
    pub fn new(indexes: Vec<NaiveDateTime>, values: Vec<f64>) -> Result<Self, EngineError> {
        validate_parallel(&indexes, &values)?;
        if indexes.len() < 2 {
            return Err(EngineError::new(EngineErrorKind::Invariant)
                .with_message("repeating time series needs at least two indexes"));
        }
        let span = *indexes.last().unwrap() - indexes[0];
        let (valsum, len) = nan_skip_sum(&values);
        Ok(Self { indexes, values, span, valsum, len })
    }

    pub fn indexes(&self) -> &[NaiveDateTime] {
        &self.indexes
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn span(&self) -> Duration {
        self.span
    }

    /// Whole repetitions of the span between the first index and `t`
    /// (negative when `t` lies before the first index).
    fn reps_before(&self, t: NaiveDateTime) -> i64 {
        (t - self.indexes[0])
            .num_seconds()
            .div_euclid(self.span.num_seconds())
    }

    fn unwrap_shift(&self, reps: i64) -> Duration {
        Duration::seconds(self.span.num_seconds() * reps)
    }

    fn next_transition(&self, x: NaiveDateTime) -> Option<Duration> {
        let x = x - self.unwrap_shift(self.reps_before(x));
        let p = self.indexes.partition_point(|i| *i <= x);
        self.indexes.get(p).map(|i| *i - x)
    }

    pub fn call(&self, q: &ValueQuery) -> ParameterValue {
        match &q.t {
            None => ParameterValue::RepeatingTimeSeries(self.clone()),
            Some(TimeQuery::At(t)) => self.value_at(*t),
            Some(TimeQuery::Window(slice)) => self.value_over(slice, q.update.as_ref()),
        }
    }

    fn value_at(&self, t: NaiveDateTime) -> ParameterValue {
        let t = t - self.unwrap_shift(self.reps_before(t));
        match search_sorted_last(&self.indexes, t) {
            None => ParameterValue::Nothing,
            Some(k) => ParameterValue::Float(self.values[k]),
        }
    }

    fn value_over(&self, slice: &TimeSlice, update: Option<&Update>) -> ParameterValue {
        let (ws, we) = (slice.start(), slice.end());
        register(
            slice,
            update,
            [self.next_transition(ws), self.next_transition(we)]
                .into_iter()
                .flatten()
                .min(),
        );

        let reps_start = self.reps_before(ws);
        let reps_end = self.reps_before(we);
        let reps = reps_end - reps_start;
        let ws = ws - self.unwrap_shift(reps_start);
        if reps == 0 {
            let we = we - self.unwrap_shift(reps_start);
            let a = search_sorted_last(&self.indexes, ws).unwrap_or(0);
            let b = search_sorted_first(&self.indexes, we).saturating_sub(1);
            if b < a {
                return ParameterValue::Nothing;
            }
            return nan_skip_mean(&self.values[a..=b]);
        }
        // The window spans period boundaries: tail of the first period,
        // head of the last, and whole periods in between.
        let a = search_sorted_last(&self.indexes, ws).unwrap_or(0);
        let (asum, alen) = nan_skip_sum(&self.values[a..]);
        let we = we - self.unwrap_shift(reps_end);
        let b = search_sorted_first(&self.indexes, we);
        let (bsum, blen) = if b > 0 {
            nan_skip_sum(&self.values[..b])
        } else {
            (0.0, 0)
        };
        let whole = (reps - 1) as f64;
        let count = alen + blen + (reps - 1) as usize * self.len;
        if count == 0 {
            return ParameterValue::Nothing;
        }
        let total = asum + bsum + whole * self.valsum;
        ParameterValue::Float(total / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, mo: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn dth(y: i32, mo: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    fn demand() -> TimeSeries {
        TimeSeries::new(
            vec![dt(2000, 1, 1), dt(2000, 1, 2), dt(2000, 1, 3)],
            vec![10.0, f64::NAN, 20.0],
            false,
        )
        .unwrap()
    }

    fn window(s: NaiveDateTime, e: NaiveDateTime) -> ValueQuery {
        ValueQuery::default().window(TimeSlice::new(s, e).unwrap())
    }

    #[test]
    fn test_construction_invariants() {
        assert!(TimeSeries::new(vec![dt(2000, 1, 1)], vec![1.0, 2.0], false).is_err());
        assert!(
            TimeSeries::new(vec![dt(2000, 1, 2), dt(2000, 1, 1)], vec![1.0, 2.0], false).is_err()
        );
        assert!(RepeatingTimeSeries::new(vec![dt(2000, 1, 1)], vec![1.0]).is_err());
    }

    #[test]
    fn test_point_lookup_is_last_index_not_after() {
        let ts = demand();
        assert_eq!(ts.value_at(dth(2000, 1, 1, 12)), ParameterValue::Float(10.0));
        assert_eq!(ts.value_at(dt(2000, 1, 3)), ParameterValue::Float(20.0));
        // Before the first index and after the last one: nothing.
        assert_eq!(ts.value_at(dt(1999, 12, 31)), ParameterValue::Nothing);
        assert_eq!(ts.value_at(dt(2000, 1, 4)), ParameterValue::Nothing);
    }

    #[test]
    fn test_window_mean_skips_nan() {
        let ts = demand();
        let q = window(dt(2000, 1, 1), dt(2000, 1, 4));
        assert_eq!(ts.call(&q), ParameterValue::Float(15.0));
    }

    #[test]
    fn test_window_out_of_range_is_nothing() {
        let ts = demand();
        assert_eq!(ts.call(&window(dt(1999, 12, 1), dt(1999, 12, 31))), ParameterValue::Nothing);
        assert_eq!(ts.call(&window(dt(2000, 2, 1), dt(2000, 2, 2))), ParameterValue::Nothing);
    }

    #[test]
    fn test_window_all_nan_is_nothing() {
        let ts = TimeSeries::new(
            vec![dt(2000, 1, 1), dt(2000, 1, 2)],
            vec![f64::NAN, f64::NAN],
            false,
        )
        .unwrap();
        assert_eq!(ts.call(&window(dt(2000, 1, 1), dt(2000, 1, 3))), ParameterValue::Nothing);
    }

    #[test]
    fn test_ignore_year_shifts_into_series_year() {
        let ts = TimeSeries::new(
            vec![dt(2000, 1, 1), dt(2000, 1, 2), dt(2000, 1, 3)],
            vec![10.0, 15.0, 20.0],
            true,
        )
        .unwrap();
        assert_eq!(ts.value_at(dth(2024, 1, 1, 6)), ParameterValue::Float(10.0));
        // Past the last index the series keeps answering.
        assert_eq!(ts.value_at(dt(2024, 7, 1)), ParameterValue::Float(20.0));
        // But a query landing before the first index still misses.
        let early = TimeSeries::new(
            vec![dt(2000, 6, 1), dt(2000, 7, 1)],
            vec![1.0, 2.0],
            true,
        )
        .unwrap();
        assert_eq!(early.value_at(dt(2024, 2, 1)), ParameterValue::Nothing);
    }

    #[test]
    fn test_repeating_point_lookup_wraps() {
        let rts = RepeatingTimeSeries::new(
            vec![dt(2000, 1, 1), dt(2000, 1, 2)],
            vec![1.0, 3.0],
        )
        .unwrap();
        // span is one day; any whole number of spans away gives the same answer.
        assert_eq!(rts.value_at(dth(2000, 1, 1, 6)), ParameterValue::Float(1.0));
        assert_eq!(rts.value_at(dth(2000, 1, 7, 6)), ParameterValue::Float(1.0));
        assert_eq!(rts.value_at(dth(1999, 12, 25, 6)), ParameterValue::Float(1.0));
    }

    #[test]
    fn test_repeating_window_single_period() {
        let rts = RepeatingTimeSeries::new(
            vec![dt(2000, 1, 1), dt(2000, 1, 2)],
            vec![1.0, 3.0],
        )
        .unwrap();
        let two_spans_later = window(dth(2000, 1, 3, 0), dth(2000, 1, 3, 12));
        let base = window(dth(2000, 1, 1, 0), dth(2000, 1, 1, 12));
        assert_eq!(rts.call(&two_spans_later), rts.call(&base));
    }

    #[test]
    fn test_repeating_window_whole_periods() {
        let rts = RepeatingTimeSeries::new(
            vec![dt(2000, 1, 1), dt(2000, 1, 2)],
            vec![1.0, 3.0],
        )
        .unwrap();
        // Two whole periods: tail {1,3}, empty head, one full span between.
        assert_eq!(rts.call(&window(dt(2000, 1, 1), dt(2000, 1, 3))), ParameterValue::Float(2.0));
    }

    #[test]
    fn test_window_observer_fires_at_next_index() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let ts = demand();
        let slice = TimeSlice::new(dt(2000, 1, 1), dth(2000, 1, 1, 12)).unwrap();
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        let q = ValueQuery::default()
            .window(slice.clone())
            .with_update(Arc::new(move || {
                f.fetch_add(1, Ordering::SeqCst);
            }));
        assert_eq!(ts.call(&q), ParameterValue::Float(10.0));

        // The next transition is the window end reaching Jan 2.
        slice.roll(Duration::hours(6), true);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        slice.roll(Duration::hours(6), true);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
