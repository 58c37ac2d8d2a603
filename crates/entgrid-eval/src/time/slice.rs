//! Rollable time slices and their observers.
//!
//! A `TimeSlice` is a half-open window `[start, end)` over the
//! timeline. The window is the only mutable part and only `roll` moves
//! it; duration, id and blocks are frozen at construction. Evaluations
//! that resolve at a slice register observer callbacks under a horizon
//! (how long the answer stays valid); `roll` fires the callbacks whose
//! horizon has elapsed. Rolling backwards invalidates every cached
//! answer, so it fires everything.
//!
//! Callbacks are invoked synchronously by `roll` and must not recurse
//! into `roll` on the same slice.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{Duration, NaiveDateTime};

use entgrid_common::{EngineError, EngineErrorKind};

use crate::class::Object;
use crate::time::PeriodCollection;

/// An observer callback, fired when a slice rolls past its horizon.
pub type Update = Arc<dyn Fn() + Send + Sync>;

static NEXT_SLICE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone)]
pub struct TimeSlice {
    inner: Arc<SliceInner>,
}

struct SliceInner {
    window: RwLock<Window>,
    duration: Duration,
    blocks: Vec<Object>,
    id: u64,
    observers: Mutex<BTreeMap<Duration, Vec<Update>>>,
}

#[derive(Clone, Copy)]
struct Window {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl TimeSlice {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, EngineError> {
        Self::with_blocks(start, end, Vec::new())
    }

    pub fn with_blocks(
        start: NaiveDateTime,
        end: NaiveDateTime,
        blocks: Vec<Object>,
    ) -> Result<Self, EngineError> {
        if start > end {
            return Err(EngineError::new(EngineErrorKind::Invariant)
                .with_message(format!("time slice starts after it ends: {start} > {end}")));
        }
        Ok(Self {
            inner: Arc::new(SliceInner {
                window: RwLock::new(Window { start, end }),
                duration: end - start,
                blocks,
                id: NEXT_SLICE_ID.fetch_add(1, AtomicOrdering::Relaxed),
                observers: Mutex::new(BTreeMap::new()),
            }),
        })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.inner.window.read().unwrap().start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.inner.window.read().unwrap().end
    }

    /// Frozen at construction; `roll` shifts both ends together.
    pub fn duration(&self) -> Duration {
        self.inner.duration
    }

    pub fn duration_minutes(&self) -> f64 {
        self.inner.duration.num_seconds() as f64 / 60.0
    }

    pub fn blocks(&self) -> &[Object] {
        &self.inner.blocks
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /* ─────────────────────── predicates ─────────────────────── */

    pub fn overlaps(&self, other: &TimeSlice) -> bool {
        let a = *self.inner.window.read().unwrap();
        let b = *other.inner.window.read().unwrap();
        (a.start <= b.start && b.start < a.end) || (b.start <= a.start && a.start < b.end)
    }

    pub fn contains(&self, other: &TimeSlice) -> bool {
        let a = *self.inner.window.read().unwrap();
        let b = *other.inner.window.read().unwrap();
        a.start <= b.start && b.end <= a.end
    }

    pub fn is_contained_in(&self, other: &TimeSlice) -> bool {
        other.contains(self)
    }

    pub fn before(&self, other: &TimeSlice) -> bool {
        self.end() <= other.start()
    }

    /// Length of the intersection; zero when disjoint.
    pub fn overlap_duration(&self, other: &TimeSlice) -> Duration {
        let a = *self.inner.window.read().unwrap();
        let b = *other.inner.window.read().unwrap();
        let from = a.start.max(b.start);
        let until = a.end.min(b.end);
        (until - from).max(Duration::zero())
    }

    pub fn overlaps_period(&self, pc: &PeriodCollection) -> bool {
        let w = *self.inner.window.read().unwrap();
        pc.overlaps_window(w.start, w.end)
    }

    /* ─────────────────────── observers ─────────────────────── */

    /// Register a callback to fire once the slice has rolled `horizon`
    /// past its current position.
    pub fn add_update(&self, horizon: Duration, update: Update) {
        let horizon = horizon.max(Duration::zero());
        tracing::trace!(slice = %self, ?horizon, "observer registered");
        self.inner
            .observers
            .lock()
            .unwrap()
            .entry(horizon)
            .or_default()
            .push(update);
    }

    /// Shift the window by `delta`. With `update`, decrement every
    /// observer horizon by `delta` and fire-and-drop the buckets that
    /// elapsed; a backward roll fires everything.
    pub fn roll(&self, delta: Duration, update: bool) {
        {
            let mut w = self.inner.window.write().unwrap();
            w.start = w.start + delta;
            w.end = w.end + delta;
        }
        if !update {
            return;
        }
        let mut due: Vec<Update> = Vec::new();
        {
            let mut observers = self.inner.observers.lock().unwrap();
            let buckets = std::mem::take(&mut *observers);
            for (horizon, updates) in buckets {
                let remaining = horizon - delta;
                if delta < Duration::zero() || remaining <= Duration::zero() {
                    due.extend(updates);
                } else {
                    observers.entry(remaining).or_default().extend(updates);
                }
            }
        }
        if !due.is_empty() {
            tracing::debug!(slice = %self, fired = due.len(), "observers fired on roll");
        }
        // Fired outside the bucket lock: callbacks may register anew.
        for update in due {
            update();
        }
    }
}

impl PartialEq for TimeSlice {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for TimeSlice {}

impl Hash for TimeSlice {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl PartialOrd for TimeSlice {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeSlice {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.start(), self.end(), self.id()).cmp(&(other.start(), other.end(), other.id()))
    }
}

impl fmt::Display for TimeSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let w = *self.inner.window.read().unwrap();
        write!(f, "{} ~> {}", w.start, w.end)
    }
}

impl fmt::Debug for TimeSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimeSlice({} #{})", self, self.id())
    }
}

/* ─────────────────── resolution filters ─────────────────── */

fn keep_mask(slices: &[TimeSlice], drop: impl Fn(usize, usize) -> bool) -> Vec<bool> {
    (0..slices.len())
        .map(|i| !(0..slices.len()).any(|j| i != j && drop(i, j)))
        .collect()
}

/// Keep the coarsest slices: drop any slice contained in another slice
/// of the input (the first of two equal windows survives).
pub fn t_lowest_resolution(slices: &[TimeSlice]) -> Vec<TimeSlice> {
    let mask = keep_mask(slices, |i, j| {
        slices[j].contains(&slices[i]) && !(slices[i].contains(&slices[j]) && i < j)
    });
    slices
        .iter()
        .zip(&mask)
        .filter(|(_, keep)| **keep)
        .map(|(s, _)| s.clone())
        .collect()
}

/// Keep the finest slices: drop any slice that contains another slice
/// of the input (the first of two equal windows survives).
pub fn t_highest_resolution(slices: &[TimeSlice]) -> Vec<TimeSlice> {
    let mask = keep_mask(slices, |i, j| {
        slices[i].contains(&slices[j]) && !(slices[j].contains(&slices[i]) && i < j)
    });
    slices
        .iter()
        .zip(&mask)
        .filter(|(_, keep)| **keep)
        .map(|(s, _)| s.clone())
        .collect()
}

/// In-place [`t_lowest_resolution`].
pub fn t_lowest_resolution_in_place(slices: &mut Vec<TimeSlice>) {
    let mask = keep_mask(slices, |i, j| {
        slices[j].contains(&slices[i]) && !(slices[i].contains(&slices[j]) && i < j)
    });
    let mut it = mask.into_iter();
    slices.retain(|_| it.next().unwrap());
}

/// In-place [`t_highest_resolution`].
pub fn t_highest_resolution_in_place(slices: &mut Vec<TimeSlice>) {
    let mask = keep_mask(slices, |i, j| {
        slices[i].contains(&slices[j]) && !(slices[j].contains(&slices[i]) && i < j)
    });
    let mut it = mask.into_iter();
    slices.retain(|_| it.next().unwrap());
}
