//! Concurrency-safe max-ranking of metric samples.
//!
//! The single ranking primitive used wherever the highest-value
//! sample among N concurrently produced samples is needed.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::RwLock;

use serde::Serialize;

/// One measured value for a function's pod.
///
/// Transient — lives only for the duration of one ranking decision.
#[derive(Debug, Clone, Serialize)]
pub struct MetricSample {
    pub function: String,
    pub pod: String,
    pub value: f64,
}

impl MetricSample {
    pub fn new(function: impl Into<String>, pod: impl Into<String>, value: f64) -> Self {
        Self {
            function: function.into(),
            pod: pod.into(),
            value,
        }
    }
}

// Samples are ordered by value alone; equal values rank in arbitrary
// heap order.
impl PartialEq for MetricSample {
    fn eq(&self, other: &Self) -> bool {
        self.value.total_cmp(&other.value) == Ordering::Equal
    }
}

impl Eq for MetricSample {}

impl PartialOrd for MetricSample {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MetricSample {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.total_cmp(&other.value)
    }
}

/// An array-backed binary max-heap of samples, safe for concurrent
/// callers. The root always holds the maximum value present.
#[derive(Default)]
pub struct MetricRankHeap {
    inner: RwLock<BinaryHeap<MetricSample>>,
}

impl MetricRankHeap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a sample. O(log n), exclusive access.
    pub fn push(&self, sample: MetricSample) {
        self.inner.write().expect("rank heap lock").push(sample);
    }

    /// Remove and return the maximum. Exclusive access.
    pub fn pop(&self) -> Option<MetricSample> {
        self.inner.write().expect("rank heap lock").pop()
    }

    /// Return the maximum without removing it. Shared access: the
    /// underlying value may change between the release of the read
    /// lock and any action taken on the result.
    pub fn top(&self) -> Option<MetricSample> {
        self.inner.read().expect("rank heap lock").peek().cloned()
    }

    /// Overwrite the root's value and restore the heap invariant as
    /// one exclusive unit. Returns false on an empty heap.
    pub fn replace_top(&self, value: f64) -> bool {
        let mut heap = self.inner.write().expect("rank heap lock");
        match heap.peek_mut() {
            Some(mut top) => {
                top.value = value;
                // PeekMut sifts the root down on drop.
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("rank heap lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
