//! Copy-on-write sink array
//!
//! A published array is never mutated. Every mutator reads the current
//! snapshot, builds a new vector and installs it with a compare-and-swap,
//! retrying on contention. Readers therefore see either the array before a
//! mutation or the array after it, never something in between.

use super::sink::Sink;
use arc_swap::ArcSwap;
use std::fmt;
use std::sync::Arc;

pub type SinkRef = Arc<dyn Sink>;

/// Identity comparison on the data pointer only; vtable addresses are not
/// stable across codegen units.
#[inline]
pub fn same_sink(a: &SinkRef, b: &SinkRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

pub struct SinkArray {
    sinks: ArcSwap<Vec<SinkRef>>,
}

impl SinkArray {
    pub fn new() -> Self {
        Self {
            sinks: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// The current array. Iteration order is delivery order.
    #[inline]
    pub fn snapshot(&self) -> Arc<Vec<SinkRef>> {
        self.sinks.load_full()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sinks.load().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sinks.load().is_empty()
    }

    /// Append a sink at the end of the array
    pub fn add(&self, sink: SinkRef) {
        self.sinks.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&sink));
            next
        });
    }

    /// Remove the first sink identical to `sink`, keeping the order of the
    /// rest. Returns whether a sink was removed.
    pub fn remove(&self, sink: &SinkRef) -> bool {
        loop {
            let current = self.sinks.load_full();
            let Some(index) = current.iter().position(|s| same_sink(s, sink)) else {
                return false;
            };
            let mut next = Vec::with_capacity(current.len() - 1);
            next.extend(current[..index].iter().cloned());
            next.extend(current[index + 1..].iter().cloned());
            if self.compare_and_set(&current, next) {
                return true;
            }
        }
    }

    /// Replace the whole array, returning the previous one
    pub fn set(&self, sinks: Vec<SinkRef>) -> Arc<Vec<SinkRef>> {
        self.sinks.swap(Arc::new(sinks))
    }

    /// Install `new` only if the current array is still `expected`
    pub fn compare_and_set(&self, expected: &Arc<Vec<SinkRef>>, new: Vec<SinkRef>) -> bool {
        let previous = self.sinks.compare_and_swap(expected, Arc::new(new));
        Arc::ptr_eq(&previous, expected)
    }

    /// Remove every sink, returning the previous array
    pub fn clear(&self) -> Arc<Vec<SinkRef>> {
        self.set(Vec::new())
    }
}

impl Default for SinkArray {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SinkArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.sinks.load();
        f.debug_list()
            .entries(snapshot.iter().map(|sink| sink.name()))
            .finish()
    }
}
