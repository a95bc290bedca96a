//! Namespace metrics for observability
//!
//! Counters describing what happened to records and handles in one
//! namespace. All counters use relaxed atomics; they are statistics, not
//! synchronization.

use std::sync::atomic::{AtomicU64, Ordering};

/// # Example
///
/// ```
/// use logtree::NamespaceMetrics;
///
/// let metrics = NamespaceMetrics::new();
/// metrics.record_published();
/// metrics.record_filtered();
///
/// assert_eq!(metrics.published(), 1);
/// assert_eq!(metrics.filtered(), 1);
/// ```
#[derive(Debug)]
pub struct NamespaceMetrics {
    /// Records that passed level and filter checks
    published: AtomicU64,

    /// Records below the effective level of their logger
    below_level: AtomicU64,

    /// Records rejected by a filter
    filtered: AtomicU64,

    /// Sink operations that returned an error
    sink_failures: AtomicU64,

    /// Logger handles whose reclamation notice has been processed
    handles_reclaimed: AtomicU64,

    /// Nodes evicted under weak child retention
    nodes_pruned: AtomicU64,
}

impl NamespaceMetrics {
    pub const fn new() -> Self {
        Self {
            published: AtomicU64::new(0),
            below_level: AtomicU64::new(0),
            filtered: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            handles_reclaimed: AtomicU64::new(0),
            nodes_pruned: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn below_level(&self) -> u64 {
        self.below_level.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn filtered(&self) -> u64 {
        self.filtered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn handles_reclaimed(&self) -> u64 {
        self.handles_reclaimed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn nodes_pruned(&self) -> u64 {
        self.nodes_pruned.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_published(&self) -> u64 {
        self.published.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_below_level(&self) -> u64 {
        self.below_level.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_filtered(&self) -> u64 {
        self.filtered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_sink_failure(&self) -> u64 {
        self.sink_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_handle_reclaimed(&self) -> u64 {
        self.handles_reclaimed.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_node_pruned(&self) -> u64 {
        self.nodes_pruned.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of offered records that were rejected, as a percentage
    ///
    /// Returns 0.0 if nothing has been logged.
    pub fn rejection_rate(&self) -> f64 {
        let rejected = (self.below_level() + self.filtered()) as f64;
        let total = self.published() as f64 + rejected;
        if total == 0.0 {
            0.0
        } else {
            (rejected / total) * 100.0
        }
    }

    pub fn reset(&self) {
        self.published.store(0, Ordering::Relaxed);
        self.below_level.store(0, Ordering::Relaxed);
        self.filtered.store(0, Ordering::Relaxed);
        self.sink_failures.store(0, Ordering::Relaxed);
        self.handles_reclaimed.store(0, Ordering::Relaxed);
        self.nodes_pruned.store(0, Ordering::Relaxed);
    }
}

impl Default for NamespaceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for NamespaceMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            published: AtomicU64::new(self.published()),
            below_level: AtomicU64::new(self.below_level()),
            filtered: AtomicU64::new(self.filtered()),
            sink_failures: AtomicU64::new(self.sink_failures()),
            handles_reclaimed: AtomicU64::new(self.handles_reclaimed()),
            nodes_pruned: AtomicU64::new(self.nodes_pruned()),
        }
    }
}
