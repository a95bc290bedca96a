//! Logger tree nodes
//!
//! One [`LoggerNode`] exists per dotted path segment. Nodes are created lazily
//! and, under strong retention, live as long as their namespace.
//!
//! # Locking
//!
//! - The child map is a `DashMap`; lookups need no namespace lock. Creating
//!   a missing child takes the structural lock so that it starts from its
//!   parent's settled effective level.
//! - Level changes, cross-node filter walks and resets hold the namespace's
//!   structural lock. Level propagation visits the whole affected subtree
//!   while holding it, so a level change costs O(subtree) of exclusive time.
//!   That is acceptable for an administrative operation and guarantees no
//!   reader of a multi-node filter chain observes half a propagation.
//! - Effective levels are plain atomic loads on the logging fast path.
//! - Attachments are guarded by a lock private to the node.

use super::attachments::{AttachmentKey, Attachments};
use crate::core::error::Result;
use crate::core::filter::Filter;
use crate::core::level::Level;
use crate::core::metrics::NamespaceMetrics;
use crate::core::record::LogRecord;
use crate::core::sink;
use crate::core::sink_array::SinkArray;
use arc_swap::ArcSwapOption;
use crossbeam_channel::{unbounded, Receiver, Sender};
use dashmap::DashMap;
use parking_lot::{Mutex, ReentrantMutex};
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Notice sent when the last clone of a logger handle is dropped
pub(crate) struct Reclaim {
    pub(crate) node: Weak<LoggerNode>,
    pub(crate) handle_id: u64,
}

/// State shared by every node of one namespace
pub(crate) struct TreeState {
    /// Structural lock. Reentrant so that a named filter evaluated during a
    /// parent-filter walk may itself touch the tree on the same thread.
    pub(crate) structural: ReentrantMutex<()>,
    pub(crate) baseline: i32,
    pub(crate) strong_children: bool,
    pub(crate) metrics: NamespaceMetrics,
    pub(crate) reclaim_tx: Sender<Reclaim>,
    reclaim_rx: Receiver<Reclaim>,
    pub(crate) next_handle_id: AtomicU64,
}

impl TreeState {
    pub(crate) fn new(baseline: i32, strong_children: bool) -> Self {
        let (reclaim_tx, reclaim_rx) = unbounded();
        Self {
            structural: ReentrantMutex::new(()),
            baseline,
            strong_children,
            metrics: NamespaceMetrics::new(),
            reclaim_tx,
            reclaim_rx,
            next_handle_id: AtomicU64::new(0),
        }
    }

    /// Process pending handle reclamation notices, pruning nodes left
    /// without handles. Returns how many were handled.
    pub(crate) fn reclaim(&self) -> usize {
        let mut processed = 0;
        for notice in self.reclaim_rx.try_iter() {
            processed += 1;
            self.metrics.record_handle_reclaimed();
            let Some(node) = Weak::upgrade(&notice.node) else {
                continue;
            };
            if node.untrack_handle(notice.handle_id) && !node.has_live_handles() {
                LoggerNode::prune(node);
            }
        }
        processed
    }
}

pub struct LoggerNode {
    state: Arc<TreeState>,
    parent: Option<Arc<LoggerNode>>,
    name: String,
    full_name: String,
    children: DashMap<String, Arc<LoggerNode>>,
    sinks: SinkArray,
    filter: ArcSwapOption<Filter>,
    use_parent_filters: AtomicBool,
    use_parent_sinks: AtomicBool,
    level: ArcSwapOption<Level>,
    effective_level: AtomicI32,
    attachments: Attachments,
    live_handles: Mutex<HashSet<u64>>,
}

impl LoggerNode {
    pub(crate) fn root(state: Arc<TreeState>) -> Self {
        let baseline = state.baseline;
        Self::with_parent(state, None, String::new(), String::new(), baseline)
    }

    fn with_parent(
        state: Arc<TreeState>,
        parent: Option<Arc<LoggerNode>>,
        name: String,
        full_name: String,
        effective_level: i32,
    ) -> Self {
        Self {
            state,
            parent,
            name,
            full_name,
            children: DashMap::new(),
            sinks: SinkArray::new(),
            filter: ArcSwapOption::empty(),
            use_parent_filters: AtomicBool::new(false),
            use_parent_sinks: AtomicBool::new(true),
            level: ArcSwapOption::empty(),
            effective_level: AtomicI32::new(effective_level),
            attachments: Attachments::default(),
            live_handles: Mutex::new(HashSet::new()),
        }
    }

    fn new_child(parent: &Arc<LoggerNode>, segment: &str) -> Self {
        let full_name = match &parent.parent {
            None if segment.is_empty() => ".".to_string(),
            None => segment.to_string(),
            Some(_) => format!("{}.{}", parent.full_name, segment),
        };
        Self::with_parent(
            Arc::clone(&parent.state),
            Some(Arc::clone(parent)),
            segment.to_string(),
            full_name,
            parent.effective_level.load(Ordering::Acquire),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn parent(&self) -> Option<&Arc<LoggerNode>> {
        self.parent.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub(crate) fn state(&self) -> &Arc<TreeState> {
        &self.state
    }

    // ---------------------------------------------------------------------
    // Path lookup
    // ---------------------------------------------------------------------

    /// Find or create the node for `relative_name`, one `.`-separated segment
    /// at a time. A trailing dot is ignored; an empty name returns `self`.
    pub fn get_or_create(self: &Arc<Self>, relative_name: &str) -> Arc<LoggerNode> {
        let mut node = Arc::clone(self);
        let mut rest = relative_name;
        while !rest.is_empty() {
            let (segment, remainder) = split_first(rest);
            node = node.child_or_create(segment);
            rest = remainder;
        }
        node
    }

    /// Like [`get_or_create`](Self::get_or_create) but never creates; `None`
    /// on the first missing segment.
    pub fn get_if_exists(self: &Arc<Self>, relative_name: &str) -> Option<Arc<LoggerNode>> {
        let mut node = Arc::clone(self);
        let mut rest = relative_name;
        while !rest.is_empty() {
            let (segment, remainder) = split_first(rest);
            let child = node.children.get(segment).map(|c| Arc::clone(c.value()))?;
            node = child;
            rest = remainder;
        }
        Some(node)
    }

    fn child_or_create(self: &Arc<Self>, segment: &str) -> Arc<LoggerNode> {
        if let Some(child) = self.children.get(segment) {
            return Arc::clone(child.value());
        }

        // Level changes also hold this lock, so the parent's effective level
        // cannot move between reading it and publishing the child.
        let _guard = self.state.structural.lock();
        let child = self
            .children
            .entry(segment.to_string())
            .or_insert_with(|| Arc::new(LoggerNode::new_child(self, segment)));
        Arc::clone(child.value())
    }

    pub(crate) fn children_snapshot(&self) -> Vec<Arc<LoggerNode>> {
        self.children.iter().map(|entry| Arc::clone(entry.value())).collect()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    // ---------------------------------------------------------------------
    // Levels
    // ---------------------------------------------------------------------

    pub fn level(&self) -> Option<Level> {
        self.level.load_full().map(|level| Level::clone(&level))
    }

    #[inline]
    pub fn effective_level(&self) -> i32 {
        self.effective_level.load(Ordering::Acquire)
    }

    /// Set or clear the explicit level and push the resulting effective level
    /// down to every descendant that inherits it.
    pub fn set_level(&self, level: Option<Level>) {
        let _guard = self.state.structural.lock();
        let effective = match &level {
            Some(level) => level.severity(),
            None => self.inherited_level(),
        };
        self.level.store(level.map(Arc::new));
        let previous = self.effective_level.swap(effective, Ordering::AcqRel);
        if previous != effective {
            for child in self.children_snapshot() {
                child.propagate_level(effective);
            }
        }
    }

    fn inherited_level(&self) -> i32 {
        match &self.parent {
            Some(parent) => parent.effective_level(),
            None => self.state.baseline,
        }
    }

    /// Caller holds the structural lock.
    fn propagate_level(&self, effective: i32) {
        if self.level.load().is_some() {
            return;
        }
        let previous = self.effective_level.swap(effective, Ordering::AcqRel);
        if previous != effective {
            for child in self.children_snapshot() {
                child.propagate_level(effective);
            }
        }
    }

    /// Whether a record at `level` passes this node's effective level
    #[inline]
    pub fn is_enabled(&self, level: &Level) -> bool {
        let effective = self.effective_level();
        effective != Level::OFF.severity() && level.severity() >= effective
    }

    // ---------------------------------------------------------------------
    // Filters
    // ---------------------------------------------------------------------

    pub fn filter(&self) -> Option<Arc<Filter>> {
        self.filter.load_full()
    }

    pub fn set_filter(&self, filter: Option<Filter>) {
        self.filter.store(filter.map(Arc::new));
    }

    pub fn use_parent_filters(&self) -> bool {
        self.use_parent_filters.load(Ordering::Acquire)
    }

    pub fn set_use_parent_filters(&self, value: bool) {
        self.use_parent_filters.store(value, Ordering::Release);
    }

    /// Run the filter chain for `record`.
    ///
    /// Without parent filters only this node's filter runs, lock-free. With
    /// them, the structural lock is held while walking toward the root; the
    /// walk stops at the first rejection or at the first node that does not
    /// defer to its parent.
    pub fn is_loggable(&self, record: &mut LogRecord) -> bool {
        if !self.use_parent_filters() {
            return match self.filter.load().as_deref() {
                Some(filter) => filter.is_loggable(record),
                None => true,
            };
        }

        let _guard = self.state.structural.lock();
        let mut node = self;
        loop {
            if let Some(filter) = node.filter.load().as_deref() {
                if !filter.is_loggable(record) {
                    return false;
                }
            }
            if !node.use_parent_filters() {
                return true;
            }
            match &node.parent {
                Some(parent) => node = parent,
                None => return true,
            }
        }
    }

    // ---------------------------------------------------------------------
    // Sinks
    // ---------------------------------------------------------------------

    pub fn sinks(&self) -> &SinkArray {
        &self.sinks
    }

    pub fn use_parent_sinks(&self) -> bool {
        self.use_parent_sinks.load(Ordering::Acquire)
    }

    pub fn set_use_parent_sinks(&self, value: bool) {
        self.use_parent_sinks.store(value, Ordering::Release);
    }

    /// Deliver an accepted record to this node's sinks in array order, then
    /// to each ancestor's sinks while `use_parent_sinks` holds. Ancestor
    /// filters are not consulted.
    pub fn publish(&self, record: &LogRecord) {
        let mut node = self;
        loop {
            for target in node.sinks.snapshot().iter() {
                if !sink::deliver(target.as_ref(), record) {
                    self.state.metrics.record_sink_failure();
                }
            }
            if !node.use_parent_sinks() {
                return;
            }
            match &node.parent {
                Some(parent) => node = parent,
                None => return,
            }
        }
    }

    /// Flush every sink along the publish path
    pub fn flush(&self) {
        let mut node = self;
        loop {
            for target in node.sinks.snapshot().iter() {
                if !sink::flush(target.as_ref(), &self.full_name) {
                    self.state.metrics.record_sink_failure();
                }
            }
            if !node.use_parent_sinks() {
                return;
            }
            match &node.parent {
                Some(parent) => node = parent,
                None => return,
            }
        }
    }

    // ---------------------------------------------------------------------
    // Attachments
    // ---------------------------------------------------------------------

    pub fn attachment<T: Send + Sync + 'static>(&self, key: &AttachmentKey<T>) -> Option<Arc<T>> {
        self.attachments.get(key)
    }

    pub fn attach<T: Send + Sync + 'static>(
        &self,
        key: &AttachmentKey<T>,
        value: T,
    ) -> Result<Option<Arc<T>>> {
        self.attachments.attach(&self.full_name, key, value)
    }

    pub fn attach_if_absent<T: Send + Sync + 'static>(
        &self,
        key: &AttachmentKey<T>,
        value: T,
    ) -> Result<Option<Arc<T>>> {
        self.attachments.attach_if_absent(&self.full_name, key, value)
    }

    pub fn detach<T: Send + Sync + 'static>(&self, key: &AttachmentKey<T>) -> Option<Arc<T>> {
        self.attachments.detach(key)
    }

    // ---------------------------------------------------------------------
    // Live handles
    // ---------------------------------------------------------------------

    pub(crate) fn track_handle(&self, id: u64) {
        self.live_handles.lock().insert(id);
    }

    pub(crate) fn untrack_handle(&self, id: u64) -> bool {
        self.live_handles.lock().remove(&id)
    }

    /// Number of handle identities tracked for this node
    pub fn live_handle_count(&self) -> usize {
        self.live_handles.lock().len()
    }

    /// Whether any handle for this node is still tracked. Reclamation is
    /// asynchronous, so a just-dropped handle may still count.
    pub fn has_live_handles(&self) -> bool {
        !self.live_handles.lock().is_empty()
    }

    // ---------------------------------------------------------------------
    // Reset and pruning
    // ---------------------------------------------------------------------

    /// Reset this node and its whole subtree to defaults. Former children are
    /// reset first and then dropped from the map; this node stays usable.
    pub fn reset(&self) {
        let _guard = self.state.structural.lock();
        self.reset_locked();
        // A non-root node inherits again; its former subtree is gone
        self.effective_level
            .store(self.inherited_level(), Ordering::Release);
    }

    fn reset_locked(&self) {
        for child in self.children_snapshot() {
            child.reset_locked();
        }
        self.children.clear();
        self.filter.store(None);
        self.use_parent_filters.store(false, Ordering::Release);
        self.use_parent_sinks.store(true, Ordering::Release);
        self.level.store(None);
        self.effective_level
            .store(self.state.baseline, Ordering::Release);
        self.sinks.clear();
        self.attachments.clear();
    }

    /// Drop every child link below this node without touching configuration.
    /// Breaks the parent/child reference cycles when a namespace goes away.
    pub(crate) fn detach_subtree(&self) {
        for child in self.children_snapshot() {
            child.detach_subtree();
        }
        self.children.clear();
    }

    /// True when nothing distinguishes this node from a freshly created one
    fn is_default(&self) -> bool {
        self.level.load().is_none()
            && self.filter.load().is_none()
            && self.sinks.is_empty()
            && !self.use_parent_filters()
            && self.use_parent_sinks()
            && self.children.is_empty()
            && self.attachments.is_empty()
            && !self.has_live_handles()
    }

    /// Under weak retention, remove `node` from its parent once it is unused
    /// and carries no configuration, then retry with the parent. Returns the
    /// number of nodes removed.
    pub(crate) fn prune(node: Arc<LoggerNode>) -> usize {
        if node.state.strong_children {
            return 0;
        }
        let mut pruned = 0;
        let mut node = node;
        loop {
            let Some(parent) = node.parent.clone() else {
                return pruned;
            };
            if !node.is_default() {
                return pruned;
            }
            let segment = node.name.clone();
            drop(node);
            // Only the map may own the child: any handle, grandchild or
            // in-flight lookup keeps the strong count above one.
            let removed = parent.children.remove_if(&segment, |_, child| {
                Arc::strong_count(child) == 1 && child.is_default()
            });
            if removed.is_none() {
                return pruned;
            }
            parent.state.metrics.record_node_pruned();
            pruned += 1;
            node = parent;
        }
    }
}

fn split_first(name: &str) -> (&str, &str) {
    match name.find('.') {
        Some(i) => (&name[..i], &name[i + 1..]),
        None => (name, ""),
    }
}

impl fmt::Debug for LoggerNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerNode")
            .field("full_name", &self.full_name)
            .field("level", &self.level())
            .field("effective_level", &self.effective_level())
            .field("sinks", &self.sinks)
            .field("children", &self.children.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn tree(strong_children: bool) -> Arc<LoggerNode> {
        let state = TreeState::new(Level::INFO.severity(), strong_children);
        Arc::new(LoggerNode::root(Arc::new(state)))
    }

    #[test]
    fn test_full_names() {
        let root = tree(true);
        assert_eq!(root.full_name(), "");
        assert_eq!(root.get_or_create("a.b.c").full_name(), "a.b.c");
        assert_eq!(root.get_or_create("a.b.c").name(), "c");
        assert_eq!(root.get_or_create(".").full_name(), ".");
        assert_eq!(root.get_or_create("a..b").full_name(), "a..b");
        assert!(Arc::ptr_eq(&root.get_or_create(""), &root));
        assert!(Arc::ptr_eq(
            &root.get_or_create("a."),
            &root.get_or_create("a")
        ));
    }

    #[test]
    fn test_get_if_exists() {
        let root = tree(true);
        assert!(root.get_if_exists("x.y").is_none());
        let created = root.get_or_create("x.y");
        let found = root.get_if_exists("x.y").unwrap();
        assert!(Arc::ptr_eq(&created, &found));
        assert!(root.get_if_exists("x.y.z").is_none());
        assert!(root.get_if_exists("x").is_some());
    }

    #[test]
    fn test_relative_lookup_from_child() {
        let root = tree(true);
        let a = root.get_or_create("a");
        let c = a.get_or_create("b.c");
        assert_eq!(c.full_name(), "a.b.c");
        assert!(Arc::ptr_eq(&c, &root.get_or_create("a.b.c")));
    }

    #[test]
    fn test_level_inheritance_and_propagation() {
        let root = tree(true);
        let c = root.get_or_create("a.b.c");
        let a = root.get_if_exists("a").unwrap();
        let b = root.get_if_exists("a.b").unwrap();
        assert_eq!(c.effective_level(), Level::INFO.severity());

        a.set_level(Some(Level::WARN));
        assert_eq!(c.effective_level(), Level::WARN.severity());

        b.set_level(Some(Level::DEBUG));
        assert_eq!(c.effective_level(), Level::DEBUG.severity());
        assert_eq!(a.effective_level(), Level::WARN.severity());

        // Explicit level on b shields its subtree
        a.set_level(Some(Level::ERROR));
        assert_eq!(c.effective_level(), Level::DEBUG.severity());

        b.set_level(None);
        assert_eq!(b.effective_level(), Level::ERROR.severity());
        assert_eq!(c.effective_level(), Level::ERROR.severity());

        a.set_level(None);
        assert_eq!(c.effective_level(), Level::INFO.severity());
    }

    #[test]
    fn test_new_child_inherits_current_level() {
        let root = tree(true);
        root.get_or_create("a").set_level(Some(Level::ERROR));
        assert_eq!(
            root.get_or_create("a.fresh").effective_level(),
            Level::ERROR.severity()
        );
    }

    #[test]
    fn test_child_creation_waits_for_level_change() {
        let root = tree(true);
        let guard = root.state.structural.lock();

        let creator = {
            let root = Arc::clone(&root);
            std::thread::spawn(move || root.get_or_create("a"))
        };
        std::thread::sleep(Duration::from_millis(50));
        assert!(root.get_if_exists("a").is_none());

        // Same thread, so the reentrant lock lets the level change through
        root.set_level(Some(Level::ERROR));
        drop(guard);

        let child = creator.join().unwrap();
        assert_eq!(child.effective_level(), Level::ERROR.severity());
        assert!(Arc::ptr_eq(&child, &root.get_if_exists("a").unwrap()));
    }

    #[test]
    fn test_is_enabled_respects_off() {
        let root = tree(true);
        let node = root.get_or_create("quiet");
        assert!(node.is_enabled(&Level::INFO));
        assert!(!node.is_enabled(&Level::DEBUG));
        node.set_level(Some(Level::OFF));
        assert!(!node.is_enabled(&Level::FATAL));
        node.set_level(Some(Level::ALL));
        assert!(node.is_enabled(&Level::TRACE));
    }

    #[test]
    fn test_parent_filter_chain() {
        let root = tree(true);
        let child = root.get_or_create("svc.api");
        root.get_or_create("svc").set_filter(Some(Filter::Deny));

        let mut record = LogRecord::new(Level::INFO, "x");
        assert!(child.is_loggable(&mut record));

        child.set_use_parent_filters(true);
        assert!(!child.is_loggable(&mut record));

        // The walk stops at a node that does not defer to its parent
        child.set_filter(Some(Filter::Accept));
        root.set_filter(Some(Filter::Deny));
        root.get_or_create("svc").set_filter(None);
        assert!(child.is_loggable(&mut record));
    }

    #[test]
    fn test_reset_clears_subtree() {
        let root = tree(true);
        let a = root.get_or_create("a");
        a.get_or_create("b").set_level(Some(Level::DEBUG));
        a.set_level(Some(Level::WARN));
        a.set_filter(Some(Filter::Deny));
        a.set_use_parent_sinks(false);

        a.reset();
        assert!(a.level().is_none());
        assert!(a.filter().is_none());
        assert!(a.use_parent_sinks());
        assert_eq!(a.child_count(), 0);
        assert_eq!(a.effective_level(), Level::INFO.severity());

        let fresh = a.get_or_create("b");
        assert!(fresh.level().is_none());
        assert_eq!(fresh.effective_level(), Level::INFO.severity());
    }

    #[test]
    fn test_prune_weak_retention() {
        let root = tree(false);
        let leaf = root.get_or_create("a.b.c");
        assert_eq!(LoggerNode::prune(leaf), 3);
        assert_eq!(root.child_count(), 0);

        // Configured nodes stay
        root.get_or_create("x").set_level(Some(Level::WARN));
        let leaf = root.get_or_create("x.y");
        assert_eq!(LoggerNode::prune(leaf), 1);
        assert!(root.get_if_exists("x").is_some());
        assert!(root.get_if_exists("x.y").is_none());
    }

    #[test]
    fn test_prune_skips_referenced_nodes() {
        let root = tree(false);
        let held = root.get_or_create("a.b");
        let also_held = Arc::clone(&held);
        assert_eq!(LoggerNode::prune(held), 0);
        assert!(root.get_if_exists("a.b").is_some());
        drop(also_held);

        let strong = tree(true);
        assert_eq!(LoggerNode::prune(strong.get_or_create("a")), 0);
        assert_eq!(strong.child_count(), 1);
    }
}
