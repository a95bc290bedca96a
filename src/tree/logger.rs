//! User-facing logger handles

use super::attachments::AttachmentKey;
use super::node::{LoggerNode, Reclaim};
use crate::core::error::Result;
use crate::core::filter::Filter;
use crate::core::level::Level;
use crate::core::record::LogRecord;
use crate::core::sink_array::SinkRef;
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;

struct HandleInner {
    id: u64,
    node: Arc<LoggerNode>,
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        // The receiver lives in the same tree state, so this cannot fail
        let _ = self.node.state().reclaim_tx.send(Reclaim {
            node: Arc::downgrade(&self.node),
            handle_id: self.id,
        });
    }
}

/// A handle bound to one node of a namespace's logger tree.
///
/// Cloning is cheap and clones share one identity for live-handle tracking.
/// When the last clone is dropped the node's tracking set is updated on the
/// namespace's next reclamation pass, which runs whenever a handle is created.
///
/// # Example
///
/// ```
/// use logtree::{Level, Namespace};
///
/// let namespace = Namespace::new();
/// let logger = namespace.logger("app.http");
/// namespace.logger("app").set_level(Level::WARN);
///
/// assert_eq!(logger.effective_level(), Level::WARN.severity());
/// assert!(!logger.is_loggable_level(&Level::INFO));
/// ```
#[derive(Clone)]
pub struct Logger {
    inner: Arc<HandleInner>,
}

impl Logger {
    pub(crate) fn new(node: Arc<LoggerNode>) -> Self {
        let id = node.state().next_handle_id.fetch_add(1, Ordering::Relaxed);
        node.track_handle(id);
        // Handles dropped since the last pass; `node` is held, so never pruned here
        node.state().reclaim();
        Self {
            inner: Arc::new(HandleInner { id, node }),
        }
    }

    /// The underlying tree node
    pub fn node(&self) -> &Arc<LoggerNode> {
        &self.inner.node
    }

    /// Full dotted name; empty for the root
    pub fn name(&self) -> &str {
        self.inner.node.full_name()
    }

    /// Whether both handles are bound to the same tree node
    pub fn same_node(&self, other: &Logger) -> bool {
        Arc::ptr_eq(&self.inner.node, &other.inner.node)
    }

    /// A new handle for the parent node, `None` for the root
    pub fn parent(&self) -> Option<Logger> {
        self.inner.node.parent().map(|parent| Logger::new(Arc::clone(parent)))
    }

    pub fn level(&self) -> Option<Level> {
        self.inner.node.level()
    }

    /// Set (`Level`) or clear (`None`) the explicit level
    pub fn set_level(&self, level: impl Into<Option<Level>>) {
        self.inner.node.set_level(level.into());
    }

    pub fn effective_level(&self) -> i32 {
        self.inner.node.effective_level()
    }

    #[inline]
    pub fn is_loggable_level(&self, level: &Level) -> bool {
        self.inner.node.is_enabled(level)
    }

    pub fn filter(&self) -> Option<Arc<Filter>> {
        self.inner.node.filter()
    }

    pub fn set_filter(&self, filter: impl Into<Option<Filter>>) {
        self.inner.node.set_filter(filter.into());
    }

    pub fn use_parent_filters(&self) -> bool {
        self.inner.node.use_parent_filters()
    }

    pub fn set_use_parent_filters(&self, value: bool) {
        self.inner.node.set_use_parent_filters(value);
    }

    pub fn use_parent_sinks(&self) -> bool {
        self.inner.node.use_parent_sinks()
    }

    pub fn set_use_parent_sinks(&self, value: bool) {
        self.inner.node.set_use_parent_sinks(value);
    }

    pub fn add_sink(&self, sink: SinkRef) {
        self.inner.node.sinks().add(sink);
    }

    pub fn remove_sink(&self, sink: &SinkRef) -> bool {
        self.inner.node.sinks().remove(sink)
    }

    /// Replace all sinks, returning the previous ones
    pub fn set_sinks(&self, sinks: Vec<SinkRef>) -> Arc<Vec<SinkRef>> {
        self.inner.node.sinks().set(sinks)
    }

    pub fn compare_and_set_sinks(&self, expected: &Arc<Vec<SinkRef>>, sinks: Vec<SinkRef>) -> bool {
        self.inner.node.sinks().compare_and_set(expected, sinks)
    }

    pub fn clear_sinks(&self) -> Arc<Vec<SinkRef>> {
        self.inner.node.sinks().clear()
    }

    pub fn sinks(&self) -> Arc<Vec<SinkRef>> {
        self.inner.node.sinks().snapshot()
    }

    pub fn attachment<T: Send + Sync + 'static>(&self, key: &AttachmentKey<T>) -> Option<Arc<T>> {
        self.inner.node.attachment(key)
    }

    pub fn attach<T: Send + Sync + 'static>(
        &self,
        key: &AttachmentKey<T>,
        value: T,
    ) -> Result<Option<Arc<T>>> {
        self.inner.node.attach(key, value)
    }

    pub fn attach_if_absent<T: Send + Sync + 'static>(
        &self,
        key: &AttachmentKey<T>,
        value: T,
    ) -> Result<Option<Arc<T>>> {
        self.inner.node.attach_if_absent(key, value)
    }

    pub fn detach<T: Send + Sync + 'static>(&self, key: &AttachmentKey<T>) -> Option<Arc<T>> {
        self.inner.node.detach(key)
    }

    /// Run this node's filter chain on `record` without publishing it
    pub fn is_loggable(&self, record: &mut LogRecord) -> bool {
        self.inner.node.is_loggable(record)
    }

    /// Deliver `record` to the sink chain, skipping level and filter checks
    pub fn publish(&self, record: &LogRecord) {
        self.inner.node.publish(record);
    }

    /// Level check, filter chain, then delivery. Sink failures never surface
    /// here; they go to each sink's error channel.
    pub fn log_record(&self, mut record: LogRecord) {
        let node = &self.inner.node;
        let metrics = &node.state().metrics;
        if !node.is_enabled(&record.level) {
            metrics.record_below_level();
            return;
        }
        if record.logger_name.is_empty() {
            record.logger_name = node.full_name().to_string();
        }
        if !node.is_loggable(&mut record) {
            metrics.record_filtered();
            return;
        }
        node.publish(&record);
        metrics.record_published();
    }

    pub fn log(&self, level: Level, message: impl Into<String>) {
        // Cheap rejection before the record is built
        if !self.is_loggable_level(&level) {
            self.inner.node.state().metrics.record_below_level();
            return;
        }
        self.log_record(LogRecord::new(level, message));
    }

    #[inline]
    pub fn trace(&self, message: impl Into<String>) {
        self.log(Level::TRACE, message);
    }

    #[inline]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(Level::DEBUG, message);
    }

    #[inline]
    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::INFO, message);
    }

    #[inline]
    pub fn warn(&self, message: impl Into<String>) {
        self.log(Level::WARN, message);
    }

    #[inline]
    pub fn error(&self, message: impl Into<String>) {
        self.log(Level::ERROR, message);
    }

    #[inline]
    pub fn fatal(&self, message: impl Into<String>) {
        self.log(Level::FATAL, message);
    }

    /// Flush every sink this logger publishes to
    pub fn flush(&self) {
        self.inner.node.flush();
    }

    /// Reset the node to defaults and drop its subtree. Later lookups under
    /// this name create fresh children.
    pub fn reset(&self) {
        self.inner.node.reset();
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name())
            .field("handle", &self.inner.id)
            .finish()
    }
}
