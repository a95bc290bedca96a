//! Namespace: an isolated logger tree with its own level registry, named
//! filters and shutdown hooks

use super::logger::Logger;
use super::names::LiveNames;
use super::node::{LoggerNode, TreeState};
use crate::core::error::{LoggerError, Result};
use crate::core::filter::Filter;
use crate::core::level::{Level, LevelRegistry};
use crate::core::metrics::NamespaceMetrics;
use crate::expr::{self, NameResolver};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_NAMESPACE_ID: AtomicU64 = AtomicU64::new(1);

type ShutdownHook = Box<dyn FnOnce() + Send>;

pub struct Namespace {
    id: u64,
    root: Arc<LoggerNode>,
    levels: LevelRegistry,
    filters: ArcSwap<HashMap<String, Filter>>,
    shutdown_hooks: Mutex<Vec<ShutdownHook>>,
    closed: AtomicBool,
}

impl Namespace {
    /// A namespace with strong child retention and an INFO baseline
    #[must_use]
    pub fn new() -> Self {
        NamespaceBuilder::new().build()
    }

    #[must_use]
    pub fn builder() -> NamespaceBuilder {
        NamespaceBuilder::new()
    }

    /// Build a namespace from a deserialized configuration
    ///
    /// # Example
    ///
    /// ```
    /// use logtree::{Namespace, NamespaceConfig, LevelConfig};
    ///
    /// let config = NamespaceConfig {
    ///     strong_children: false,
    ///     baseline_level: "NOTICE".to_string(),
    ///     levels: vec![LevelConfig { name: "NOTICE".to_string(), severity: 850 }],
    /// };
    /// let namespace = Namespace::from_config(&config).unwrap();
    /// assert_eq!(namespace.root().effective_level(), 850);
    /// ```
    pub fn from_config(config: &NamespaceConfig) -> Result<Self> {
        let mut builder = NamespaceBuilder::new().strong_children(config.strong_children);
        for level in &config.levels {
            builder = builder.level(Level::new(level.name.clone(), level.severity));
        }
        let baseline = config
            .levels
            .iter()
            .find(|level| level.name == config.baseline_level)
            .map(|level| Level::new(level.name.clone(), level.severity))
            .map_or_else(|| config.baseline_level.parse::<Level>(), Ok)
            .map_err(|_| {
                LoggerError::config(
                    "NamespaceConfig",
                    format!("unknown baseline level '{}'", config.baseline_level),
                )
            })?;
        Ok(builder.baseline_level(baseline).build())
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn strong_children(&self) -> bool {
        self.root.state().strong_children
    }

    /// Severity of the root when it has no explicit level
    pub fn baseline_level(&self) -> i32 {
        self.root.state().baseline
    }

    pub fn root(&self) -> Logger {
        Logger::new(Arc::clone(&self.root))
    }

    /// Get or create the logger for a dotted name
    pub fn logger(&self, name: &str) -> Logger {
        self.reclaim();
        Logger::new(self.root.get_or_create(name))
    }

    /// The logger for `name` if every segment of it already exists
    pub fn logger_if_exists(&self, name: &str) -> Option<Logger> {
        self.reclaim();
        self.root.get_if_exists(name).map(Logger::new)
    }

    // ---------------------------------------------------------------------
    // Levels
    // ---------------------------------------------------------------------

    pub fn register_level(&self, level: Level) {
        self.levels.register(level);
    }

    /// Register a level that resolves only while `level` is alive elsewhere
    pub fn register_level_weak(&self, level: &Arc<Level>) {
        self.levels.register_weak(level);
    }

    pub fn unregister_level(&self, name: &str) -> bool {
        self.levels.unregister(name)
    }

    pub fn level_for_name(&self, name: &str) -> Result<Level> {
        self.levels.get(name)
    }

    pub fn level_names(&self) -> Vec<String> {
        self.levels.names()
    }

    // ---------------------------------------------------------------------
    // Named filters
    // ---------------------------------------------------------------------

    /// Make `filter` available to filter expressions as a bare identifier
    pub fn register_filter(&self, name: impl Into<String>, filter: Filter) {
        let name = name.into();
        self.filters.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(name.clone(), filter.clone());
            next
        });
    }

    pub fn unregister_filter(&self, name: &str) -> Option<Filter> {
        let previous = self.filters.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.remove(name);
            next
        });
        previous.get(name).cloned()
    }

    pub fn named_filter(&self, name: &str) -> Option<Filter> {
        self.filters.load().get(name).cloned()
    }

    /// Compile a filter expression against this namespace's levels and
    /// named filters
    ///
    /// # Example
    ///
    /// ```
    /// use logtree::{Level, LogRecord, Namespace};
    ///
    /// let namespace = Namespace::new();
    /// let filter = namespace.parse_filter("levelRange[INFO,WARN]").unwrap();
    ///
    /// assert!(filter.is_loggable(&mut LogRecord::new(Level::INFO, "x")));
    /// assert!(!filter.is_loggable(&mut LogRecord::new(Level::DEBUG, "x")));
    /// ```
    pub fn parse_filter(&self, expression: &str) -> Result<Filter> {
        expr::parse(expression, self)
    }

    // ---------------------------------------------------------------------
    // Handles
    // ---------------------------------------------------------------------

    /// Names of all loggers with at least one live handle, depth first
    pub fn live_logger_names(&self) -> LiveNames {
        self.reclaim();
        LiveNames::new(Arc::clone(&self.root))
    }

    /// Process pending handle reclamation notices. Returns how many were
    /// handled.
    ///
    /// Every new handle triggers a pass; call it directly to make
    /// live-handle queries current without creating one.
    pub fn reclaim(&self) -> usize {
        self.root.state().reclaim()
    }

    pub fn metrics(&self) -> &NamespaceMetrics {
        &self.root.state().metrics
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Register a hook to run on [`close`](Self::close). Hooks run once, in
    /// registration order.
    pub fn add_shutdown_hook<F>(&self, hook: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut hooks = self.shutdown_hooks.lock();
        if self.closed.load(Ordering::Acquire) {
            return Err(LoggerError::NamespaceClosed);
        }
        hooks.push(Box::new(hook));
        Ok(())
    }

    /// Run shutdown hooks and reset the whole tree.
    ///
    /// The namespace stays usable afterward; loggers looked up later start
    /// from defaults. Hooks registered after the first close are refused.
    pub fn close(&self) {
        let hooks = {
            let mut hooks = self.shutdown_hooks.lock();
            self.closed.store(true, Ordering::Release);
            std::mem::take(&mut *hooks)
        };
        for hook in hooks {
            hook();
        }
        self.root.reset();
        self.reclaim();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl NameResolver for Namespace {
    fn level(&self, name: &str) -> Result<Level> {
        self.level_for_name(name)
    }

    fn filter(&self, name: &str) -> Option<Filter> {
        self.named_filter(name)
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Namespace {
    fn drop(&mut self) {
        self.root.detach_subtree();
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("id", &self.id)
            .field("strong_children", &self.strong_children())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Builder for constructing a Namespace with a fluent API
///
/// # Example
/// ```
/// use logtree::prelude::*;
///
/// let namespace = Namespace::builder()
///     .strong_children(false)
///     .baseline_level(Level::WARN)
///     .level(Level::new("NOTICE", 850))
///     .named_filter("quiet", Filter::Deny)
///     .build();
///
/// assert_eq!(namespace.root().effective_level(), Level::WARN.severity());
/// assert!(namespace.parse_filter("not(quiet)").is_ok());
/// ```
pub struct NamespaceBuilder {
    strong_children: bool,
    baseline: Level,
    levels: Vec<Level>,
    filters: HashMap<String, Filter>,
}

impl NamespaceBuilder {
    pub fn new() -> Self {
        Self {
            strong_children: true,
            baseline: Level::INFO,
            levels: Vec::new(),
            filters: HashMap::new(),
        }
    }

    /// Keep every created node for the namespace's lifetime (default), or
    /// let unused, unconfigured nodes be pruned once their handles are gone
    #[must_use = "builder methods return a new value"]
    pub fn strong_children(mut self, strong: bool) -> Self {
        self.strong_children = strong;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn baseline_level(mut self, level: Level) -> Self {
        self.baseline = level;
        self
    }

    /// Register an additional level
    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: Level) -> Self {
        self.levels.push(level);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn named_filter(mut self, name: impl Into<String>, filter: Filter) -> Self {
        self.filters.insert(name.into(), filter);
        self
    }

    pub fn build(self) -> Namespace {
        let state = Arc::new(TreeState::new(
            self.baseline.severity(),
            self.strong_children,
        ));

        let levels = LevelRegistry::new();
        levels.register(self.baseline);
        for level in self.levels {
            levels.register(level);
        }

        Namespace {
            id: NEXT_NAMESPACE_ID.fetch_add(1, Ordering::Relaxed),
            root: Arc::new(LoggerNode::root(state)),
            levels,
            filters: ArcSwap::from_pointee(self.filters),
            shutdown_hooks: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }
}

impl Default for NamespaceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable namespace settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceConfig {
    pub strong_children: bool,
    /// Name of a standard level or of one listed in `levels`
    pub baseline_level: String,
    pub levels: Vec<LevelConfig>,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            strong_children: true,
            baseline_level: Level::INFO.name().to_string(),
            levels: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelConfig {
    pub name: String,
    pub severity: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_builder_defaults() {
        let namespace = Namespace::builder().build();
        assert!(namespace.strong_children());
        assert_eq!(namespace.baseline_level(), Level::INFO.severity());
        assert!(!namespace.is_closed());
        assert_ne!(namespace.id(), Namespace::new().id());
    }

    #[test]
    fn test_logger_identity() {
        let namespace = Namespace::new();
        let first = namespace.logger("a.b");
        let second = namespace.logger("a.b");
        assert!(first.same_node(&second));
        assert_eq!(first.name(), "a.b");
        assert!(first.parent().unwrap().same_node(&namespace.logger("a")));
        assert!(namespace.root().parent().is_none());
    }

    #[test]
    fn test_logger_if_exists() {
        let namespace = Namespace::new();
        assert!(namespace.logger_if_exists("missing").is_none());
        namespace.logger("present.child");
        assert!(namespace.logger_if_exists("present").is_some());
        assert!(namespace.logger_if_exists("present.child").is_some());
    }

    #[test]
    fn test_level_registry_through_namespace() {
        let namespace = Namespace::builder().level(Level::new("NOTICE", 850)).build();
        assert_eq!(namespace.level_for_name("NOTICE").unwrap().severity(), 850);
        assert!(matches!(
            namespace.level_for_name("VERBOSE"),
            Err(LoggerError::UnknownLevel { .. })
        ));

        namespace.register_level(Level::new("VERBOSE", 450));
        assert!(namespace.level_names().contains(&"VERBOSE".to_string()));
        assert!(namespace.unregister_level("VERBOSE"));
    }

    #[test]
    fn test_named_filters() {
        let namespace = Namespace::new();
        assert!(namespace.named_filter("quiet").is_none());
        namespace.register_filter("quiet", Filter::Deny);
        assert!(namespace.named_filter("quiet").is_some());
        assert!(namespace.unregister_filter("quiet").is_some());
        assert!(namespace.unregister_filter("quiet").is_none());
    }

    #[test]
    fn test_shutdown_hooks_run_once_in_order() {
        let namespace = Namespace::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = Arc::clone(&order);
            namespace
                .add_shutdown_hook(move || order.lock().push(i))
                .unwrap();
        }

        namespace.close();
        namespace.close();
        assert_eq!(*order.lock(), vec![0, 1, 2]);
        assert!(namespace.is_closed());
        assert!(matches!(
            namespace.add_shutdown_hook(|| {}),
            Err(LoggerError::NamespaceClosed)
        ));
    }

    #[test]
    fn test_close_resets_tree() {
        let namespace = Namespace::new();
        let logger = namespace.logger("a.b");
        logger.set_level(Level::ERROR);
        namespace.root().set_level(Level::WARN);

        namespace.close();
        assert!(logger.level().is_none());
        assert_eq!(namespace.root().effective_level(), Level::INFO.severity());
        assert!(namespace.logger_if_exists("a").is_none());

        let fresh = namespace.logger("a.b");
        assert!(!fresh.same_node(&logger));
        assert_eq!(fresh.effective_level(), Level::INFO.severity());
    }

    #[test]
    fn test_reclaim_updates_live_handles() {
        let namespace = Namespace::new();
        let logger = namespace.logger("svc");
        let clone = logger.clone();
        assert!(logger.node().has_live_handles());

        drop(logger);
        namespace.reclaim();
        assert!(clone.node().has_live_handles());

        let node = Arc::clone(clone.node());
        drop(clone);
        assert!(node.has_live_handles());
        assert_eq!(namespace.reclaim(), 1);
        assert!(!node.has_live_handles());
        assert_eq!(namespace.metrics().handles_reclaimed(), 1);
    }

    #[test]
    fn test_handle_churn_without_lookups_is_reclaimed() {
        let namespace = Namespace::new();
        let logger = namespace.logger("a.b");
        namespace.reclaim();
        for _ in 0..1000 {
            drop(logger.parent());
            drop(namespace.root());
        }

        let parent = logger.parent().unwrap();
        assert_eq!(parent.node().live_handle_count(), 1);
        assert_eq!(namespace.metrics().handles_reclaimed(), 2000);
        assert_eq!(namespace.reclaim(), 0);
        assert_eq!(namespace.root.live_handle_count(), 0);
    }

    #[test]
    fn test_weak_retention_prunes_unused_nodes() {
        let namespace = Namespace::builder().strong_children(false).build();
        let logger = namespace.logger("tmp.worker");
        drop(logger);
        namespace.reclaim();
        assert!(namespace.logger_if_exists("tmp").is_none());
        assert_eq!(namespace.metrics().nodes_pruned(), 2);

        let configured = namespace.logger("kept");
        configured.set_level(Level::DEBUG);
        drop(configured);
        namespace.reclaim();
        assert!(namespace.logger_if_exists("kept").is_some());
    }

    #[test]
    fn test_strong_retention_keeps_nodes() {
        let namespace = Namespace::new();
        drop(namespace.logger("tmp.worker"));
        namespace.reclaim();
        assert!(namespace.logger_if_exists("tmp.worker").is_some());
    }

    #[test]
    fn test_from_config() {
        let config: NamespaceConfig = serde_json::from_str(
            r#"{"strong_children": false, "baseline_level": "warn"}"#,
        )
        .unwrap();
        let namespace = Namespace::from_config(&config).unwrap();
        assert!(!namespace.strong_children());
        assert_eq!(namespace.baseline_level(), Level::WARN.severity());

        let bad = NamespaceConfig {
            baseline_level: "LOUD".to_string(),
            ..NamespaceConfig::default()
        };
        assert!(matches!(
            Namespace::from_config(&bad),
            Err(LoggerError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_hook_may_use_namespace_state() {
        let namespace = Arc::new(Namespace::new());
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        let logger = namespace.logger("hooked");
        namespace
            .add_shutdown_hook(move || {
                logger.set_level(Level::ERROR);
                seen_clone.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        namespace.close();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        // Reset happens after hooks
        assert!(namespace.logger_if_exists("hooked").is_none());
    }
}
