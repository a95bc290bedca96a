//! # logtree
//!
//! A hierarchical logging core: a concurrent tree of named loggers with
//! inherited levels, per-node sink arrays and filters, and a small filter
//! expression language.
//!
//! ## Features
//!
//! - **Logger Tree**: Dotted names map to lazily created nodes; lookups are
//!   safe from any number of threads and always agree on node identity
//! - **Level Inheritance**: Effective levels propagate down the tree and are
//!   read lock-free on the logging path
//! - **Copy-on-Write Sinks**: Sink arrays are swapped atomically, so
//!   publishing never blocks on reconfiguration
//! - **Filter Expressions**: `all(levels(WARN,ERROR), not(match("health")))`
//!
//! ## Example
//!
//! ```
//! use logtree::prelude::*;
//!
//! let namespace = Namespace::new();
//! let http = namespace.logger("app.http");
//! namespace.logger("app").set_level(Level::DEBUG);
//!
//! let filter = namespace.parse_filter("not(match(\"health\"))").unwrap();
//! http.set_filter(filter);
//! http.debug("request accepted");
//! ```

pub mod core;
pub mod expr;
pub mod macros;
pub mod tree;

pub mod prelude {
    pub use crate::core::{
        ErrorChannel, FailureKind, Filter, Level, LogRecord, LoggerError, Result, Sink,
        SinkFailure, SinkRef,
    };
    pub use crate::tree::{AttachmentKey, Logger, Namespace, NamespaceBuilder};
}

pub use crate::core::{
    same_sink, ErrorChannel, FailureKind, Filter, FilterFn, Level, LevelRegistry, LogRecord,
    LoggerError, NamespaceMetrics, Result, Sink, SinkArray, SinkFailure, SinkRef,
    StderrErrorChannel,
};
pub use expr::NameResolver;
pub use tree::{
    AttachmentKey, LevelConfig, LiveNames, Logger, LoggerNode, Namespace, NamespaceBuilder,
    NamespaceConfig,
};
