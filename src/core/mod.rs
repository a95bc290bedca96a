//! Core logger types and traits

pub mod error;
pub mod filter;
pub mod level;
pub mod metrics;
pub mod record;
pub mod sink;
pub mod sink_array;

pub use error::{LoggerError, Result};
pub use filter::{Filter, FilterFn};
pub use level::{Level, LevelRegistry};
pub use metrics::NamespaceMetrics;
pub use record::LogRecord;
pub use sink::{ErrorChannel, FailureKind, Sink, SinkFailure, StderrErrorChannel};
pub use sink_array::{same_sink, SinkArray, SinkRef};
