//! `format!`-style logging macros over a [`Logger`](crate::Logger) handle.
//!
//! The message is only formatted when the logger's effective level lets the
//! record through.
//!
//! # Examples
//!
//! ```
//! use logtree::prelude::*;
//! use logtree::info;
//!
//! let namespace = Namespace::new();
//! let logger = namespace.logger("ingest.queue");
//!
//! let depth = 17;
//! info!(logger, "queue depth {}", depth);
//! ```

/// Log at an explicit, possibly custom, level.
///
/// # Examples
///
/// ```
/// # use logtree::prelude::*;
/// # let namespace = Namespace::new();
/// # let logger = namespace.logger("app");
/// use logtree::log;
/// log!(logger, Level::new("NOTICE", 850), "custom level {}", 850);
/// log!(logger, Level::ERROR, "lost {} records", 3);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        match (&$logger, $level) {
            (logger, level) => {
                if logger.is_loggable_level(&level) {
                    logger.log(level, format!($($arg)+));
                }
            }
        }
    };
}

/// `TRACE`
///
/// # Examples
///
/// ```
/// # use logtree::prelude::*;
/// # let namespace = Namespace::new();
/// # let logger = namespace.logger("app");
/// # logger.set_level(Level::TRACE);
/// use logtree::trace;
/// trace!(logger, "resolving {}", "ingest.queue");
/// ```
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::TRACE, $($arg)+)
    };
}

/// `DEBUG`
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::DEBUG, $($arg)+)
    };
}

/// `INFO`
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::INFO, $($arg)+)
    };
}

/// `WARN`
///
/// # Examples
///
/// ```
/// # use logtree::prelude::*;
/// # let namespace = Namespace::new();
/// # let logger = namespace.logger("app");
/// use logtree::warn;
/// warn!(logger, "sink {} slow: {} ms", "journal", 250);
/// ```
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::WARN, $($arg)+)
    };
}

/// `ERROR`
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::ERROR, $($arg)+)
    };
}

/// `FATAL`
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::FATAL, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{Level, LogRecord, Result, Sink};
    use crate::tree::Namespace;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Collect {
        lines: Mutex<Vec<String>>,
    }

    impl Sink for Collect {
        fn publish(&self, record: &LogRecord) -> Result<()> {
            self.lines
                .lock()
                .push(format!("{} {}", record.level, record.message));
            Ok(())
        }

        fn name(&self) -> &str {
            "collect"
        }
    }

    #[test]
    fn test_level_macros_format_and_deliver() {
        let namespace = Namespace::new();
        let logger = namespace.logger("macros");
        let sink = Arc::new(Collect::default());
        logger.add_sink(sink.clone());
        logger.set_level(Level::TRACE);

        trace!(logger, "t{}", 1);
        debug!(logger, "d{}", 2);
        info!(logger, "i{}", 3);
        warn!(logger, "w{}-{}", 4, 5);
        error!(logger, "e{}", "6");
        fatal!(logger, "f{:02}", 7);
        log!(logger, Level::new("NOTICE", 850), "n{}", 8);

        assert_eq!(
            *sink.lines.lock(),
            vec![
                "TRACE t1",
                "DEBUG d2",
                "INFO i3",
                "WARN w4-5",
                "ERROR e6",
                "FATAL f07",
                "NOTICE n8",
            ]
        );
    }

    #[test]
    fn test_disabled_level_skips_formatting() {
        struct Counted<'a>(&'a AtomicUsize);

        impl std::fmt::Display for Counted<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fetch_add(1, Ordering::SeqCst);
                write!(f, "counted")
            }
        }

        let namespace = Namespace::new();
        let logger = namespace.logger("lazy");
        let formatted = AtomicUsize::new(0);

        debug!(logger, "{}", Counted(&formatted));
        assert_eq!(formatted.load(Ordering::SeqCst), 0);

        info!(logger, "{}", Counted(&formatted));
        assert_eq!(formatted.load(Ordering::SeqCst), 1);
    }
}
