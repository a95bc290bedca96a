//! Log record structure

use super::level::Level;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cell::RefCell;

// Thread-local caches for thread information to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
    static THREAD_NAME_CACHE: RefCell<Option<Option<String>>> = const { RefCell::new(None) };
}

fn get_thread_id() -> String {
    THREAD_ID_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| format!("{:?}", std::thread::current().id()))
            .clone()
    })
}

fn get_thread_name() -> Option<String> {
    THREAD_NAME_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| std::thread::current().name().map(String::from))
            .clone()
    })
}

/// The unit of data moving through the logger tree.
///
/// `level` and `message` are public so filters such as `levelChange` and
/// `substitute` can rewrite them before the record is accepted.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
    pub logger_name: String,
    pub timestamp: DateTime<Utc>,
    pub thread_id: String,
    pub thread_name: Option<String>,
}

impl LogRecord {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            logger_name: String::new(),
            timestamp: Utc::now(),
            thread_id: get_thread_id(),
            thread_name: get_thread_name(),
        }
    }

    #[must_use]
    pub fn with_logger_name(mut self, name: impl Into<String>) -> Self {
        self.logger_name = name.into();
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    #[inline]
    pub fn severity(&self) -> i32 {
        self.level.severity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_defaults() {
        let record = LogRecord::new(Level::WARN, "disk almost full");
        assert_eq!(record.level, Level::WARN);
        assert_eq!(record.severity(), 900);
        assert_eq!(record.message, "disk almost full");
        assert!(record.logger_name.is_empty());
        assert!(!record.thread_id.is_empty());
    }

    #[test]
    fn test_record_builder() {
        let record = LogRecord::new(Level::INFO, "started").with_logger_name("app.server");
        assert_eq!(record.logger_name, "app.server");
    }

    #[test]
    fn test_thread_name_cached_per_thread() {
        let name = std::thread::Builder::new()
            .name("worker-7".into())
            .spawn(|| LogRecord::new(Level::INFO, "x").thread_name)
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(name.as_deref(), Some("worker-7"));
    }
}
