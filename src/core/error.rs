//! Error types for the logger system

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Both attachment slots of a node hold other keys
    #[error("Attachment capacity exceeded on '{logger}': cannot attach key '{key}'")]
    AttachmentCapacity { logger: String, key: String },

    /// Level name not present in the namespace registry
    #[error("Unknown level name '{name}'")]
    UnknownLevel { name: String },

    /// Malformed filter expression
    #[error("Filter expression error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// Sink delivery failure, reported through the sink's error channel
    #[error("Sink '{sink}' failed: {message}")]
    Sink { sink: String, message: String },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Operation on a namespace after `close()`
    #[error("Namespace already closed")]
    NamespaceClosed,

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an attachment capacity error
    pub fn attachment_capacity(logger: impl Into<String>, key: impl Into<String>) -> Self {
        LoggerError::AttachmentCapacity {
            logger: logger.into(),
            key: key.into(),
        }
    }

    /// Create an unknown level error
    pub fn unknown_level(name: impl Into<String>) -> Self {
        LoggerError::UnknownLevel { name: name.into() }
    }

    /// Create a filter expression parse error
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        LoggerError::Parse {
            position,
            message: message.into(),
        }
    }

    /// Create a sink failure
    pub fn sink(sink: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::Sink {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LoggerError::attachment_capacity("a.b", "third");
        assert!(matches!(err, LoggerError::AttachmentCapacity { .. }));

        let err = LoggerError::config("NamespaceConfig", "unknown baseline level");
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

        let err = LoggerError::unknown_level("VERBOSE");
        assert!(matches!(err, LoggerError::UnknownLevel { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = LoggerError::attachment_capacity("a.b", "third");
        assert_eq!(
            err.to_string(),
            "Attachment capacity exceeded on 'a.b': cannot attach key 'third'"
        );

        let err = LoggerError::parse(7, "expected ')' but found ','");
        assert_eq!(
            err.to_string(),
            "Filter expression error at position 7: expected ')' but found ','"
        );

        let err = LoggerError::sink("console", "broken pipe");
        assert_eq!(err.to_string(), "Sink 'console' failed: broken pipe");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: LoggerError = io_err.into();
        assert!(err.to_string().contains("access denied"));
    }
}
