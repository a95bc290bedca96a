//! Record filters
//!
//! The filter surface is closed: terminals, combinators and a `Named` escape
//! hatch for predicates registered programmatically under an identifier.
//! Evaluation takes the record mutably because `levelChange`, `substitute`
//! and `substituteAll` rewrite it.

use super::error::{LoggerError, Result};
use super::level::Level;
use super::record::LogRecord;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

pub type FilterFn = dyn Fn(&mut LogRecord) -> bool + Send + Sync;

#[derive(Clone)]
pub enum Filter {
    Accept,
    Deny,
    Not(Box<Filter>),
    /// Accepts when every child accepts; stops at the first rejection
    All(Vec<Filter>),
    /// Accepts when some child accepts; stops at the first acceptance
    Any(Vec<Filter>),
    Levels(Vec<Level>),
    LevelRange {
        min: Level,
        min_inclusive: bool,
        max: Level,
        max_inclusive: bool,
    },
    LevelChange(Level),
    Match(Regex),
    Substitute {
        pattern: Regex,
        replacement: String,
        all: bool,
    },
    Named {
        name: String,
        filter: Arc<FilterFn>,
    },
}

impl Filter {
    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }

    pub fn all(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::All(filters.into_iter().collect())
    }

    pub fn any(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Any(filters.into_iter().collect())
    }

    pub fn levels(levels: impl IntoIterator<Item = Level>) -> Self {
        Filter::Levels(levels.into_iter().collect())
    }

    pub fn level_range(min: Level, min_inclusive: bool, max: Level, max_inclusive: bool) -> Self {
        Filter::LevelRange {
            min,
            min_inclusive,
            max,
            max_inclusive,
        }
    }

    pub fn match_pattern(pattern: &str) -> Result<Self> {
        Ok(Filter::Match(compile(pattern)?))
    }

    pub fn substitute(pattern: &str, replacement: impl Into<String>, all: bool) -> Result<Self> {
        Ok(Filter::Substitute {
            pattern: compile(pattern)?,
            replacement: replacement.into(),
            all,
        })
    }

    pub fn named<F>(name: impl Into<String>, filter: F) -> Self
    where
        F: Fn(&mut LogRecord) -> bool + Send + Sync + 'static,
    {
        Filter::Named {
            name: name.into(),
            filter: Arc::new(filter),
        }
    }

    /// The same predicate, rendered as the bare identifier `name`
    pub(crate) fn registered_as(self, name: &str) -> Self {
        match self {
            Filter::Named { filter, .. } => Filter::Named {
                name: name.to_string(),
                filter,
            },
            other => Filter::Named {
                name: name.to_string(),
                filter: Arc::new(move |record: &mut LogRecord| other.is_loggable(record)),
            },
        }
    }

    /// Evaluate the filter against `record`, possibly rewriting it
    pub fn is_loggable(&self, record: &mut LogRecord) -> bool {
        match self {
            Filter::Accept => true,
            Filter::Deny => false,
            Filter::Not(inner) => !inner.is_loggable(record),
            Filter::All(filters) => filters.iter().all(|f| f.is_loggable(record)),
            Filter::Any(filters) => filters.iter().any(|f| f.is_loggable(record)),
            Filter::Levels(levels) => {
                let severity = record.severity();
                levels.iter().any(|level| level.severity() == severity)
            }
            Filter::LevelRange {
                min,
                min_inclusive,
                max,
                max_inclusive,
            } => {
                let severity = record.severity();
                let above = if *min_inclusive {
                    severity >= min.severity()
                } else {
                    severity > min.severity()
                };
                let below = if *max_inclusive {
                    severity <= max.severity()
                } else {
                    severity < max.severity()
                };
                above && below
            }
            Filter::LevelChange(level) => {
                record.level = level.clone();
                true
            }
            Filter::Match(pattern) => pattern.is_match(&record.message),
            Filter::Substitute {
                pattern,
                replacement,
                all,
            } => {
                let replaced = if *all {
                    pattern.replace_all(&record.message, replacement.as_str())
                } else {
                    pattern.replace(&record.message, replacement.as_str())
                };
                if let std::borrow::Cow::Owned(message) = replaced {
                    record.message = message;
                }
                true
            }
            Filter::Named { filter, .. } => filter(record),
        }
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| LoggerError::config("Filter", e.to_string()))
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '"' => f.write_str("\\\"")?,
            '\u{8}' => f.write_str("\\b")?,
            '\u{c}' => f.write_str("\\f")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("\"")
}

fn write_list<T>(
    f: &mut fmt::Formatter<'_>,
    head: &str,
    items: &[T],
    each: impl Fn(&mut fmt::Formatter<'_>, &T) -> fmt::Result,
) -> fmt::Result {
    write!(f, "{}(", head)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        each(f, item)?;
    }
    f.write_str(")")
}

/// Renders the filter in expression syntax
impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Accept => f.write_str("accept"),
            Filter::Deny => f.write_str("deny"),
            Filter::Not(inner) => write!(f, "not({})", inner),
            Filter::All(filters) => write_list(f, "all", filters, |f, x| write!(f, "{}", x)),
            Filter::Any(filters) => write_list(f, "any", filters, |f, x| write!(f, "{}", x)),
            Filter::Levels(levels) => write_list(f, "levels", levels, |f, x| write!(f, "{}", x)),
            Filter::LevelRange {
                min,
                min_inclusive,
                max,
                max_inclusive,
            } => write!(
                f,
                "levelRange{}{},{}{}",
                if *min_inclusive { '[' } else { '(' },
                min,
                max,
                if *max_inclusive { ']' } else { ')' }
            ),
            Filter::LevelChange(level) => write!(f, "levelChange({})", level),
            Filter::Match(pattern) => {
                f.write_str("match(")?;
                write_quoted(f, pattern.as_str())?;
                f.write_str(")")
            }
            Filter::Substitute {
                pattern,
                replacement,
                all,
            } => {
                f.write_str(if *all { "substituteAll(" } else { "substitute(" })?;
                write_quoted(f, pattern.as_str())?;
                f.write_str(",")?;
                write_quoted(f, replacement)?;
                f.write_str(")")
            }
            Filter::Named { name, .. } => f.write_str(name),
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Filter({})", self)
    }
}
