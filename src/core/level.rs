//! Level definitions and the per-namespace level registry

use super::error::{LoggerError, Result};
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Weak};

/// A named severity threshold.
///
/// Levels are ordered by numeric severity; two levels with the same severity
/// but different names are distinct, with the name breaking the tie.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Level {
    name: Cow<'static, str>,
    severity: i32,
}

impl Level {
    pub const ALL: Level = Level::new_static("ALL", i32::MIN);
    pub const TRACE: Level = Level::new_static("TRACE", 400);
    pub const DEBUG: Level = Level::new_static("DEBUG", 500);
    pub const INFO: Level = Level::new_static("INFO", 800);
    pub const WARN: Level = Level::new_static("WARN", 900);
    pub const ERROR: Level = Level::new_static("ERROR", 1000);
    pub const FATAL: Level = Level::new_static("FATAL", 1100);
    pub const OFF: Level = Level::new_static("OFF", i32::MAX);

    /// Standard levels, lowest severity first
    pub const STANDARD: [Level; 8] = [
        Level::ALL,
        Level::TRACE,
        Level::DEBUG,
        Level::INFO,
        Level::WARN,
        Level::ERROR,
        Level::FATAL,
        Level::OFF,
    ];

    pub const fn new_static(name: &'static str, severity: i32) -> Self {
        Self {
            name: Cow::Borrowed(name),
            severity,
        }
    }

    pub fn new(name: impl Into<String>, severity: i32) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            severity,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn severity(&self) -> i32 {
        self.severity
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::INFO
    }
}

impl PartialOrd for Level {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Level {
    fn cmp(&self, other: &Self) -> Ordering {
        self.severity
            .cmp(&other.severity)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl FromStr for Level {
    type Err = LoggerError;

    /// Parses one of the standard level names, ignoring case.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "ALL" => Ok(Level::ALL),
            "TRACE" => Ok(Level::TRACE),
            "DEBUG" => Ok(Level::DEBUG),
            "INFO" => Ok(Level::INFO),
            "WARN" | "WARNING" => Ok(Level::WARN),
            "ERROR" => Ok(Level::ERROR),
            "FATAL" => Ok(Level::FATAL),
            "OFF" => Ok(Level::OFF),
            _ => Err(LoggerError::unknown_level(s)),
        }
    }
}

#[derive(Debug, Clone)]
enum Entry {
    Strong(Arc<Level>),
    Weak(Weak<Level>),
}

impl Entry {
    fn upgrade(&self) -> Option<Level> {
        match self {
            Entry::Strong(level) => Some(Level::clone(level)),
            Entry::Weak(level) => level.upgrade().map(|level| Level::clone(&level)),
        }
    }

    fn is_expired(&self) -> bool {
        matches!(self, Entry::Weak(level) if level.strong_count() == 0)
    }
}

/// Name to level mapping, updated copy-on-write.
///
/// Readers load the current map without locking. Writers build a new map from
/// the snapshot they read and install it with compare-and-swap, retrying when
/// another writer got there first.
#[derive(Debug)]
pub struct LevelRegistry {
    entries: ArcSwap<HashMap<String, Entry>>,
}

impl LevelRegistry {
    /// A registry pre-populated with the standard levels
    pub fn new() -> Self {
        let entries = Level::STANDARD
            .iter()
            .map(|level| (level.name().to_string(), Entry::Strong(Arc::new(level.clone()))))
            .collect();
        Self {
            entries: ArcSwap::from_pointee(entries),
        }
    }

    /// Register a level under its own name, replacing any previous entry
    pub fn register(&self, level: Level) {
        let level = Arc::new(level);
        self.update(|entries| {
            entries.insert(level.name().to_string(), Entry::Strong(Arc::clone(&level)));
        });
    }

    /// Register a level that stays resolvable only while the caller keeps
    /// `level` alive
    pub fn register_weak(&self, level: &Arc<Level>) {
        let weak = Arc::downgrade(level);
        self.update(|entries| {
            entries.insert(level.name().to_string(), Entry::Weak(weak.clone()));
        });
    }

    /// Remove a level by name; returns whether an entry was present
    pub fn unregister(&self, name: &str) -> bool {
        let previous = self.entries.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.remove(name);
            next
        });
        previous.contains_key(name)
    }

    /// Resolve a level by name
    pub fn get(&self, name: &str) -> Result<Level> {
        self.entries
            .load()
            .get(name)
            .and_then(Entry::upgrade)
            .ok_or_else(|| LoggerError::unknown_level(name))
    }

    /// Names of all currently resolvable levels, sorted
    pub fn names(&self) -> Vec<String> {
        let entries = self.entries.load();
        let mut names: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    fn update(&self, apply: impl Fn(&mut HashMap<String, Entry>)) {
        self.entries.rcu(|current| {
            let mut next: HashMap<String, Entry> = current
                .iter()
                .filter(|(_, entry)| !entry.is_expired())
                .map(|(name, entry)| (name.clone(), entry.clone()))
                .collect();
            apply(&mut next);
            next
        });
    }
}

impl Default for LevelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
