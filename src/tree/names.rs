//! Enumeration of logger names that currently have live handles

use super::node::LoggerNode;
use std::sync::Arc;

/// Lazy depth-first walk over the tree, yielding the full name of every node
/// with at least one tracked handle.
///
/// A node's own name comes before its descendants. Children are read when
/// their parent is visited, so nodes created while the walk is in progress
/// may or may not be seen.
pub struct LiveNames {
    stack: Vec<Arc<LoggerNode>>,
}

impl LiveNames {
    pub(crate) fn new(root: Arc<LoggerNode>) -> Self {
        Self { stack: vec![root] }
    }
}

impl Iterator for LiveNames {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while let Some(node) = self.stack.pop() {
            let mut children = node.children_snapshot();
            // Reverse name order on the stack gives ascending visit order
            children.sort_by(|a, b| b.name().cmp(a.name()));
            self.stack.extend(children);
            if node.has_live_handles() {
                return Some(node.full_name().to_string());
            }
        }
        None
    }
}
