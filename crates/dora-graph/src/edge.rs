//! Import edges.

use serde::{Deserialize, Serialize};

/// A directed `IMPORTS` relation between two files of the same repository.
///
/// `from` imports `to`. At most one edge exists per ordered pair; mutual
/// imports (`a→b` and `b→a`) are distinct edges and both legal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImportEdge {
    pub from: String,
    pub to: String,
}

impl ImportEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}
