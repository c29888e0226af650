//! Task classification against leaf share patterns.

use std::collections::HashSet;

use gshare_core::{TaskDescriptor, UNDEFINED_SHARE};

use crate::node::ShareClassifier;
use crate::tree::AllocationTree;

/// Matches tasks to leaf shares. First matching leaf in tree order wins.
#[derive(Debug, Clone)]
pub struct TaskClassifier {
    leaves: Vec<LeafPatterns>,
    names: HashSet<String>,
}

#[derive(Debug, Clone)]
struct LeafPatterns {
    name: String,
    patterns: ShareClassifier,
}

/// Outcome of classifying one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification<'a> {
    Share(&'a str),
    Unclassified,
}

impl<'a> Classification<'a> {
    /// The share name, or `"Undefined"`.
    pub fn name(&self) -> &'a str {
        match *self {
            Classification::Share(name) => name,
            Classification::Unclassified => UNDEFINED_SHARE,
        }
    }
}

impl TaskClassifier {
    /// Snapshot the leaves of `tree` in traversal order.
    pub fn new(tree: &AllocationTree) -> Self {
        let leaves: Vec<LeafPatterns> = tree
            .leaves()
            .into_iter()
            .map(|leaf| LeafPatterns {
                name: leaf.name().to_string(),
                patterns: leaf.classifier().clone(),
            })
            .collect();
        let names = leaves.iter().map(|l| l.name.clone()).collect();
        Self { leaves, names }
    }

    pub fn classify(&self, task: &TaskDescriptor) -> Classification<'_> {
        self.leaves
            .iter()
            .find(|leaf| leaf.patterns.matches(task))
            .map_or(Classification::Unclassified, |leaf| {
                Classification::Share(&leaf.name)
            })
    }

    pub fn is_valid_leaf(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}
