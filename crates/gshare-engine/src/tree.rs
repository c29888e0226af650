//! AllocationTree — the weighted share hierarchy.
//!
//! Built once from a [`HierarchySource`] by fetching the top-level rows and
//! then each node's children by name, under a synthetic `root` of weight 100.
//! [`AllocationTree::normalize`] then rewrites every weight from "percent of
//! parent" into "percent of the whole tree". After that the tree is read-only.

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, info, warn};

use gshare_core::{HierarchySource, ROOT_SHARE, ShareRow};

use crate::error::{EngineError, EngineResult};
use crate::node::ShareNode;

#[derive(Debug, Clone)]
pub struct AllocationTree {
    root: ShareNode,
    normalized: bool,
}

impl AllocationTree {
    /// Load the hierarchy from `source`.
    ///
    /// Fails on invalid weights or patterns, on a share name that appears
    /// twice, and on branches deeper than `max_depth` levels below the root.
    pub fn build(source: &dyn HierarchySource, max_depth: usize) -> EngineResult<Self> {
        let mut root = ShareNode::root();
        let mut seen = HashSet::from([ROOT_SHARE.to_string()]);

        let top_level = fetch_rows(source, None)?;
        for row in top_level {
            let branch = load_branch(source, &row, ROOT_SHARE, 1, max_depth, &mut seen)?;
            root.add_child(branch);
        }

        let tree = Self {
            root,
            normalized: false,
        };
        info!(
            shares = tree.root.node_count() - 1,
            leaves = tree.leaves().len(),
            "share tree loaded"
        );
        Ok(tree)
    }

    /// Rescale weights top-down so that every node's children sum to the
    /// node's own weight, with the root fixed at 100.
    ///
    /// Children of a branch whose weights sum to zero all get zero. Runs at
    /// most once per tree; later calls are ignored.
    pub fn normalize(&mut self) {
        if self.normalized {
            warn!("share tree already normalized, ignoring");
            return;
        }
        self.root.weight = 100.0;
        normalize_branch(&mut self.root);
        self.normalized = true;
        debug!("share tree normalized");
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    pub fn root(&self) -> &ShareNode {
        &self.root
    }

    /// Leaf shares in depth-first order. Stable across calls.
    pub fn leaves(&self) -> Vec<&ShareNode> {
        self.root.leaves()
    }

    pub fn leaf_names(&self) -> Vec<String> {
        self.leaves().iter().map(|n| n.name().to_string()).collect()
    }

    pub fn find(&self, name: &str) -> Option<&ShareNode> {
        self.root.find(name)
    }
}

fn fetch_rows(source: &dyn HierarchySource, parent: Option<&str>) -> EngineResult<Vec<ShareRow>> {
    source.fetch_share_rows(parent).map_err(|e| {
        EngineError::Configuration(format!(
            "failed to fetch shares under {}: {e:#}",
            parent.unwrap_or(ROOT_SHARE)
        ))
    })
}

fn load_branch(
    source: &dyn HierarchySource,
    row: &ShareRow,
    parent: &str,
    depth: usize,
    max_depth: usize,
    seen: &mut HashSet<String>,
) -> EngineResult<ShareNode> {
    if depth > max_depth {
        return Err(EngineError::Configuration(format!(
            "share {} is more than {max_depth} levels deep, parent cycle?",
            row.name
        )));
    }
    if !seen.insert(row.name.clone()) {
        return Err(EngineError::Configuration(format!(
            "share name {} appears more than once",
            row.name
        )));
    }

    let mut node = ShareNode::from_row(row, parent)?;
    for child in fetch_rows(source, Some(&row.name))? {
        let branch = load_branch(source, &child, &row.name, depth + 1, max_depth, seen)?;
        node.add_child(branch);
    }
    Ok(node)
}

fn normalize_branch(node: &mut ShareNode) {
    let children_weight: f64 = node.children.iter().map(|c| c.weight).sum();
    let parent_weight = node.weight;
    for child in &mut node.children {
        child.weight = if children_weight > 0.0 {
            parent_weight * child.weight / children_weight
        } else {
            0.0
        };
        normalize_branch(child);
    }
}

impl fmt::Display for AllocationTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_node(f: &mut fmt::Formatter<'_>, node: &ShareNode, level: usize) -> fmt::Result {
            writeln!(
                f,
                "{}name: {}, weight: {}",
                "\t".repeat(level),
                node.name(),
                node.weight()
            )?;
            for child in node.children() {
                write_node(f, child, level + 1)?;
            }
            Ok(())
        }
        write_node(f, &self.root, 0)
    }
}
