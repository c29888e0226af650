//! Priority ranking of leaf shares by under-pledge.
//!
//! Ordering is decided level by level: the root's children are ranked among
//! themselves, then each child's block of leaves is ranked the same way.
//! Two leaves under different parents are never compared directly, so a
//! well-served leaf in an under-served branch still comes before an
//! under-served leaf in a well-served branch.

use crate::distribution::Distribution;
use crate::node::ShareNode;
use crate::tree::AllocationTree;

/// Leaves of `tree`, most under-pledged branches first.
pub fn sorted_leaves<'a>(tree: &'a AllocationTree, distribution: &Distribution) -> Vec<&'a ShareNode> {
    let mut sorted = Vec::new();
    sort_branch(tree.root(), distribution, &mut sorted);
    sorted
}

fn sort_branch<'a>(node: &'a ShareNode, distribution: &Distribution, sorted: &mut Vec<&'a ShareNode>) {
    if node.is_leaf() {
        sorted.push(node);
        return;
    }
    for child in rank_children(node.children(), distribution) {
        sort_branch(child, distribution, sorted);
    }
}

/// Stable insertion sort by descending under-pledge.
///
/// A child with no distribution entry ranks below every child that has one;
/// ties keep their tree order.
fn rank_children<'a>(children: &'a [ShareNode], distribution: &Distribution) -> Vec<&'a ShareNode> {
    let mut ranked: Vec<(&'a ShareNode, Option<f64>)> = Vec::with_capacity(children.len());
    for child in children {
        let key = distribution.get(child.name()).map(|u| u.under_pledge());
        let position = ranked
            .iter()
            .position(|(_, other)| outranks(key, *other))
            .unwrap_or(ranked.len());
        ranked.insert(position, (child, key));
    }
    ranked.into_iter().map(|(node, _)| node).collect()
}

fn outranks(candidate: Option<f64>, other: Option<f64>) -> bool {
    match (candidate, other) {
        (Some(a), Some(b)) => a > b,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{scenario_stats, scenario_tree};
    use gshare_core::{RawCapacityStat, ShareRow};

    fn names(nodes: &[&ShareNode]) -> Vec<String> {
        nodes.iter().map(|n| n.name().to_string()).collect()
    }

    fn tree_of(rows: Vec<ShareRow>) -> AllocationTree {
        let mut tree = AllocationTree::build(&rows, 32).unwrap();
        tree.normalize();
        tree
    }

    #[test]
    fn scenario_ranking() {
        let tree = scenario_tree();
        let dist = Distribution::compute(&tree, &scenario_stats());
        // Derivations: 2 - 0 = 2, Production: 8 - 10 = -2.
        // Analysis: 4 - 5 = -1, Test: 4 - 5 = -1 (tie keeps tree order).
        assert_eq!(
            names(&sorted_leaves(&tree, &dist)),
            vec!["Derivations", "Analysis", "Test"]
        );
    }

    #[test]
    fn higher_levels_dominate() {
        // Big: 2 leaves, one heavily under-pledged. Small: one leaf slightly under.
        let tree = tree_of(vec![
            ShareRow::new("Big", 50.0, None),
            ShareRow::new("Small", 50.0, None),
            ShareRow::new("Starved", 50.0, Some("Big")),
            ShareRow::new("Greedy", 50.0, Some("Big")),
            ShareRow::new("Modest", 100.0, Some("Small")),
        ]);
        let stats = vec![
            RawCapacityStat::new("Greedy", "running", 60.0),
            RawCapacityStat::new("Modest", "running", 40.0),
        ];
        let dist = Distribution::compute(&tree, &stats);
        // Big: 50 - 60 = -10, Small: 50 - 40 = +10 → Small first.
        // Starved alone has under-pledge 25, more than Modest's 10, but
        // it still comes after Small's whole block.
        assert_eq!(
            names(&sorted_leaves(&tree, &dist)),
            vec!["Modest", "Starved", "Greedy"]
        );
    }

    #[test]
    fn empty_distribution_keeps_tree_order() {
        let tree = scenario_tree();
        let dist = Distribution::default();
        assert_eq!(
            names(&sorted_leaves(&tree, &dist)),
            vec!["Analysis", "Test", "Derivations"]
        );
    }

    #[test]
    fn missing_entries_sink_to_the_back() {
        let tree = tree_of(vec![
            ShareRow::new("A", 1.0, None),
            ShareRow::new("B", 1.0, None),
            ShareRow::new("C", 1.0, None),
        ]);
        let full = Distribution::compute(&tree, &[RawCapacityStat::new("B", "running", 3.0)]);
        let mut partial = full.clone();
        partial.remove_for_test("A");

        // A: 1 - 0 = 1, B: 1 - 3 = -2, C: 1 - 0 = 1.
        assert_eq!(names(&sorted_leaves(&tree, &full)), vec!["A", "C", "B"]);
        assert_eq!(names(&sorted_leaves(&tree, &partial)), vec!["C", "B", "A"]);
    }

    #[test]
    fn ties_are_stable() {
        let tree = tree_of(vec![
            ShareRow::new("One", 1.0, None),
            ShareRow::new("Two", 1.0, None),
            ShareRow::new("Three", 1.0, None),
        ]);
        let dist = Distribution::compute(&tree, &[]);
        assert_eq!(names(&sorted_leaves(&tree, &dist)), vec!["One", "Two", "Three"]);
    }

    #[test]
    fn every_leaf_appears_once() {
        let tree = scenario_tree();
        let dist = Distribution::compute(&tree, &scenario_stats());
        let mut sorted = names(&sorted_leaves(&tree, &dist));
        let mut leaves = tree.leaf_names();
        sorted.sort();
        leaves.sort();
        assert_eq!(sorted, leaves);
    }
}
