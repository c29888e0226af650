//! Shared fixtures for unit tests.

use gshare_core::{RawCapacityStat, ShareRow};

use crate::tree::AllocationTree;

pub(crate) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

fn labelled(name: &str, weight: f64, parent: &str, label: &str) -> ShareRow {
    let mut row = ShareRow::new(name, weight, Some(parent));
    row.source_label = Some(label.to_string());
    row
}

/// `root -> {Production(80): {Analysis(50, "user"), Test(50, "test.*")}, Derivations(20)}`
///
/// Derivations only takes managed GP_PHYS tasks, so nothing here is a wildcard.
pub(crate) fn scenario_rows() -> Vec<ShareRow> {
    let mut derivations = ShareRow::new("Derivations", 20.0, None);
    derivations.source_label = Some("managed".to_string());
    derivations.working_group = Some("GP_PHYS".to_string());
    vec![
        ShareRow::new("Production", 80.0, None),
        derivations,
        labelled("Analysis", 50.0, "Production", "user"),
        labelled("Test", 50.0, "Production", "test.*"),
    ]
}

pub(crate) fn scenario_tree() -> AllocationTree {
    let mut tree = AllocationTree::build(&scenario_rows(), 32).unwrap();
    tree.normalize();
    tree
}

pub(crate) fn scenario_stats() -> Vec<RawCapacityStat> {
    vec![
        RawCapacityStat::new("Analysis", "activated", 10.0),
        RawCapacityStat::new("Analysis", "running", 5.0),
        RawCapacityStat::new("Test", "holding", 5.0),
    ]
}
