//! Share nodes and their classifier patterns.

use regex::Regex;
use serde::{Serialize, Serializer};

use gshare_core::{ROOT_SHARE, ShareRow, TaskDescriptor};

use crate::error::{EngineError, EngineResult};

/// A classifier pattern, anchored at the start of the value but not at the end.
///
/// `user` matches `user` and `username`, never `poweruser`.
#[derive(Debug, Clone)]
pub struct SharePattern {
    raw: String,
    regex: Regex,
}

impl SharePattern {
    pub fn compile(raw: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{raw})"))?;
        Ok(Self {
            raw: raw.to_string(),
            regex,
        })
    }

    pub fn matches(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Serialize for SharePattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

/// The four optional patterns a task is matched against. `None` is a wildcard.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ShareClassifier {
    pub source_label: Option<SharePattern>,
    pub working_group: Option<SharePattern>,
    pub campaign: Option<SharePattern>,
    pub processing_type: Option<SharePattern>,
}

impl ShareClassifier {
    fn from_row(row: &ShareRow) -> EngineResult<Self> {
        let compile = |field: &str, raw: &Option<String>| -> EngineResult<Option<SharePattern>> {
            raw.as_deref()
                .map(|p| {
                    SharePattern::compile(p).map_err(|e| {
                        EngineError::Configuration(format!(
                            "share {}: bad {field} pattern {p:?}: {e}",
                            row.name
                        ))
                    })
                })
                .transpose()
        };
        Ok(Self {
            source_label: compile("source_label", &row.source_label)?,
            working_group: compile("working_group", &row.working_group)?,
            campaign: compile("campaign", &row.campaign)?,
            processing_type: compile("processing_type", &row.processing_type)?,
        })
    }

    /// True when every present pattern matches its task field.
    pub fn matches(&self, task: &TaskDescriptor) -> bool {
        field_matches(&self.source_label, &task.source_label)
            && field_matches(&self.working_group, &task.working_group)
            && field_matches(&self.campaign, &task.campaign)
            && field_matches(&self.processing_type, &task.processing_type)
    }

    pub fn is_wildcard(&self) -> bool {
        self.source_label.is_none()
            && self.working_group.is_none()
            && self.campaign.is_none()
            && self.processing_type.is_none()
    }
}

fn field_matches(pattern: &Option<SharePattern>, value: &str) -> bool {
    pattern.as_ref().is_none_or(|p| p.matches(value))
}

/// A node of the allocation tree.
///
/// Owns its children. `parent` is the owning node's name, kept for display
/// and lookups only.
#[derive(Debug, Clone, Serialize)]
pub struct ShareNode {
    pub(crate) name: String,
    pub(crate) weight: f64,
    pub(crate) parent: Option<String>,
    pub(crate) classifier: ShareClassifier,
    pub(crate) children: Vec<ShareNode>,
}

impl ShareNode {
    /// The synthetic root: weight 100, no patterns, no parent.
    pub fn root() -> Self {
        Self {
            name: ROOT_SHARE.to_string(),
            weight: 100.0,
            parent: None,
            classifier: ShareClassifier::default(),
            children: Vec::new(),
        }
    }

    /// Build a childless node from a store row, owned by `parent`.
    pub fn from_row(row: &ShareRow, parent: &str) -> EngineResult<Self> {
        if !row.weight.is_finite() || row.weight < 0.0 {
            return Err(EngineError::Configuration(format!(
                "share {}: weight {} is not a finite non-negative number",
                row.name, row.weight
            )));
        }
        Ok(Self {
            name: row.name.clone(),
            weight: row.weight,
            parent: Some(parent.to_string()),
            classifier: ShareClassifier::from_row(row)?,
            children: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Percent of the whole tree once normalized, percent of the parent before.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn classifier(&self) -> &ShareClassifier {
        &self.classifier
    }

    pub fn children(&self) -> &[ShareNode] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub(crate) fn add_child(&mut self, child: ShareNode) {
        self.children.push(child);
    }

    /// Leaves under this node, depth-first, in child order.
    pub fn leaves(&self) -> Vec<&ShareNode> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, leaves: &mut Vec<&'a ShareNode>) {
        if self.is_leaf() {
            leaves.push(self);
            return;
        }
        for child in &self.children {
            child.collect_leaves(leaves);
        }
    }

    /// Depth-first search for a node by name, this node included.
    pub fn find(&self, name: &str) -> Option<&ShareNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// Number of nodes in this branch, this node included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(ShareNode::node_count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_with_label(name: &str, label: &str) -> ShareRow {
        let mut row = ShareRow::new(name, 10.0, None);
        row.source_label = Some(label.to_string());
        row
    }

    #[test]
    fn pattern_is_prefix_anchored() {
        let p = SharePattern::compile("user").unwrap();
        assert!(p.matches("user"));
        assert!(p.matches("username"));
        assert!(!p.matches("poweruser"));
        assert!(!p.matches(""));
    }

    #[test]
    fn pattern_alternation_stays_anchored() {
        let p = SharePattern::compile("mc|data").unwrap();
        assert!(p.matches("mc16"));
        assert!(p.matches("data18"));
        assert!(!p.matches("xmc16"));
        assert!(!p.matches("xdata"));
    }

    #[test]
    fn regex_pattern_matches() {
        let p = SharePattern::compile("test.*").unwrap();
        assert!(p.matches("test123"));
        assert!(!p.matches("managed"));
    }

    #[test]
    fn wildcard_matches_everything() {
        let node = ShareNode::from_row(&ShareRow::new("Any", 10.0, None), ROOT_SHARE).unwrap();
        assert!(node.classifier().is_wildcard());
        assert!(node.classifier().matches(&TaskDescriptor::default()));
        assert!(
            node.classifier()
                .matches(&TaskDescriptor::new("managed", "GP_PHYS", "mc16", "simul"))
        );
    }

    #[test]
    fn every_present_pattern_must_match() {
        let mut row = row_with_label("Data Derivations", "managed");
        row.working_group = Some("GP_PHYS".to_string());
        row.campaign = Some("data".to_string());
        let node = ShareNode::from_row(&row, ROOT_SHARE).unwrap();

        assert!(
            node.classifier()
                .matches(&TaskDescriptor::new("managed", "GP_PHYS", "data18", "x"))
        );
        assert!(
            !node
                .classifier()
                .matches(&TaskDescriptor::new("managed", "GP_PHYS", "mc16", "x"))
        );
    }

    #[test]
    fn bad_pattern_is_configuration_error() {
        let err = ShareNode::from_row(&row_with_label("Broken", "(unclosed"), ROOT_SHARE).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn invalid_weights_are_rejected() {
        for weight in [-1.0, f64::NAN, f64::INFINITY] {
            let row = ShareRow::new("Bad", weight, None);
            assert!(matches!(
                ShareNode::from_row(&row, ROOT_SHARE),
                Err(EngineError::Configuration(_))
            ));
        }
        assert!(ShareNode::from_row(&ShareRow::new("Zero", 0.0, None), ROOT_SHARE).is_ok());
    }

    #[test]
    fn leaves_are_fresh_per_call() {
        let mut root = ShareNode::root();
        root.add_child(ShareNode::from_row(&ShareRow::new("A", 1.0, None), ROOT_SHARE).unwrap());
        root.add_child(ShareNode::from_row(&ShareRow::new("B", 1.0, None), ROOT_SHARE).unwrap());

        let first: Vec<&str> = root.leaves().iter().map(|n| n.name()).collect();
        let second: Vec<&str> = root.leaves().iter().map(|n| n.name()).collect();
        assert_eq!(first, vec!["A", "B"]);
        assert_eq!(first, second);
        assert_eq!(root.node_count(), 3);
        assert_eq!(root.find("B").unwrap().parent(), Some(ROOT_SHARE));
    }
}
