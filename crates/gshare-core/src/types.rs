//! Shared types used across the global shares crates.

use serde::{Deserialize, Serialize};

/// Name returned by the classifier when no leaf share matches a task.
pub const UNDEFINED_SHARE: &str = "Undefined";

/// Name of the synthetic node that owns every top-level share.
pub const ROOT_SHARE: &str = "root";

/// One row of the share hierarchy as supplied by the hierarchy store.
///
/// `weight` is a percentage of the parent's allocation. The four pattern
/// fields are optional regular expressions; `None` matches anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareRow {
    pub name: String,
    pub weight: f64,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub source_label: Option<String>,
    #[serde(default)]
    pub working_group: Option<String>,
    #[serde(default)]
    pub campaign: Option<String>,
    #[serde(default)]
    pub processing_type: Option<String>,
}

impl ShareRow {
    /// A row with no classifier patterns.
    pub fn new(name: &str, weight: f64, parent: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            weight,
            parent: parent.map(str::to_string),
            source_label: None,
            working_group: None,
            campaign: None,
            processing_type: None,
        }
    }
}

/// Capacity measured for one share in one raw job state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCapacityStat {
    pub share: String,
    /// Store-side job state, e.g. `activated` or `running`.
    pub job_status: String,
    /// Normalized compute capacity (HS06).
    pub capacity_units: f64,
}

impl RawCapacityStat {
    pub fn new(share: &str, job_status: &str, capacity_units: f64) -> Self {
        Self {
            share: share.to_string(),
            job_status: job_status.to_string(),
            capacity_units,
        }
    }

    /// Build the composite key for the job statistics table.
    pub fn table_key(&self) -> String {
        format!("{}:{}", self.share, self.job_status)
    }
}

/// Coarse state a raw job status is folded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusGroup {
    Queued,
    Executing,
    Ignore,
}

impl StatusGroup {
    /// Map a store-side job status onto its group.
    pub fn from_job_status(status: &str) -> Self {
        match status {
            "activated" => StatusGroup::Queued,
            "sent" | "starting" | "running" | "holding" => StatusGroup::Executing,
            _ => StatusGroup::Ignore,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusGroup::Queued => "queued",
            StatusGroup::Executing => "executing",
            StatusGroup::Ignore => "ignore",
        }
    }
}

/// The four task attributes the classifier looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub source_label: String,
    pub working_group: String,
    pub campaign: String,
    pub processing_type: String,
}

impl TaskDescriptor {
    pub fn new(
        source_label: &str,
        working_group: &str,
        campaign: &str,
        processing_type: &str,
    ) -> Self {
        Self {
            source_label: source_label.to_string(),
            working_group: working_group.to_string(),
            campaign: campaign.to_string(),
            processing_type: processing_type.to_string(),
        }
    }
}
