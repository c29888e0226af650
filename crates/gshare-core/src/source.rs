//! Collaborator traits the engine pulls its inputs from.
//!
//! Both are synchronous: implementations own their own timeouts and
//! retries, the engine only sees the final outcome.

use crate::types::{RawCapacityStat, ShareRow};

/// Supplies the share hierarchy one level at a time.
pub trait HierarchySource: Send + Sync {
    /// Rows whose parent is `parent`, or the top-level rows for `None`.
    /// An empty result ends recursion for that branch.
    fn fetch_share_rows(&self, parent: Option<&str>) -> anyhow::Result<Vec<ShareRow>>;
}

/// Supplies the current per-share capacity measurements.
pub trait UsageSource: Send + Sync {
    fn fetch_raw_capacity_stats(&self) -> anyhow::Result<Vec<RawCapacityStat>>;
}

/// A fixed list of rows is a hierarchy source; children are filtered by
/// their `parent` field, in list order.
impl HierarchySource for Vec<ShareRow> {
    fn fetch_share_rows(&self, parent: Option<&str>) -> anyhow::Result<Vec<ShareRow>> {
        Ok(self
            .iter()
            .filter(|row| row.parent.as_deref() == parent)
            .cloned()
            .collect())
    }
}

impl UsageSource for Vec<RawCapacityStat> {
    fn fetch_raw_capacity_stats(&self) -> anyhow::Result<Vec<RawCapacityStat>> {
        Ok(self.clone())
    }
}
