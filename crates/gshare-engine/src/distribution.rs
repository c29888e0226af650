//! Usage distribution — queued, executing, and pledged capacity per share.
//!
//! A [`Distribution`] is computed wholesale from one batch of raw statistics
//! and never modified afterwards. Leaf entries come from the measurements,
//! pledges from the leaf weights, and every internal node gets the sum of
//! its children.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use gshare_core::{RawCapacityStat, StatusGroup};

use crate::node::ShareNode;
use crate::tree::AllocationTree;

/// Capacity units attributed to one share.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ShareUsage {
    pub queued: f64,
    pub executing: f64,
    pub pledged: f64,
}

impl ShareUsage {
    /// Pledged minus executing. Positive means the share gets less than it is owed.
    pub fn under_pledge(&self) -> f64 {
        self.pledged - self.executing
    }

    fn accumulate(&mut self, other: &ShareUsage) {
        self.queued += other.queued;
        self.executing += other.executing;
        self.pledged += other.pledged;
    }
}

/// Totals over the raw measurement, by status group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CapacityTotals {
    pub queued: f64,
    pub executing: f64,
    /// Capacity in job states that count as neither queued nor executing.
    pub ignored: f64,
}

/// Point-in-time usage for every share in the tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Distribution {
    shares: BTreeMap<String, ShareUsage>,
    totals: CapacityTotals,
}

impl Distribution {
    /// Compute the distribution of `stats` over a normalized `tree`.
    ///
    /// Rows for shares the tree does not know are kept (and count towards
    /// the executing total) but are not aggregated into any parent. Rows
    /// with a negative or non-finite capacity are dropped.
    pub fn compute(tree: &AllocationTree, stats: &[RawCapacityStat]) -> Self {
        let mut shares: BTreeMap<String, ShareUsage> = BTreeMap::new();
        let mut totals = CapacityTotals::default();

        for stat in stats {
            if !stat.capacity_units.is_finite() || stat.capacity_units < 0.0 {
                warn!(
                    share = %stat.share,
                    job_status = %stat.job_status,
                    capacity = stat.capacity_units,
                    "skipping invalid capacity measurement"
                );
                continue;
            }
            match StatusGroup::from_job_status(&stat.job_status) {
                StatusGroup::Queued => {
                    shares.entry(stat.share.clone()).or_default().queued += stat.capacity_units;
                    totals.queued += stat.capacity_units;
                }
                StatusGroup::Executing => {
                    shares.entry(stat.share.clone()).or_default().executing +=
                        stat.capacity_units;
                    totals.executing += stat.capacity_units;
                }
                StatusGroup::Ignore => totals.ignored += stat.capacity_units,
            }
        }

        for leaf in tree.leaves() {
            shares.entry(leaf.name().to_string()).or_default().pledged =
                totals.executing * leaf.weight() / 100.0;
        }

        aggregate(tree.root(), &mut shares);

        debug!(
            shares = shares.len(),
            queued = totals.queued,
            executing = totals.executing,
            ignored = totals.ignored,
            "usage distribution computed"
        );
        Self { shares, totals }
    }

    pub fn get(&self, share: &str) -> Option<&ShareUsage> {
        self.shares.get(share)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ShareUsage)> {
        self.shares.iter().map(|(name, usage)| (name.as_str(), usage))
    }

    pub fn totals(&self) -> &CapacityTotals {
        &self.totals
    }

    pub fn len(&self) -> usize {
        self.shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }
}

#[cfg(test)]
impl Distribution {
    pub(crate) fn remove_for_test(&mut self, share: &str) {
        self.shares.remove(share);
    }
}

/// Write the sum of each internal node's children into `shares`, bottom-up,
/// and return the node's own usage.
fn aggregate(node: &ShareNode, shares: &mut BTreeMap<String, ShareUsage>) -> ShareUsage {
    if node.is_leaf() {
        return shares.get(node.name()).copied().unwrap_or_default();
    }
    let mut sum = ShareUsage::default();
    for child in node.children() {
        sum.accumulate(&aggregate(child, shares));
    }
    shares.insert(node.name().to_string(), sum);
    sum
}
