//! ShareEngine — the shared, long-lived view over the share tree.
//!
//! The tree and classifier are fixed after initialization. The usage
//! distribution is an `Arc<Distribution>` swapped wholesale on refresh, so
//! readers holding an older snapshot keep a consistent view. Refreshes are
//! serialized: a second caller waits for the one in flight to finish, then
//! fetches again itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, RwLock, watch};
use tracing::{debug, info, warn};

use gshare_core::{EngineConfig, HierarchySource, TaskDescriptor, UNDEFINED_SHARE, UsageSource};

use crate::classifier::{Classification, TaskClassifier};
use crate::distribution::Distribution;
use crate::error::{EngineError, EngineResult};
use crate::ranker;
use crate::tree::AllocationTree;

/// Counters kept by the engine since startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct EngineStats {
    pub refreshes: u64,
    pub refresh_failures: u64,
    pub unclassified: u64,
}

pub struct ShareEngine {
    tree: AllocationTree,
    classifier: TaskClassifier,
    usage: Arc<dyn UsageSource>,
    snapshot: RwLock<Arc<Distribution>>,
    /// Held for the whole fetch-compute-swap of a refresh.
    refresh_gate: Mutex<()>,
    refreshes: AtomicU64,
    refresh_failures: AtomicU64,
    unclassified: AtomicU64,
}

impl ShareEngine {
    /// Load and normalize the tree, then take a first usage snapshot.
    ///
    /// Tree errors are fatal. If the first refresh fails the engine starts
    /// from an all-zero distribution and the next refresh fills it in.
    pub async fn initialize(
        hierarchy: &dyn HierarchySource,
        usage: Arc<dyn UsageSource>,
        config: &EngineConfig,
    ) -> EngineResult<Self> {
        let tree = AllocationTree::build(hierarchy, config.max_depth)?;
        let engine = Self::from_tree(tree, usage);
        if let Err(e) = engine.refresh().await {
            warn!(error = %e, "initial usage refresh failed, starting from empty distribution");
        }
        info!(leaves = engine.tree.leaves().len(), "share engine ready");
        Ok(engine)
    }

    /// Wrap an already-built tree, normalizing it if that has not happened yet.
    /// The distribution starts out all-zero.
    pub fn from_tree(mut tree: AllocationTree, usage: Arc<dyn UsageSource>) -> Self {
        if !tree.is_normalized() {
            tree.normalize();
        }
        let classifier = TaskClassifier::new(&tree);
        let empty = Arc::new(Distribution::compute(&tree, &[]));
        Self {
            tree,
            classifier,
            usage,
            snapshot: RwLock::new(empty),
            refresh_gate: Mutex::new(()),
            refreshes: AtomicU64::new(0),
            refresh_failures: AtomicU64::new(0),
            unclassified: AtomicU64::new(0),
        }
    }

    pub fn tree(&self) -> &AllocationTree {
        &self.tree
    }

    pub fn leaf_names(&self) -> Vec<String> {
        self.tree.leaf_names()
    }

    /// The most recently computed distribution.
    pub async fn distribution(&self) -> Arc<Distribution> {
        Arc::clone(&*self.snapshot.read().await)
    }

    /// Fetch fresh statistics and replace the current distribution.
    ///
    /// On failure the current distribution is left as it was.
    pub async fn refresh(&self) -> EngineResult<Arc<Distribution>> {
        let _gate = self.refresh_gate.lock().await;

        let usage = Arc::clone(&self.usage);
        let fetched = tokio::task::spawn_blocking(move || usage.fetch_raw_capacity_stats())
            .await
            .map_err(|e| EngineError::DataUnavailable(format!("usage fetch task failed: {e}")))
            .and_then(|r| r.map_err(|e| EngineError::DataUnavailable(format!("{e:#}"))));

        let stats = match fetched {
            Ok(stats) => stats,
            Err(e) => {
                self.refresh_failures.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "usage refresh failed, keeping previous distribution");
                return Err(e);
            }
        };

        let distribution = Arc::new(Distribution::compute(&self.tree, &stats));
        *self.snapshot.write().await = Arc::clone(&distribution);
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        debug!(rows = stats.len(), "usage distribution replaced");
        Ok(distribution)
    }

    /// Leaf names, most under-pledged branches first.
    ///
    /// With `refresh`, statistics are fetched first; if that fails the
    /// previous distribution is used.
    pub async fn sorted_leaves(&self, refresh: bool) -> Vec<String> {
        let distribution = if refresh {
            match self.refresh().await {
                Ok(distribution) => distribution,
                Err(_) => self.distribution().await,
            }
        } else {
            self.distribution().await
        };
        ranker::sorted_leaves(&self.tree, &distribution)
            .into_iter()
            .map(|node| node.name().to_string())
            .collect()
    }

    /// The leaf share a task belongs to, or `"Undefined"`.
    pub fn classify(&self, task: &TaskDescriptor) -> &str {
        match self.classifier.classify(task) {
            Classification::Share(name) => name,
            Classification::Unclassified => {
                self.unclassified.fetch_add(1, Ordering::Relaxed);
                warn!(
                    source_label = %task.source_label,
                    working_group = %task.working_group,
                    campaign = %task.campaign,
                    processing_type = %task.processing_type,
                    "no share matches task"
                );
                UNDEFINED_SHARE
            }
        }
    }

    pub fn is_valid_leaf(&self, name: &str) -> bool {
        self.classifier.is_valid_leaf(name)
    }

    pub fn unclassified_count(&self) -> u64 {
        self.unclassified.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            refreshes: self.refreshes.load(Ordering::Relaxed),
            refresh_failures: self.refresh_failures.load(Ordering::Relaxed),
            unclassified: self.unclassified.load(Ordering::Relaxed),
        }
    }

    /// Refresh every `interval` until the shutdown signal fires.
    pub async fn run(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = interval.as_secs(), "usage refresh loop started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    // Failures are logged inside refresh; the loop keeps going.
                    let _ = self.refresh().await;
                }
                _ = shutdown.changed() => {
                    info!("usage refresh loop shutting down");
                    break;
                }
            }
        }
    }
}
