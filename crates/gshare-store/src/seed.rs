//! Seed file import.
//!
//! A seed file is TOML with three optional arrays:
//!
//! ```toml
//! [[shares]]
//! name = "Production"
//! weight = 80.0
//!
//! [[shares]]
//! name = "Analysis"
//! weight = 50.0
//! parent = "Production"
//! source_label = "user"
//!
//! [[stats]]
//! share = "Analysis"
//! job_status = "running"
//! capacity_units = 5.0
//!
//! [[jobs]]
//! share = "Analysis"
//! job_status = "activated"
//! core_power = 10.0
//! job_metrics = "coreCount=8"
//! ```
//!
//! `stats` rows carry capacity directly; each `jobs` row contributes
//! `core_power * core_count` to its share and status.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use gshare_core::{RawCapacityStat, ShareRow, core_count};

use crate::error::{StateError, StateResult};
use crate::store::StateStore;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub shares: Vec<ShareRow>,
    #[serde(default)]
    pub stats: Vec<RawCapacityStat>,
    #[serde(default)]
    pub jobs: Vec<JobRecord>,
}

/// A single job whose capacity is derived from its core count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub share: String,
    pub job_status: String,
    /// HS06 per core of the worker the job runs on.
    pub core_power: f64,
    #[serde(default)]
    pub actual_core_count: Option<u32>,
    #[serde(default)]
    pub defined_core_count: Option<u32>,
    #[serde(default)]
    pub job_metrics: Option<String>,
}

impl JobRecord {
    pub fn capacity_units(&self) -> f64 {
        let cores = core_count(
            self.actual_core_count,
            self.defined_core_count,
            self.job_metrics.as_deref(),
        );
        self.core_power * f64::from(cores)
    }
}

/// Counts of rows written by an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub shares: usize,
    pub stats: usize,
    pub jobs: usize,
    pub cleared_stats: u32,
}

impl SeedFile {
    pub fn from_file(path: &Path) -> StateResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| StateError::Seed(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> StateResult<Self> {
        toml::from_str(content).map_err(|e| StateError::Seed(e.to_string()))
    }
}

impl StateStore {
    /// Write a seed file into the store.
    ///
    /// Share rows are upserted. With `replace_stats`, existing statistics are
    /// removed first; otherwise `stats` rows overwrite their key and `jobs`
    /// rows add to it.
    pub fn import_seed(&self, seed: &SeedFile, replace_stats: bool) -> StateResult<SeedSummary> {
        let mut summary = SeedSummary::default();
        if replace_stats {
            summary.cleared_stats = self.clear_job_stats()?;
        }
        for row in &seed.shares {
            self.put_share(row)?;
            summary.shares += 1;
        }
        for stat in &seed.stats {
            self.put_job_stat(stat)?;
            summary.stats += 1;
        }
        for job in &seed.jobs {
            self.add_job_capacity(&job.share, &job.job_status, job.capacity_units())?;
            summary.jobs += 1;
        }
        info!(
            shares = summary.shares,
            stats = summary.stats,
            jobs = summary.jobs,
            cleared = summary.cleared_stats,
            "seed imported"
        );
        Ok(summary)
    }
}
