//! StateStore — redb-backed persistence for shares and job statistics.
//!
//! Provides typed CRUD operations over share rows and per-share capacity
//! statistics. All values are JSON-serialized into redb's `&[u8]` value
//! columns. The store supports both on-disk and in-memory backends (the
//! latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use gshare_core::{HierarchySource, RawCapacityStat, ShareRow, UsageSource};

use crate::error::{StateError, StateResult};
use crate::tables::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(SHARES).map_err(map_err!(Table))?;
        txn.open_table(JOB_STATS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Shares ─────────────────────────────────────────────────────

    /// Insert or update a share row.
    pub fn put_share(&self, row: &ShareRow) -> StateResult<()> {
        let value = serde_json::to_vec(row).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(SHARES).map_err(map_err!(Table))?;
            table
                .insert(row.name.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(name = %row.name, "share stored");
        Ok(())
    }

    /// Get a share row by name.
    pub fn get_share(&self, name: &str) -> StateResult<Option<ShareRow>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(SHARES).map_err(map_err!(Table))?;
        match table.get(name).map_err(map_err!(Read))? {
            Some(guard) => {
                let row: ShareRow =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(row))
            }
            None => Ok(None),
        }
    }

    /// List all share rows in name order.
    pub fn list_shares(&self) -> StateResult<Vec<ShareRow>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(SHARES).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let row: ShareRow =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(row);
        }
        Ok(results)
    }

    /// List the rows whose parent is `parent` (top-level rows for `None`).
    pub fn list_child_shares(&self, parent: Option<&str>) -> StateResult<Vec<ShareRow>> {
        let rows = self.list_shares()?;
        Ok(rows
            .into_iter()
            .filter(|row| row.parent.as_deref() == parent)
            .collect())
    }

    /// Delete a share row by name. Returns true if it existed.
    pub fn delete_share(&self, name: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(SHARES).map_err(map_err!(Table))?;
            existed = table.remove(name).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%name, existed, "share deleted");
        Ok(existed)
    }

    // ── Job statistics ─────────────────────────────────────────────

    /// Insert or replace the capacity recorded for a share and job status.
    pub fn put_job_stat(&self, stat: &RawCapacityStat) -> StateResult<()> {
        let key = stat.table_key();
        let value = serde_json::to_vec(stat).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(JOB_STATS).map_err(map_err!(Table))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Add capacity to a share and job status, creating the row if absent.
    /// Returns the new total.
    pub fn add_job_capacity(
        &self,
        share: &str,
        job_status: &str,
        capacity_units: f64,
    ) -> StateResult<f64> {
        let mut stat = RawCapacityStat::new(share, job_status, capacity_units);
        let key = stat.table_key();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(JOB_STATS).map_err(map_err!(Table))?;
            let existing = match table.get(key.as_str()).map_err(map_err!(Read))? {
                Some(guard) => {
                    let prev: RawCapacityStat =
                        serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                    prev.capacity_units
                }
                None => 0.0,
            };
            stat.capacity_units += existing;
            let value = serde_json::to_vec(&stat).map_err(map_err!(Serialize))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(stat.capacity_units)
    }

    /// List every statistics row in key order.
    pub fn list_job_stats(&self) -> StateResult<Vec<RawCapacityStat>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(JOB_STATS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let stat: RawCapacityStat =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(stat);
        }
        Ok(results)
    }

    /// Delete all statistics rows. Returns number deleted.
    pub fn clear_job_stats(&self) -> StateResult<u32> {
        // Collect keys in a read transaction first.
        let keys: Vec<String> = {
            let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
            let table = txn.open_table(JOB_STATS).map_err(map_err!(Table))?;
            table
                .iter()
                .map_err(map_err!(Read))?
                .filter_map(|entry| {
                    let (key, _) = entry.ok()?;
                    Some(key.value().to_string())
                })
                .collect()
        };
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let count = keys.len() as u32;
        {
            let mut table = txn.open_table(JOB_STATS).map_err(map_err!(Table))?;
            for key in &keys {
                table.remove(key.as_str()).map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(count, "job statistics cleared");
        Ok(count)
    }
}

impl HierarchySource for StateStore {
    fn fetch_share_rows(&self, parent: Option<&str>) -> anyhow::Result<Vec<ShareRow>> {
        Ok(self.list_child_shares(parent)?)
    }
}

impl UsageSource for StateStore {
    fn fetch_raw_capacity_stats(&self) -> anyhow::Result<Vec<RawCapacityStat>> {
        Ok(self.list_job_stats()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_share(name: &str, weight: f64, parent: Option<&str>) -> ShareRow {
        ShareRow::new(name, weight, parent)
    }

    // ── Shares ─────────────────────────────────────────────────────

    #[test]
    fn share_put_and_get() {
        let store = StateStore::open_in_memory().unwrap();
        let mut row = test_share("Analysis", 50.0, Some("Production"));
        row.source_label = Some("user".to_string());
        store.put_share(&row).unwrap();

        let fetched = store.get_share("Analysis").unwrap().unwrap();
        assert_eq!(fetched, row);
    }

    #[test]
    fn share_get_nonexistent_returns_none() {
        let store = StateStore::open_in_memory().unwrap();
        assert!(store.get_share("nope").unwrap().is_none());
    }

    #[test]
    fn share_update_in_place() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_share(&test_share("Test", 10.0, None)).unwrap();
        store.put_share(&test_share("Test", 30.0, None)).unwrap();

        let all = store.list_shares().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].weight, 30.0);
    }

    #[test]
    fn child_listing_filters_by_parent() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_share(&test_share("Production", 80.0, None)).unwrap();
        store.put_share(&test_share("Derivations", 20.0, None)).unwrap();
        store.put_share(&test_share("Test", 50.0, Some("Production"))).unwrap();
        store.put_share(&test_share("Analysis", 50.0, Some("Production"))).unwrap();

        let top: Vec<String> = store
            .list_child_shares(None)
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(top, vec!["Derivations", "Production"]);

        let children: Vec<String> = store
            .fetch_share_rows(Some("Production"))
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(children, vec!["Analysis", "Test"]);

        assert!(store.fetch_share_rows(Some("Analysis")).unwrap().is_empty());
    }

    #[test]
    fn share_delete() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_share(&test_share("Test", 10.0, None)).unwrap();
        assert!(store.delete_share("Test").unwrap());
        assert!(!store.delete_share("Test").unwrap());
        assert!(store.list_shares().unwrap().is_empty());
    }

    // ── Job statistics ─────────────────────────────────────────────

    #[test]
    fn job_stat_put_replaces() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_job_stat(&RawCapacityStat::new("Analysis", "running", 5.0)).unwrap();
        store.put_job_stat(&RawCapacityStat::new("Analysis", "running", 7.0)).unwrap();
        store.put_job_stat(&RawCapacityStat::new("Analysis", "activated", 10.0)).unwrap();

        let stats = store.fetch_raw_capacity_stats().unwrap();
        assert_eq!(
            stats,
            vec![
                RawCapacityStat::new("Analysis", "activated", 10.0),
                RawCapacityStat::new("Analysis", "running", 7.0),
            ]
        );
    }

    #[test]
    fn job_capacity_accumulates() {
        let store = StateStore::open_in_memory().unwrap();
        assert_eq!(store.add_job_capacity("Test", "holding", 2.5).unwrap(), 2.5);
        assert_eq!(store.add_job_capacity("Test", "holding", 4.0).unwrap(), 6.5);

        let stats = store.list_job_stats().unwrap();
        assert_eq!(stats, vec![RawCapacityStat::new("Test", "holding", 6.5)]);
    }

    #[test]
    fn job_stats_clear() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_job_stat(&RawCapacityStat::new("A", "running", 1.0)).unwrap();
        store.put_job_stat(&RawCapacityStat::new("B", "running", 1.0)).unwrap();
        assert_eq!(store.clear_job_stats().unwrap(), 2);
        assert!(store.list_job_stats().unwrap().is_empty());
        assert_eq!(store.clear_job_stats().unwrap(), 0);
    }

    // ── Persistence (on-disk) ──────────────────────────────────────

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.redb");

        {
            let store = StateStore::open(&db_path).unwrap();
            store.put_share(&test_share("Production", 80.0, None)).unwrap();
            store.put_job_stat(&RawCapacityStat::new("Production", "running", 3.0)).unwrap();
        }

        // Reopen the same database file.
        let store = StateStore::open(&db_path).unwrap();
        assert_eq!(store.get_share("Production").unwrap().unwrap().weight, 80.0);
        assert_eq!(store.list_job_stats().unwrap().len(), 1);
    }

    // ── Edge cases ─────────────────────────────────────────────────

    #[test]
    fn empty_store_operations() {
        let store = StateStore::open_in_memory().unwrap();

        assert!(store.list_shares().unwrap().is_empty());
        assert!(store.fetch_share_rows(None).unwrap().is_empty());
        assert!(store.fetch_raw_capacity_stats().unwrap().is_empty());
        assert!(!store.delete_share("nope").unwrap());
    }
}
