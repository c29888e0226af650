//! redb table definitions for the global shares store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized rows).

use redb::TableDefinition;

/// Share hierarchy rows keyed by share name.
pub const SHARES: TableDefinition<&str, &[u8]> = TableDefinition::new("shares");

/// Capacity per share and job status keyed by `{share}:{job_status}`.
pub const JOB_STATS: TableDefinition<&str, &[u8]> = TableDefinition::new("job_stats");
