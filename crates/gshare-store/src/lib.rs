//! gshare-store — embedded store for the global shares engine.
//!
//! Backed by [redb](https://docs.rs/redb). Holds the two inputs the engine
//! reads: the share hierarchy and the per-share job capacity statistics.
//! `StateStore` implements both `HierarchySource` and `UsageSource`.
//!
//! # Architecture
//!
//! All rows are JSON-serialized into redb's `&[u8]` value columns. Shares are
//! keyed by name, statistics by `{share}:{job_status}`. Iteration follows key
//! order, so the hierarchy is always returned in the same order.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod seed;
pub mod store;
pub mod tables;

pub use error::{StateError, StateResult};
pub use seed::{JobRecord, SeedFile, SeedSummary};
pub use store::StateStore;
