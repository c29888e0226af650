//! gshare-engine — hierarchical fair-share allocation.
//!
//! Keeps a tree of weighted shares, reconciles it against measured capacity
//! usage, and answers two questions for the scheduler: which leaf share a
//! task belongs to, and which leaf shares are furthest below their pledge.
//!
//! # Architecture
//!
//! ```text
//! ShareEngine
//!   ├── AllocationTree (built once, normalized once, read-only after)
//!   │     └── ShareNode → children, weight, classifier patterns
//!   ├── TaskClassifier (leaf patterns in traversal order)
//!   ├── Arc<Distribution> (swapped on every refresh)
//!   └── UsageSource (raw capacity per share and job status)
//! ```
//!
//! Weights are rewritten by normalization from "percent of parent" into
//! "percent of the whole tree". Pledges are `total executing * weight / 100`
//! per leaf; internal nodes carry the sums of their children.

pub mod classifier;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod node;
pub mod ranker;
pub mod tree;

#[cfg(test)]
mod testing;

pub use classifier::{Classification, TaskClassifier};
pub use distribution::{CapacityTotals, Distribution, ShareUsage};
pub use engine::{EngineStats, ShareEngine};
pub use error::{EngineError, EngineResult};
pub use node::{ShareClassifier, ShareNode, SharePattern};
pub use ranker::sorted_leaves;
pub use tree::AllocationTree;
