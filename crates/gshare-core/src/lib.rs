pub mod config;
pub mod jobs;
pub mod source;
pub mod types;

pub use config::{ApiConfig, EngineConfig, GshareConfig, StoreConfig};
pub use jobs::core_count;
pub use source::{HierarchySource, UsageSource};
pub use types::*;
