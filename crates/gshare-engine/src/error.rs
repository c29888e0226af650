//! Engine error types.

use thiserror::Error;

/// Errors that can occur while building or refreshing the share engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The share hierarchy is malformed. Fatal at startup.
    #[error("invalid share configuration: {0}")]
    Configuration(String),

    /// The usage statistics could not be fetched. The previous snapshot is kept.
    #[error("usage data unavailable: {0}")]
    DataUnavailable(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
