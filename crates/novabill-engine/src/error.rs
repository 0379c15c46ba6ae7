//! # Engine Error Types
//!
//! The engine surfaces two failure families: domain failures from
//! `novabill-core` and persistence failures from the [`Store`] backend.
//!
//! [`Store`]: crate::store::Store

use thiserror::Error;

use crate::store::StoreError;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors produced by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A domain rule rejected the operation (unknown item, insufficient
    /// stock, lifecycle violation, validation failure, busy).
    #[error(transparent)]
    Core(#[from] novabill_core::CoreError),

    /// The persistence backend failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl EngineError {
    /// True when a retry without any change to the request might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Core(novabill_core::CoreError::Busy))
    }
}
