//! Error types for store operations.

use thiserror::Error;

/// Boxed error produced by user code (configuration or update functions).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The configuration function failed; no store was produced.
    #[error("store configuration failed: {0}")]
    Configure(#[source] BoxError),

    /// An update function failed; the snapshot was left unchanged.
    #[error("state update failed: {0}")]
    Update(#[source] BoxError),

    /// A handle was used while the configuration function was still running.
    #[error("store is not initialized yet")]
    Uninitialized,

    /// A handle outlived the store it was created for.
    #[error("store has been dropped")]
    Dropped,
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
