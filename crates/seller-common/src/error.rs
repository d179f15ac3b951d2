//! Error types shared across seller-sync crates

use thiserror::Error;

/// Result type alias for shared operations
pub type Result<T> = std::result::Result<T, SellerError>;

/// Errors produced by the shared utilities
#[derive(Error, Debug)]
pub enum SellerError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
