//! Seller Sync common library
//!
//! Shared pieces used by every seller-sync workspace member:
//!
//! - **Error handling**: [`SellerError`] and the [`Result`] alias
//! - **Logging**: `tracing` subscriber setup driven by `LOG_*` variables
//! - **Opaque text**: encoding of nested marketplace structures into text columns

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;
pub mod opaque;

// Re-export commonly used types
pub use error::{Result, SellerError};
pub use opaque::{encode_opaque, NULL_MARKER};
