//! Seller Sync server library
//!
//! Pulls seller data from the Ozon Seller API into PostgreSQL and exports
//! imported datasets to Google Sheets.
//!
//! # Overview
//!
//! - **Pipelines**: analytics, stock, transactions and products, each running
//!   `fetch -> paginate -> reshape -> bulk insert` for one owner
//! - **Error journal**: every pipeline failure is written to `journal_errors`
//!   before it propagates
//! - **Export**: append rows to a sheet or overwrite a sheet with a stored dataset
//! - **Configuration**: environment-based, see [`config::Config`]
//!
//! # Example
//!
//! ```no_run
//! use seller_server::config::Config;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     println!("binding {}:{}", config.server.host, config.server.port);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod journal;
pub mod marketplace;
pub mod middleware;

// Re-export commonly used types
pub use error::AppError;
