//! Feature modules implementing the seller sync API
//!
//! Each feature is a vertical slice with its own routes and state.
//!
//! # Features
//!
//! - **seller**: marketplace ingestion pipelines (analytics, stock, transactions, products)
//! - **export**: spreadsheet export of caller rows or imported datasets

pub mod export;
pub mod seller;

use axum::Router;

use export::ExportService;
use seller::SellerContext;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// Marketplace client, journal, store and observer used by the pipelines
    pub seller: SellerContext,
    /// Spreadsheet export collaborators
    pub export: ExportService,
}

/// Creates the main API router with all feature routes mounted
///
/// - `/seller` - fetch and import marketplace data
/// - `/export` - spreadsheet export
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .nest("/seller", seller::seller_routes().with_state(state.seller))
        .nest("/export", export::export_routes().with_state(state.export))
}
