//! Seller data ingestion
//!
//! Four independent pipelines, one per marketplace resource, all shaped
//! `fetch -> paginate -> reshape -> bulk insert`:
//!
//! - **analytics**: metric series per SKU/day, single page
//! - **stock**: warehouse stock rows, single page
//! - **transactions**: finance operations, paged by `page_count`
//! - **products**: product list, one extra page via the `last_id` cursor
//!
//! Each resource module owns its request resolution (defaults), upstream response
//! types, reshaping and fetch routine. [`importer`] and [`store`] are shared, and
//! [`pipeline`] composes fetch and import.

pub mod analytics;
pub mod fetch;
pub mod importer;
pub mod observer;
pub mod pipeline;
pub mod products;
pub mod request;
pub mod routes;
pub mod stock;
pub mod store;
pub mod transactions;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::journal::ErrorJournal;
use crate::marketplace::MarketplaceClient;

pub use fetch::FetchError;
pub use importer::ImportError;
pub use observer::{PipelineEvent, PipelineObserver, Stage, TracingObserver};
pub use pipeline::{fetch_and_import, Pipeline, PipelineError};
pub use routes::seller_routes;
pub use store::{ImportRow, ImportStore, Owned, PgImportStore, RowBatch, StoreError};

/// Marketplace data category with its own pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Analytics,
    Stock,
    Transactions,
    Products,
}

impl Resource {
    pub const ALL: [Resource; 4] = [
        Resource::Analytics,
        Resource::Stock,
        Resource::Transactions,
        Resource::Products,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Resource::Analytics => "analytics",
            Resource::Stock => "stock",
            Resource::Transactions => "transactions",
            Resource::Products => "products",
        }
    }

    /// Service name written to the error journal
    pub fn service_name(self) -> &'static str {
        match self {
            Resource::Analytics => "Seller/Analytics/Data",
            Resource::Stock => "Seller/Stock/WareHouse",
            Resource::Transactions => "Seller/Transaction",
            Resource::Products => "Seller/ProductList",
        }
    }

    /// Service name for missing-credential records
    pub fn auth_service_name(self) -> &'static str {
        match self {
            Resource::Analytics => "Seller/Analytics",
            other => other.service_name(),
        }
    }

    /// Destination table
    pub fn table(self) -> &'static str {
        match self {
            Resource::Analytics => "seller_analytics",
            Resource::Stock => "seller_stock",
            Resource::Transactions => "seller_transactions",
            Resource::Products => "seller_products",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Collaborators shared by every seller pipeline
#[derive(Clone)]
pub struct SellerContext {
    pub marketplace: MarketplaceClient,
    pub journal: Arc<dyn ErrorJournal>,
    pub store: Arc<dyn ImportStore>,
    pub observer: Arc<dyn PipelineObserver>,
}
