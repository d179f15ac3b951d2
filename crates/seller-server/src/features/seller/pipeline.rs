//! Pipeline orchestration: fetch, then import, one resource at a time

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::analytics::{self, AnalyticsRequest, AnalyticsRow};
use super::fetch::FetchError;
use super::importer::{self, ImportError};
use super::products::{self, ProductRequest, ProductRow};
use super::stock::{self, StockRequest, StockRow};
use super::store::ImportRow;
use super::transactions::{self, TransactionRequest, TransactionRow};
use super::{Resource, SellerContext};
use crate::marketplace::Credentials;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Import(#[from] ImportError),
}

/// A resource pipeline: partial request in, reshaped rows out
#[async_trait]
pub trait Pipeline: Send + Sync + 'static {
    type Request: DeserializeOwned + Default + Send + 'static;
    type Row: ImportRow;

    fn resource() -> Resource {
        <Self::Row as ImportRow>::RESOURCE
    }

    async fn fetch(
        ctx: &SellerContext,
        owner_id: i64,
        credentials: &Credentials,
        request: Self::Request,
    ) -> Result<Vec<Self::Row>, FetchError>;
}

pub struct Analytics;
pub struct Stock;
pub struct Transactions;
pub struct Products;

#[async_trait]
impl Pipeline for Analytics {
    type Request = AnalyticsRequest;
    type Row = AnalyticsRow;

    async fn fetch(
        ctx: &SellerContext,
        owner_id: i64,
        credentials: &Credentials,
        request: AnalyticsRequest,
    ) -> Result<Vec<AnalyticsRow>, FetchError> {
        analytics::fetch(ctx, owner_id, credentials, request).await
    }
}

#[async_trait]
impl Pipeline for Stock {
    type Request = StockRequest;
    type Row = StockRow;

    async fn fetch(
        ctx: &SellerContext,
        owner_id: i64,
        credentials: &Credentials,
        request: StockRequest,
    ) -> Result<Vec<StockRow>, FetchError> {
        stock::fetch(ctx, owner_id, credentials, request).await
    }
}

#[async_trait]
impl Pipeline for Transactions {
    type Request = TransactionRequest;
    type Row = TransactionRow;

    async fn fetch(
        ctx: &SellerContext,
        owner_id: i64,
        credentials: &Credentials,
        request: TransactionRequest,
    ) -> Result<Vec<TransactionRow>, FetchError> {
        transactions::fetch(ctx, owner_id, credentials, request).await
    }
}

#[async_trait]
impl Pipeline for Products {
    type Request = ProductRequest;
    type Row = ProductRow;

    async fn fetch(
        ctx: &SellerContext,
        owner_id: i64,
        credentials: &Credentials,
        request: ProductRequest,
    ) -> Result<Vec<ProductRow>, FetchError> {
        products::fetch(ctx, owner_id, credentials, request).await
    }
}

/// Fetch one resource and import the result; returns the number of rows written
pub async fn fetch_and_import<P: Pipeline>(
    ctx: &SellerContext,
    owner_id: i64,
    credentials: &Credentials,
    request: P::Request,
) -> Result<u64, PipelineError> {
    let rows = P::fetch(ctx, owner_id, credentials, request).await?;
    Ok(importer::import_rows(ctx, owner_id, rows).await?)
}
