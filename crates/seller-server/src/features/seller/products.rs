//! Product list (`/v3/product/list`)

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{query_builder::Separated, Postgres};

use super::fetch::{self, FetchError};
use super::observer::PipelineEvent;
use super::request;
use super::store::{ImportRow, Owned, RowBatch};
use super::{Resource, SellerContext};
use crate::marketplace::{ApiAuth, Credentials};

pub const PATH: &str = "/v3/product/list";

const DEFAULT_LIMIT: u32 = 100;
const DEFAULT_VISIBILITY: &str = "ALL";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilterRequest {
    pub offer_id: Option<Vec<String>>,
    pub product_id: Option<Vec<Value>>,
    pub visibility: Option<String>,
}

/// Filter fields may come top-level or nested under `filter`; top-level wins
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductRequest {
    pub offer_id: Option<Vec<String>>,
    pub product_id: Option<Vec<Value>>,
    pub visibility: Option<String>,
    pub last_id: Option<String>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub filter: ProductFilterRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductFilter {
    pub offer_id: Vec<String>,
    pub product_id: Vec<Value>,
    pub visibility: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductQuery {
    pub filter: ProductFilter,
    pub last_id: String,
    pub limit: u32,
}

pub fn resolve(request: ProductRequest) -> ProductQuery {
    let filter = request.filter;
    ProductQuery {
        filter: ProductFilter {
            offer_id: request::list(request.offer_id.or(filter.offer_id), Vec::new),
            product_id: request::list(request.product_id.or(filter.product_id), Vec::new),
            visibility: request::text(
                request.visibility.or(filter.visibility),
                DEFAULT_VISIBILITY,
            ),
        },
        last_id: request::text(request.last_id, ""),
        limit: request::count(request.limit, DEFAULT_LIMIT),
    }
}

#[derive(Debug, Deserialize)]
struct ProductPage {
    #[serde(default)]
    items: Vec<ProductItem>,
    #[serde(default)]
    last_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductItem {
    pub product_id: i64,
    pub offer_id: String,
    pub has_fbo_stocks: bool,
    pub has_fbs_stocks: bool,
    pub archived: bool,
    pub is_discounted: bool,
    pub quants: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRow {
    pub product_id: i64,
    pub offer_id: String,
    pub has_fbo_stocks: bool,
    pub has_fbs_stocks: bool,
    pub archived: bool,
    pub is_discounted: bool,
    pub quants: String,
}

pub fn reshape(items: Vec<ProductItem>) -> seller_common::Result<Vec<ProductRow>> {
    items
        .into_iter()
        .map(|item| {
            Ok(ProductRow {
                quants: seller_common::encode_opaque(&item.quants)?,
                product_id: item.product_id,
                offer_id: item.offer_id,
                has_fbo_stocks: item.has_fbo_stocks,
                has_fbs_stocks: item.has_fbs_stocks,
                archived: item.archived,
                is_discounted: item.is_discounted,
            })
        })
        .collect()
}

/// First page, then at most one more page when the cursor is set
async fn fetch_pages(
    ctx: &SellerContext,
    auth: &ApiAuth,
    mut query: ProductQuery,
) -> Result<Vec<ProductItem>, FetchError> {
    let resource = Resource::Products;
    let first: ProductPage = ctx.marketplace.post(PATH, auth, &query).await?;
    ctx.observer.on_event(PipelineEvent::PageFetched {
        resource,
        page: 1,
        items: first.items.len(),
    });

    let mut items = first.items;
    if !first.last_id.is_empty() {
        query.last_id = first.last_id;
        let next: ProductPage = ctx.marketplace.post(PATH, auth, &query).await?;
        ctx.observer.on_event(PipelineEvent::PageFetched {
            resource,
            page: 2,
            items: next.items.len(),
        });
        items.extend(next.items);
    }

    Ok(items)
}

pub async fn fetch(
    ctx: &SellerContext,
    owner_id: i64,
    credentials: &Credentials,
    request: ProductRequest,
) -> Result<Vec<ProductRow>, FetchError> {
    let resource = Resource::Products;
    let auth = fetch::authorize(ctx, resource, owner_id, credentials).await?;
    let query = resolve(request);

    ctx.observer.on_event(PipelineEvent::FetchStarted { resource });
    let outcome = match fetch_pages(ctx, &auth, query).await {
        Ok(items) => reshape(items).map_err(FetchError::from),
        Err(err) => Err(err),
    };

    match outcome {
        Ok(rows) => {
            ctx.observer.on_event(PipelineEvent::Reshaped {
                resource,
                rows: rows.len(),
            });
            Ok(rows)
        },
        Err(err) => Err(fetch::abort(ctx, resource, owner_id, err).await),
    }
}

impl ImportRow for ProductRow {
    const RESOURCE: Resource = Resource::Products;
    const COLUMNS: &'static [&'static str] = &[
        "product_id",
        "offer_id",
        "has_fbo_stocks",
        "has_fbs_stocks",
        "archived",
        "is_discounted",
        "quants",
    ];

    fn bind_values(&self, row: &mut Separated<'_, 'static, Postgres, &'static str>) {
        row.push_bind(self.product_id)
            .push_bind(self.offer_id.clone())
            .push_bind(self.has_fbo_stocks)
            .push_bind(self.has_fbs_stocks)
            .push_bind(self.archived)
            .push_bind(self.is_discounted)
            .push_bind(self.quants.clone());
    }

    fn into_batch(rows: Vec<Owned<Self>>) -> RowBatch {
        RowBatch::Products(rows)
    }
}
