//! Warehouse stock (`/v2/analytics/stock_on_warehouses`)

use serde::{Deserialize, Serialize};
use sqlx::{query_builder::Separated, Postgres};

use super::fetch::{self, FetchError};
use super::observer::PipelineEvent;
use super::request;
use super::store::{ImportRow, Owned, RowBatch};
use super::{Resource, SellerContext};
use crate::marketplace::Credentials;

pub const PATH: &str = "/v2/analytics/stock_on_warehouses";

const DEFAULT_LIMIT: u32 = 1000;
const DEFAULT_WAREHOUSE_TYPE: &str = "ALL";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StockRequest {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub warehouse_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockQuery {
    pub limit: u32,
    pub offset: u32,
    pub warehouse_type: String,
}

pub fn resolve(request: StockRequest) -> StockQuery {
    StockQuery {
        limit: request::count(request.limit, DEFAULT_LIMIT),
        offset: request.offset.unwrap_or(0),
        warehouse_type: request::text(request.warehouse_type, DEFAULT_WAREHOUSE_TYPE),
    }
}

#[derive(Debug, Deserialize)]
struct StockPage {
    #[serde(default)]
    rows: Vec<StockRow>,
}

/// Stock of one SKU at one warehouse, stored as received
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockRow {
    pub sku: i64,
    pub item_code: String,
    pub item_name: String,
    pub free_to_sell_amount: i64,
    pub promised_amount: i64,
    pub reserved_amount: i64,
    pub warehouse_name: String,
    pub idc: f64,
}

pub async fn fetch(
    ctx: &SellerContext,
    owner_id: i64,
    credentials: &Credentials,
    request: StockRequest,
) -> Result<Vec<StockRow>, FetchError> {
    let resource = Resource::Stock;
    let auth = fetch::authorize(ctx, resource, owner_id, credentials).await?;
    let query = resolve(request);

    ctx.observer.on_event(PipelineEvent::FetchStarted { resource });
    match ctx.marketplace.post::<_, StockPage>(PATH, &auth, &query).await {
        Ok(page) => {
            ctx.observer.on_event(PipelineEvent::PageFetched {
                resource,
                page: 1,
                items: page.rows.len(),
            });
            ctx.observer.on_event(PipelineEvent::Reshaped {
                resource,
                rows: page.rows.len(),
            });
            Ok(page.rows)
        },
        Err(err) => Err(fetch::abort(ctx, resource, owner_id, err.into()).await),
    }
}

impl ImportRow for StockRow {
    const RESOURCE: Resource = Resource::Stock;
    const COLUMNS: &'static [&'static str] = &[
        "sku",
        "item_code",
        "item_name",
        "free_to_sell_amount",
        "promised_amount",
        "reserved_amount",
        "warehouse_name",
        "idc",
    ];

    fn bind_values(&self, row: &mut Separated<'_, 'static, Postgres, &'static str>) {
        row.push_bind(self.sku)
            .push_bind(self.item_code.clone())
            .push_bind(self.item_name.clone())
            .push_bind(self.free_to_sell_amount)
            .push_bind(self.promised_amount)
            .push_bind(self.reserved_amount)
            .push_bind(self.warehouse_name.clone())
            .push_bind(self.idc);
    }

    fn into_batch(rows: Vec<Owned<Self>>) -> RowBatch {
        RowBatch::Stock(rows)
    }
}
