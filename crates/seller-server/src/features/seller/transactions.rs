//! Finance transactions (`/v3/finance/transaction/list`)
//!
//! The first response reports `page_count`; the remaining pages are requested one
//! after another and their operations appended in page order.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{query_builder::Separated, Postgres};

use super::fetch::{self, FetchError};
use super::observer::PipelineEvent;
use super::request;
use super::store::{ImportRow, Owned, RowBatch};
use super::{Resource, SellerContext};
use crate::marketplace::{ApiAuth, Credentials};

pub const PATH: &str = "/v3/finance/transaction/list";

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_PAGE_SIZE: u32 = 1000;
const DEFAULT_TRANSACTION_TYPE: &str = "all";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateRangeRequest {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Nested filter in the upstream shape; top-level fields take precedence
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilterRequest {
    pub date: Option<DateRangeRequest>,
    pub operation_type: Option<Vec<String>>,
    pub posting_number: Option<String>,
    pub transaction_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionRequest {
    #[serde(alias = "datefrom")]
    pub date_from: Option<String>,
    #[serde(alias = "dateto")]
    pub date_to: Option<String>,
    pub operation_type: Option<Vec<String>>,
    pub posting_number: Option<String>,
    pub transaction_type: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    #[serde(default)]
    pub filter: TransactionFilterRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateRange {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionFilter {
    pub date: DateRange,
    pub operation_type: Vec<String>,
    pub posting_number: String,
    pub transaction_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionQuery {
    pub filter: TransactionFilter,
    pub page: u32,
    pub page_size: u32,
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn resolve(request: TransactionRequest, now: DateTime<Utc>) -> TransactionQuery {
    let filter = request.filter;
    let date = filter.date.unwrap_or_default();
    let month_ago = now
        .checked_sub_months(chrono::Months::new(1))
        .unwrap_or(now);

    TransactionQuery {
        filter: TransactionFilter {
            date: DateRange {
                from: request::text(request.date_from.or(date.from), timestamp(month_ago)),
                to: request::text(request.date_to.or(date.to), timestamp(now)),
            },
            operation_type: request::list(
                request.operation_type.or(filter.operation_type),
                Vec::new,
            ),
            posting_number: request::text(
                request.posting_number.or(filter.posting_number),
                "",
            ),
            transaction_type: request::text(
                request.transaction_type.or(filter.transaction_type),
                DEFAULT_TRANSACTION_TYPE,
            ),
        },
        page: request::count(request.page, DEFAULT_PAGE),
        page_size: request::count(request.page_size, DEFAULT_PAGE_SIZE),
    }
}

#[derive(Debug, Deserialize)]
struct TransactionPage {
    #[serde(default)]
    operations: Vec<Operation>,
    #[serde(default)]
    page_count: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Posting {
    pub delivery_schema: Option<String>,
    pub order_date: Option<String>,
    pub posting_number: Option<String>,
    pub warehouse_id: Option<i64>,
}

/// Operation as returned by the upstream
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Operation {
    pub operation_id: i64,
    pub operation_type: String,
    pub operation_date: String,
    pub operation_type_name: String,
    pub delivery_charge: f64,
    pub return_delivery_charge: f64,
    pub accruals_for_sale: f64,
    pub sale_commission: f64,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub posting: Option<Posting>,
    pub items: Value,
    pub services: Value,
}

/// Operation with posting fields promoted and nested lists as opaque text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRow {
    pub operation_id: i64,
    pub operation_type: String,
    pub operation_date: String,
    pub operation_type_name: String,
    pub delivery_charge: f64,
    pub return_delivery_charge: f64,
    pub accruals_for_sale: f64,
    pub sale_commission: f64,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub delivery_schema: String,
    pub order_date: String,
    pub posting_number: String,
    pub warehouse_id: i64,
    pub items: String,
    pub services: String,
}

pub fn reshape(operations: Vec<Operation>) -> seller_common::Result<Vec<TransactionRow>> {
    operations
        .into_iter()
        .map(|op| {
            let posting = op.posting.unwrap_or_default();
            Ok(TransactionRow {
                items: seller_common::encode_opaque(&op.items)?,
                services: seller_common::encode_opaque(&op.services)?,
                operation_id: op.operation_id,
                operation_type: op.operation_type,
                operation_date: op.operation_date,
                operation_type_name: op.operation_type_name,
                delivery_charge: op.delivery_charge,
                return_delivery_charge: op.return_delivery_charge,
                accruals_for_sale: op.accruals_for_sale,
                sale_commission: op.sale_commission,
                amount: op.amount,
                kind: op.kind,
                delivery_schema: posting.delivery_schema.unwrap_or_default(),
                order_date: posting.order_date.unwrap_or_default(),
                posting_number: posting.posting_number.unwrap_or_default(),
                warehouse_id: posting.warehouse_id.unwrap_or(0),
            })
        })
        .collect()
}

async fn fetch_pages(
    ctx: &SellerContext,
    auth: &ApiAuth,
    mut query: TransactionQuery,
) -> Result<Vec<Operation>, FetchError> {
    let resource = Resource::Transactions;
    let first: TransactionPage = ctx.marketplace.post(PATH, auth, &query).await?;
    ctx.observer.on_event(PipelineEvent::PageFetched {
        resource,
        page: query.page,
        items: first.operations.len(),
    });

    let mut operations = first.operations;
    // A caller-supplied page at u32::MAX has no successor
    let Some(next_page) = query.page.checked_add(1) else {
        return Ok(operations);
    };
    for page in next_page..=first.page_count {
        query.page = page;
        let next: TransactionPage = ctx.marketplace.post(PATH, auth, &query).await?;
        ctx.observer.on_event(PipelineEvent::PageFetched {
            resource,
            page,
            items: next.operations.len(),
        });
        operations.extend(next.operations);
    }

    Ok(operations)
}

pub async fn fetch(
    ctx: &SellerContext,
    owner_id: i64,
    credentials: &Credentials,
    request: TransactionRequest,
) -> Result<Vec<TransactionRow>, FetchError> {
    let resource = Resource::Transactions;
    let auth = fetch::authorize(ctx, resource, owner_id, credentials).await?;
    let query = resolve(request, Utc::now());

    ctx.observer.on_event(PipelineEvent::FetchStarted { resource });
    let outcome = match fetch_pages(ctx, &auth, query).await {
        Ok(operations) => reshape(operations).map_err(FetchError::from),
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

impl ImportRow for TransactionRow {
    const RESOURCE: Resource = Resource::Transactions;
    const COLUMNS: &'static [&'static str] = &[
        "operation_id",
        "operation_type",
        "operation_date",
        "operation_type_name",
        "delivery_charge",
        "return_delivery_charge",
        "accruals_for_sale",
        "sale_commission",
        "amount",
        "type",
        "delivery_schema",
        "order_date",
        "posting_number",
        "warehouse_id",
        "items",
        "services",
    ];

    fn bind_values(&self, row: &mut Separated<'_, 'static, Postgres, &'static str>) {
        row.push_bind(self.operation_id)
            .push_bind(self.operation_type.clone())
            .push_bind(self.operation_date.clone())
            .push_bind(self.operation_type_name.clone())
            .push_bind(self.delivery_charge)
            .push_bind(self.return_delivery_charge)
            .push_bind(self.accruals_for_sale)
            .push_bind(self.sale_commission)
            .push_bind(self.amount)
            .push_bind(self.kind.clone())
            .push_bind(self.delivery_schema.clone())
            .push_bind(self.order_date.clone())
            .push_bind(self.posting_number.clone())
            .push_bind(self.warehouse_id)
            .push_bind(self.items.clone())
            .push_bind(self.services.clone());
    }

    fn into_batch(rows: Vec<Owned<Self>>) -> RowBatch {
        RowBatch::Transactions(rows)
    }
}
