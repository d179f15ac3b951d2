//! Seller routes
//!
//! Every endpoint reads the seller's `Client-Id` / `Api-Key` headers and the
//! caller's `x-user-id`. The plain resource endpoint returns the reshaped rows;
//! `/import` also persists them. A missing or blank body means "all defaults".

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;

use super::pipeline::{self, Analytics, Pipeline, Products, Stock, Transactions};
use super::{Resource, SellerContext};
use crate::api::response::ApiResponse;
use crate::error::AppError;
use crate::marketplace::Credentials;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Create seller routes
pub fn seller_routes() -> Router<SellerContext> {
    Router::new()
        .route("/analytics", post(fetch_rows::<Analytics>))
        .route("/analytics/import", post(import_rows::<Analytics>))
        .route("/stock", post(fetch_rows::<Stock>))
        .route("/stock/import", post(import_rows::<Stock>))
        .route("/transactions", post(fetch_rows::<Transactions>))
        .route("/transactions/import", post(import_rows::<Transactions>))
        .route("/products", post(fetch_rows::<Products>))
        .route("/products/import", post(import_rows::<Products>))
}

/// Owner id from the `x-user-id` header
pub fn owner_id(headers: &HeaderMap) -> Result<i64, AppError> {
    let raw = headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| AppError::BadRequest(format!("Missing {} header", USER_ID_HEADER)))?;
    raw.to_str()
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .ok_or_else(|| AppError::BadRequest(format!("Invalid {} header", USER_ID_HEADER)))
}

/// JSON request body where an empty body stands for `T::default()`
#[derive(Debug)]
pub struct SellerRequest<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for SellerRequest<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        parse_body(&bytes).map(SellerRequest)
    }
}

fn parse_body<T: DeserializeOwned + Default>(bytes: &[u8]) -> Result<T, AppError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(bytes)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))
}

#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub resource: Resource,
    pub imported: u64,
}

/// POST /{resource}
#[tracing::instrument(skip(ctx, headers, request), fields(resource = %P::resource()))]
async fn fetch_rows<P: Pipeline>(
    State(ctx): State<SellerContext>,
    headers: HeaderMap,
    SellerRequest(request): SellerRequest<P::Request>,
) -> Result<Response, AppError> {
    let owner_id = owner_id(&headers)?;
    let credentials = Credentials::from_headers(&headers);
    let rows = P::fetch(&ctx, owner_id, &credentials, request).await?;
    let meta = json!({ "rows": rows.len() });
    Ok(ApiResponse::success_with_meta(rows, meta).into_response())
}

/// POST /{resource}/import
#[tracing::instrument(skip(ctx, headers, request), fields(resource = %P::resource()))]
async fn import_rows<P: Pipeline>(
    State(ctx): State<SellerContext>,
    headers: HeaderMap,
    SellerRequest(request): SellerRequest<P::Request>,
) -> Result<Response, AppError> {
    let owner_id = owner_id(&headers)?;
    let credentials = Credentials::from_headers(&headers);
    let imported = pipeline::fetch_and_import::<P>(&ctx, owner_id, &credentials, request).await?;
    Ok(ApiResponse::success(ImportSummary {
        resource: P::resource(),
        imported,
    })
    .into_response())
}
