//! Bulk persistence of reshaped rows
//!
//! Rows reach the store only wrapped in [`Owned`], so nothing can be written without
//! an owner id. One batch is written in a single transaction, split into
//! multi-row `INSERT`s that stay below the Postgres bind parameter limit.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{query_builder::Separated, PgPool, Postgres, QueryBuilder};
use thiserror::Error;

use super::analytics::AnalyticsRow;
use super::products::ProductRow;
use super::stock::StockRow;
use super::transactions::TransactionRow;
use super::Resource;

/// Postgres accepts at most this many bind parameters per statement
const MAX_BIND_PARAMS: usize = 65_535;

/// Persistence failures
#[derive(Error, Debug)]
pub enum StoreError {
    /// The database refused the data (constraint or data exception)
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Database(sqlx::Error),
}

impl StoreError {
    /// Whether the failure lies with the database rather than the rows
    pub fn is_server_side(&self) -> bool {
        matches!(self, StoreError::Database(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            // SQLSTATE class 22: data exception, class 23: integrity violation
            let rejected = db
                .code()
                .is_some_and(|code| code.starts_with("22") || code.starts_with("23"));
            if rejected {
                return StoreError::Rejected(db.message().to_string());
            }
        }
        StoreError::Database(err)
    }
}

/// A reshaped row stamped with its owner
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Owned<R> {
    pub owner_id: i64,
    #[serde(flatten)]
    pub row: R,
}

/// Row type with a destination table
pub trait ImportRow: Serialize + Send + Sync + Sized + 'static {
    const RESOURCE: Resource;

    /// Columns bound by [`ImportRow::bind_values`], `owner_id` excluded
    const COLUMNS: &'static [&'static str];

    fn bind_values(&self, row: &mut Separated<'_, 'static, Postgres, &'static str>);

    fn into_batch(rows: Vec<Owned<Self>>) -> RowBatch;
}

/// Stamped rows of one resource
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RowBatch {
    Analytics(Vec<Owned<AnalyticsRow>>),
    Stock(Vec<Owned<StockRow>>),
    Transactions(Vec<Owned<TransactionRow>>),
    Products(Vec<Owned<ProductRow>>),
}

impl RowBatch {
    pub fn resource(&self) -> Resource {
        match self {
            RowBatch::Analytics(_) => Resource::Analytics,
            RowBatch::Stock(_) => Resource::Stock,
            RowBatch::Transactions(_) => Resource::Transactions,
            RowBatch::Products(_) => Resource::Products,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RowBatch::Analytics(rows) => rows.len(),
            RowBatch::Stock(rows) => rows.len(),
            RowBatch::Transactions(rows) => rows.len(),
            RowBatch::Products(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Destination for imported rows
#[async_trait]
pub trait ImportStore: Send + Sync {
    /// Persist the whole batch or nothing; returns the number of rows written
    async fn bulk_insert(&self, batch: RowBatch) -> Result<u64, StoreError>;
}

/// Store backed by the `seller_*` tables
#[derive(Clone)]
pub struct PgImportStore {
    pool: PgPool,
}

impl PgImportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImportStore for PgImportStore {
    #[tracing::instrument(skip(self, batch), fields(resource = %batch.resource(), rows = batch.len()))]
    async fn bulk_insert(&self, batch: RowBatch) -> Result<u64, StoreError> {
        match batch {
            RowBatch::Analytics(rows) => insert_rows(&self.pool, &rows).await,
            RowBatch::Stock(rows) => insert_rows(&self.pool, &rows).await,
            RowBatch::Transactions(rows) => insert_rows(&self.pool, &rows).await,
            RowBatch::Products(rows) => insert_rows(&self.pool, &rows).await,
        }
    }
}

fn insert_prefix<R: ImportRow>() -> String {
    let columns = std::iter::once("owner_id")
        .chain(R::COLUMNS.iter().copied())
        .map(|c| format!("\"{}\"", c))
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {} ({}) ", R::RESOURCE.table(), columns)
}

fn chunk_size<R: ImportRow>() -> usize {
    (MAX_BIND_PARAMS / (R::COLUMNS.len() + 1)).max(1)
}

async fn insert_rows<R: ImportRow>(pool: &PgPool, rows: &[Owned<R>]) -> Result<u64, StoreError> {
    let prefix = insert_prefix::<R>();
    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for chunk in rows.chunks(chunk_size::<R>()) {
        let mut builder: QueryBuilder<'static, Postgres> = QueryBuilder::new(prefix.as_str());
        builder.push_values(chunk, |mut values, owned| {
            values.push_bind(owned.owner_id);
            owned.row.bind_values(&mut values);
        });
        inserted += builder.build().execute(&mut *tx).await?.rows_affected();
    }

    tx.commit().await?;
    tracing::debug!(table = R::RESOURCE.table(), inserted, "Rows inserted");
    Ok(inserted)
}
