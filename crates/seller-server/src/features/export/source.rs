//! Datasets available for export, keyed by data type name

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{PgPool, Row};

use crate::features::seller::Resource;

pub type Record = Map<String, Value>;

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("Unknown data type: {0}")]
    UnknownDataType(String),

    #[error("Failed to load export data: {0}")]
    Database(#[from] sqlx::Error),
}

/// Loads a user's records for one data type
#[async_trait]
pub trait ExportSource: Send + Sync {
    async fn data_for_export(&self, data_type: &str, user_id: i64)
        -> Result<Vec<Record>, SourceError>;
}

/// Reads the imported `seller_*` tables
#[derive(Clone)]
pub struct PgExportSource {
    pool: PgPool,
}

impl PgExportSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExportSource for PgExportSource {
    #[tracing::instrument(skip(self))]
    async fn data_for_export(
        &self,
        data_type: &str,
        user_id: i64,
    ) -> Result<Vec<Record>, SourceError> {
        let resource = Resource::from_name(data_type)
            .ok_or_else(|| SourceError::UnknownDataType(data_type.to_string()))?;

        let sql = format!(
            "SELECT to_jsonb(t) - 'id' - 'owner_id' - 'created_at' AS record \
             FROM {} t WHERE owner_id = $1 ORDER BY id",
            resource.table()
        );
        let rows = sqlx::query(&sql).bind(user_id).fetch_all(&self.pool).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Value::Object(map) = row.try_get::<Value, _>("record")? {
                records.push(map);
            }
        }

        tracing::debug!(table = resource.table(), records = records.len(), "Export data loaded");
        Ok(records)
    }
}
