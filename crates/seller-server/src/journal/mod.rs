//! Error journal
//!
//! Every pipeline failure is written as one [`ErrorRecord`] row before the failure
//! propagates. Writes are best-effort in the sense that nothing retries them; a failed
//! journal write surfaces as [`JournalError`] through the normal error path.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;

/// Journal write failures
#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Failed to write error journal entry: {0}")]
    Database(#[from] sqlx::Error),
}

/// Severity of a journaled failure (lower is less severe)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "i16", try_from = "i16")]
pub enum Priority {
    Low = 1,
    Medium = 2,
    High = 3,
}

impl From<Priority> for i16 {
    fn from(priority: Priority) -> Self {
        priority as i16
    }
}

impl TryFrom<i16> for Priority {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Priority::Low),
            2 => Ok(Priority::Medium),
            3 => Ok(Priority::High),
            other => Err(format!("Unknown journal priority {}", other)),
        }
    }
}

/// One journaled failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub owner_id: i64,
    pub message: String,
    pub service_name: String,
    /// HTTP-style status code, stored as text
    pub code: String,
    pub priority: Priority,
}

impl ErrorRecord {
    pub fn new(
        owner_id: i64,
        service_name: impl Into<String>,
        code: u16,
        priority: Priority,
        message: impl Into<String>,
    ) -> Self {
        Self {
            owner_id,
            message: message.into(),
            service_name: service_name.into(),
            code: code.to_string(),
            priority,
        }
    }
}

/// Sink for error records
#[async_trait]
pub trait ErrorJournal: Send + Sync {
    async fn record(&self, entry: ErrorRecord) -> Result<(), JournalError>;
}

/// Journal backed by the `journal_errors` table
#[derive(Clone)]
pub struct PgErrorJournal {
    pool: PgPool,
}

impl PgErrorJournal {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ErrorJournal for PgErrorJournal {
    #[tracing::instrument(
        skip(self, entry),
        fields(service = %entry.service_name, code = %entry.code, owner_id = entry.owner_id)
    )]
    async fn record(&self, entry: ErrorRecord) -> Result<(), JournalError> {
        sqlx::query(
            r#"
            INSERT INTO journal_errors (owner_id, message, service_name, code, priority)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.owner_id)
        .bind(&entry.message)
        .bind(&entry.service_name)
        .bind(&entry.code)
        .bind(i16::from(entry.priority))
        .execute(&self.pool)
        .await?;

        tracing::warn!(error = %entry.message, "Error journaled");
        Ok(())
    }
}
