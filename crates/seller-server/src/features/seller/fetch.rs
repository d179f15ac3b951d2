//! Shared fetch-stage plumbing: credential gate and failure journaling

use seller_common::SellerError;
use thiserror::Error;

use super::observer::{PipelineEvent, Stage};
use super::{Resource, SellerContext};
use crate::journal::{ErrorRecord, JournalError, Priority};
use crate::marketplace::{ApiAuth, Credentials, UpstreamError};

/// Fetch stage failures
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Unauthorized. No Client-Id or Api-Key.")]
    Unauthorized,

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("Failed to convert marketplace data: {0}")]
    Reshape(#[from] SellerError),

    #[error(transparent)]
    Journal(#[from] JournalError),
}

impl FetchError {
    /// Code written to the journal for this failure
    fn journal_code(&self) -> u16 {
        match self {
            FetchError::Unauthorized => 401,
            FetchError::Upstream(e) => e.status_code().unwrap_or(500),
            FetchError::Reshape(_) | FetchError::Journal(_) => 500,
        }
    }
}

/// Pass the credential gate or journal a 401 and stop before any upstream call
pub(crate) async fn authorize(
    ctx: &SellerContext,
    resource: Resource,
    owner_id: i64,
    credentials: &Credentials,
) -> Result<ApiAuth, FetchError> {
    if let Some(auth) = credentials.authorize() {
        return Ok(auth);
    }

    let err = FetchError::Unauthorized;
    ctx.observer.on_event(PipelineEvent::Failed {
        resource,
        stage: Stage::Authorize,
        message: err.to_string(),
    });
    ctx.journal
        .record(ErrorRecord::new(
            owner_id,
            resource.auth_service_name(),
            401,
            Priority::High,
            err.to_string(),
        ))
        .await?;
    Err(err)
}

/// Journal a failed fetch and hand back the error to propagate
pub(crate) async fn abort(
    ctx: &SellerContext,
    resource: Resource,
    owner_id: i64,
    err: FetchError,
) -> FetchError {
    let message = format!("Request aborted, error: {}", err);
    ctx.observer.on_event(PipelineEvent::Failed {
        resource,
        stage: Stage::Fetch,
        message: message.clone(),
    });

    let record = ErrorRecord::new(
        owner_id,
        resource.service_name(),
        err.journal_code(),
        Priority::High,
        message,
    );
    match ctx.journal.record(record).await {
        Ok(()) => err,
        Err(journal_err) => FetchError::Journal(journal_err),
    }
}
