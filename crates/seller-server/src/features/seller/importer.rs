//! Bulk importer: stamp reshaped rows with their owner and persist them in one batch

use thiserror::Error;

use super::observer::{PipelineEvent, Stage};
use super::store::{ImportRow, Owned, StoreError};
use super::{Resource, SellerContext};
use crate::journal::{ErrorRecord, JournalError, Priority};

/// Import stage failures
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("No data")]
    EmptyResult { resource: Resource },

    #[error("Failed to import {resource} data: {source}")]
    Persistence {
        resource: Resource,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Journal(#[from] JournalError),
}

pub async fn import_rows<R: ImportRow>(
    ctx: &SellerContext,
    owner_id: i64,
    rows: Vec<R>,
) -> Result<u64, ImportError> {
    let resource = R::RESOURCE;

    if rows.is_empty() {
        let err = ImportError::EmptyResult { resource };
        ctx.observer.on_event(PipelineEvent::Failed {
            resource,
            stage: Stage::Import,
            message: err.to_string(),
        });
        ctx.journal
            .record(ErrorRecord::new(
                owner_id,
                resource.service_name(),
                404,
                Priority::Medium,
                err.to_string(),
            ))
            .await?;
        return Err(err);
    }

    ctx.observer.on_event(PipelineEvent::ImportStarted {
        resource,
        owner_id,
        rows: rows.len(),
    });

    let batch = R::into_batch(
        rows.into_iter()
            .map(|row| Owned { owner_id, row })
            .collect(),
    );

    match ctx.store.bulk_insert(batch).await {
        Ok(inserted) => {
            ctx.observer.on_event(PipelineEvent::Imported {
                resource,
                owner_id,
                rows: inserted,
            });
            Ok(inserted)
        },
        Err(source) => {
            let server_side = source.is_server_side();
            let cause = source.to_string();
            let err = ImportError::Persistence { resource, source };
            ctx.observer.on_event(PipelineEvent::Failed {
                resource,
                stage: Stage::Import,
                message: err.to_string(),
            });
            if server_side {
                ctx.journal
                    .record(ErrorRecord::new(
                        owner_id,
                        resource.service_name(),
                        500,
                        Priority::High,
                        cause,
                    ))
                    .await?;
            }
            Err(err)
        },
    }
}
