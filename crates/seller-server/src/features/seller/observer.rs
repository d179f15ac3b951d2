//! Pipeline observation
//!
//! Stages report progress through a [`PipelineObserver`] handed to them in the
//! [`SellerContext`](super::SellerContext) instead of logging directly. The
//! production observer forwards to `tracing`; tests record the events.

use serde::Serialize;

use super::Resource;

/// Pipeline step that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Authorize,
    Fetch,
    Import,
}

/// Something that happened inside a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    FetchStarted {
        resource: Resource,
    },
    PageFetched {
        resource: Resource,
        page: u32,
        items: usize,
    },
    MetricDropped {
        resource: Resource,
        metric: String,
    },
    Reshaped {
        resource: Resource,
        rows: usize,
    },
    ImportStarted {
        resource: Resource,
        owner_id: i64,
        rows: usize,
    },
    Imported {
        resource: Resource,
        owner_id: i64,
        rows: u64,
    },
    Failed {
        resource: Resource,
        stage: Stage,
        message: String,
    },
}

pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: PipelineEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_event(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::FetchStarted { resource } => {
                tracing::info!(%resource, "Requesting data");
            },
            PipelineEvent::PageFetched { resource, page, items } => {
                tracing::debug!(%resource, page, items, "Page received");
            },
            PipelineEvent::MetricDropped { resource, metric } => {
                tracing::warn!(%resource, %metric, "Metric outside the template dropped");
            },
            PipelineEvent::Reshaped { resource, rows } => {
                tracing::info!(%resource, rows, "Data converted");
            },
            PipelineEvent::ImportStarted { resource, owner_id, rows } => {
                tracing::info!(%resource, owner_id, rows, "Starting import");
            },
            PipelineEvent::Imported { resource, owner_id, rows } => {
                tracing::info!(%resource, owner_id, rows, "Import succeeded");
            },
            PipelineEvent::Failed { resource, stage, message } => {
                tracing::error!(%resource, ?stage, %message, "Pipeline aborted");
            },
        }
    }
}
