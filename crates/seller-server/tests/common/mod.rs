//! Common test utilities for seller-server integration tests
//!
//! In-memory stand-ins for every collaborator behind a trait seam, so pipelines
//! and routes run against a `wiremock` marketplace without a database.
//!
//! # Example
//!
//! ```ignore
//! mod common;
//! use common::Harness;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let server = wiremock::MockServer::start().await;
//!     let harness = Harness::new(&server.uri());
//!     let ctx = harness.seller_context();
//!     // run a pipeline against ctx, then inspect harness.journal / harness.store
//! }
//! ```

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};

use seller_server::{
    config::MarketplaceConfig,
    features::{
        export::{ExportService, ExportSource, Record, SheetRows, SheetsError, SheetsService, SourceError},
        seller::{ImportStore, PipelineEvent, PipelineObserver, RowBatch, SellerContext, StoreError},
        FeatureState,
    },
    journal::{ErrorJournal, ErrorRecord, JournalError},
    marketplace::{Credentials, MarketplaceClient},
};

pub const OWNER_ID: i64 = 77;

pub fn credentials() -> Credentials {
    Credentials::new("12345", "secret-key")
}

// ============================================================================
// Journal
// ============================================================================

#[derive(Default)]
pub struct MemoryJournal {
    records: Mutex<Vec<ErrorRecord>>,
}

impl MemoryJournal {
    pub fn records(&self) -> Vec<ErrorRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl ErrorJournal for MemoryJournal {
    async fn record(&self, entry: ErrorRecord) -> Result<(), JournalError> {
        self.records.lock().unwrap().push(entry);
        Ok(())
    }
}

// ============================================================================
// Import store
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreMode {
    #[default]
    Accept,
    /// Constraint-style failure, blamed on the data
    Reject,
    /// Pool failure, blamed on the server
    Unavailable,
}

#[derive(Default)]
pub struct MemoryStore {
    mode: Mutex<StoreMode>,
    batches: Mutex<Vec<RowBatch>>,
    calls: Mutex<usize>,
}

impl MemoryStore {
    pub fn set_mode(&self, mode: StoreMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn batches(&self) -> Vec<RowBatch> {
        self.batches.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

/// Owner of every row in `batch`, in row order
pub fn owner_ids(batch: &RowBatch) -> Vec<i64> {
    let rows = serde_json::to_value(batch).unwrap();
    rows.as_array()
        .unwrap()
        .iter()
        .map(|row| row["owner_id"].as_i64().unwrap())
        .collect()
}

#[async_trait]
impl ImportStore for MemoryStore {
    async fn bulk_insert(&self, batch: RowBatch) -> Result<u64, StoreError> {
        *self.calls.lock().unwrap() += 1;
        let mode = *self.mode.lock().unwrap();
        match mode {
            StoreMode::Accept => {
                let rows = batch.len() as u64;
                self.batches.lock().unwrap().push(batch);
                Ok(rows)
            },
            StoreMode::Reject => Err(StoreError::Rejected(
                "duplicate key value violates unique constraint".to_string(),
            )),
            StoreMode::Unavailable => Err(StoreError::from(sqlx::Error::PoolTimedOut)),
        }
    }
}

// ============================================================================
// Observer
// ============================================================================

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl PipelineObserver for RecordingObserver {
    fn on_event(&self, event: PipelineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

// ============================================================================
// Spreadsheet export
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum SheetCall {
    Ensure { name: String, hidden: bool },
    Append { name: String, rows: SheetRows },
    Overwrite { name: String, rows: SheetRows },
}

#[derive(Default)]
pub struct FakeSheets {
    calls: Mutex<Vec<SheetCall>>,
}

impl FakeSheets {
    pub fn calls(&self) -> Vec<SheetCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SheetsService for FakeSheets {
    async fn ensure_sheet_exists(&self, name: &str, hidden: bool) -> Result<(), SheetsError> {
        self.calls.lock().unwrap().push(SheetCall::Ensure {
            name: name.to_string(),
            hidden,
        });
        Ok(())
    }

    async fn append_data(&self, name: &str, rows: SheetRows) -> Result<u64, SheetsError> {
        let count = rows.len() as u64;
        self.calls.lock().unwrap().push(SheetCall::Append {
            name: name.to_string(),
            rows,
        });
        Ok(count)
    }

    async fn overwrite_sheet(&self, name: &str, rows: SheetRows) -> Result<(), SheetsError> {
        self.calls.lock().unwrap().push(SheetCall::Overwrite {
            name: name.to_string(),
            rows,
        });
        Ok(())
    }
}

/// Dataset source serving fixed records for any known data type
#[derive(Default)]
pub struct FakeSource {
    records: Mutex<Vec<Record>>,
}

impl FakeSource {
    pub fn with_records(records: Vec<Value>) -> Self {
        let records = records
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        Self {
            records: Mutex::new(records),
        }
    }
}

#[async_trait]
impl ExportSource for FakeSource {
    async fn data_for_export(&self, data_type: &str, _user_id: i64) -> Result<Vec<Record>, SourceError> {
        if data_type == "unknown" {
            return Err(SourceError::UnknownDataType(data_type.to_string()));
        }
        Ok(self.records.lock().unwrap().clone())
    }
}

// ============================================================================
// Harness
// ============================================================================

/// All fakes plus a marketplace client pointed at a mock server
pub struct Harness {
    pub marketplace: MarketplaceClient,
    pub journal: Arc<MemoryJournal>,
    pub store: Arc<MemoryStore>,
    pub observer: Arc<RecordingObserver>,
    pub sheets: Arc<FakeSheets>,
    pub source: Arc<FakeSource>,
}

impl Harness {
    pub fn new(marketplace_url: &str) -> Self {
        Self::with_source(marketplace_url, FakeSource::default())
    }

    pub fn with_source(marketplace_url: &str, source: FakeSource) -> Self {
        let marketplace = MarketplaceClient::new(&MarketplaceConfig {
            base_url: marketplace_url.to_string(),
            timeout_secs: 5,
        })
        .expect("marketplace client");

        Self {
            marketplace,
            journal: Arc::new(MemoryJournal::default()),
            store: Arc::new(MemoryStore::default()),
            observer: Arc::new(RecordingObserver::default()),
            sheets: Arc::new(FakeSheets::default()),
            source: Arc::new(source),
        }
    }

    pub fn seller_context(&self) -> SellerContext {
        SellerContext {
            marketplace: self.marketplace.clone(),
            journal: self.journal.clone(),
            store: self.store.clone(),
            observer: self.observer.clone(),
        }
    }

    pub fn export_service(&self) -> ExportService {
        ExportService::new(self.sheets.clone(), self.source.clone(), self.journal.clone())
    }

    pub fn feature_state(&self) -> FeatureState {
        FeatureState {
            seller: self.seller_context(),
            export: self.export_service(),
        }
    }
}
