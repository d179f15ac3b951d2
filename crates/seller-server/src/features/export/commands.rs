//! Export commands

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use super::sheets::{SheetRows, SheetsError, SheetsService};
use super::source::{ExportSource, Record, SourceError};
use crate::journal::{ErrorJournal, ErrorRecord, JournalError, Priority};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Sheets(#[from] SheetsError),

    #[error("{0}")]
    InvalidRequest(String),

    /// Overwrite failed; the cause is journaled, not returned
    #[error("No export.")]
    NotExported,

    #[error(transparent)]
    Journal(#[from] JournalError),
}

/// Why an overwrite did not happen
#[derive(Error, Debug)]
enum OverwriteFailure {
    #[error("Bad request. No data.")]
    NoData,

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Sheets(#[from] SheetsError),

    #[error(transparent)]
    Journal(#[from] JournalError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportToSheetCommand {
    #[serde(alias = "sheetName")]
    pub sheet_name: String,
    #[serde(default)]
    pub data: SheetRows,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverwriteSheetCommand {
    #[serde(alias = "dataType")]
    pub data_type: String,
    #[serde(alias = "userId")]
    pub user_id: i64,
}

/// Header row of column names followed by one row per record
///
/// Columns are the union of record keys in first-seen order. Nested values are
/// written as JSON text, null and absent values as empty cells.
pub fn to_sheet_form(records: &[Record]) -> SheetRows {
    let mut columns: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }

    let mut rows = Vec::with_capacity(records.len() + 1);
    rows.push(columns.iter().map(|c| Value::String(c.to_string())).collect());
    for record in records {
        rows.push(
            columns
                .iter()
                .map(|column| cell(record.get(*column)))
                .collect(),
        );
    }
    rows
}

fn cell(value: Option<&Value>) -> Value {
    match value {
        None | Some(Value::Null) => Value::String(String::new()),
        Some(nested @ (Value::Array(_) | Value::Object(_))) => Value::String(nested.to_string()),
        Some(scalar) => scalar.clone(),
    }
}

#[derive(Clone)]
pub struct ExportService {
    sheets: Arc<dyn SheetsService>,
    source: Arc<dyn ExportSource>,
    journal: Arc<dyn ErrorJournal>,
}

impl ExportService {
    pub fn new(
        sheets: Arc<dyn SheetsService>,
        source: Arc<dyn ExportSource>,
        journal: Arc<dyn ErrorJournal>,
    ) -> Self {
        Self {
            sheets,
            source,
            journal,
        }
    }

    /// Ensure the sheet exists, then append the rows as given
    pub async fn export_to_sheet(&self, command: ExportToSheetCommand) -> Result<u64, ExportError> {
        if command.sheet_name.trim().is_empty() {
            return Err(ExportError::InvalidRequest("Sheet name is required".to_string()));
        }

        self.sheets
            .ensure_sheet_exists(&command.sheet_name, command.hidden)
            .await?;
        Ok(self.sheets.append_data(&command.sheet_name, command.data).await?)
    }

    /// Replace the sheet named after the data type with the user's dataset
    ///
    /// Any failure is journaled and reported as the generic [`ExportError::NotExported`].
    pub async fn overwrite_sheet(&self, command: OverwriteSheetCommand) -> Result<usize, ExportError> {
        match self.try_overwrite(&command).await {
            Ok(records) => {
                tracing::info!(data_type = %command.data_type, records, "Data exported");
                Ok(records)
            },
            Err(failure) => {
                tracing::warn!(data_type = %command.data_type, error = %failure, "Data not exported");
                self.journal
                    .record(ErrorRecord::new(
                        command.user_id,
                        command.data_type.as_str(),
                        500,
                        Priority::Medium,
                        "Failed to export data to table.",
                    ))
                    .await?;
                Err(ExportError::NotExported)
            },
        }
    }

    async fn try_overwrite(&self, command: &OverwriteSheetCommand) -> Result<usize, OverwriteFailure> {
        let records = self
            .source
            .data_for_export(&command.data_type, command.user_id)
            .await?;

        if records.is_empty() {
            let failure = OverwriteFailure::NoData;
            self.journal
                .record(ErrorRecord::new(
                    command.user_id,
                    command.data_type.as_str(),
                    400,
                    Priority::Medium,
                    failure.to_string(),
                ))
                .await?;
            return Err(failure);
        }

        let rows = to_sheet_form(&records);
        self.sheets.overwrite_sheet(&command.data_type, rows).await?;
        Ok(records.len())
    }
}
