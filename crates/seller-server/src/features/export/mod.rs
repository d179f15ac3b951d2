//! Spreadsheet export
//!
//! - `to-sheet`: append caller-supplied rows to a named sheet, creating it first
//! - `overwrite-sheet`: replace a sheet with one user's imported dataset

pub mod commands;
pub mod routes;
pub mod sheets;
pub mod source;

pub use commands::{
    to_sheet_form, ExportError, ExportService, ExportToSheetCommand, OverwriteSheetCommand,
};
pub use routes::export_routes;
pub use sheets::{GoogleSheetsClient, SheetRows, SheetsError, SheetsService};
pub use source::{ExportSource, PgExportSource, Record, SourceError};
