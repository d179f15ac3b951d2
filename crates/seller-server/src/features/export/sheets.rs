//! Google Sheets v4 REST client

use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use crate::config::SheetsConfig;

/// Cell grid, first row usually being the header
pub type SheetRows = Vec<Vec<Value>>;

#[derive(Error, Debug)]
pub enum SheetsError {
    #[error("Spreadsheet export is not configured")]
    NotConfigured,

    #[error("Sheets request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Sheets API returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid Sheets URL: {0}")]
    Url(String),
}

/// Spreadsheet operations used by the export endpoints
#[async_trait]
pub trait SheetsService: Send + Sync {
    /// Create the sheet unless one with that title exists
    async fn ensure_sheet_exists(&self, name: &str, hidden: bool) -> Result<(), SheetsError>;

    /// Append rows below existing content; returns the number of updated rows
    async fn append_data(&self, name: &str, rows: SheetRows) -> Result<u64, SheetsError>;

    /// Replace the sheet content with `rows`
    async fn overwrite_sheet(&self, name: &str, rows: SheetRows) -> Result<(), SheetsError>;
}

#[derive(Clone)]
pub struct GoogleSheetsClient {
    http: Client,
    base_url: String,
    spreadsheet_id: Option<String>,
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Spreadsheet {
    #[serde(default)]
    sheets: Vec<Sheet>,
}

#[derive(Debug, Deserialize)]
struct Sheet {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    #[serde(default)]
    updates: AppendUpdates,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    #[serde(default)]
    updated_rows: u64,
}

/// A1 range covering a whole sheet
fn sheet_range(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SheetsError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(SheetsError::Status {
        status: status.as_u16(),
        message,
    })
}

impl GoogleSheetsClient {
    pub fn new(config: &SheetsConfig) -> Result<Self, SheetsError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            access_token: config.access_token.clone(),
        })
    }

    /// `{base}/v4/spreadsheets/{id}/{segments..}` with each segment percent-encoded
    fn url(&self, segments: &[&str]) -> Result<(Url, &str), SheetsError> {
        let (Some(id), Some(token)) = (&self.spreadsheet_id, &self.access_token) else {
            return Err(SheetsError::NotConfigured);
        };
        let mut url = Url::parse(&self.base_url).map_err(|e| SheetsError::Url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SheetsError::Url(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", id.as_str()])
            .extend(segments);
        Ok((url, token.as_str()))
    }

    async fn send(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<reqwest::Response, SheetsError> {
        let (url, token) = self.url(segments)?;
        tracing::debug!(%url, %method, "Sheets request");

        let mut request = self.http.request(method, url).bearer_auth(token).query(query);
        if let Some(body) = body {
            request = request.json(&body);
        }
        check_status(request.send().await?).await
    }

    async fn sheet_titles(&self) -> Result<Vec<String>, SheetsError> {
        let spreadsheet: Spreadsheet = self
            .send(Method::GET, &[], &[("fields", "sheets.properties.title")], None)
            .await?
            .json()
            .await?;
        Ok(spreadsheet
            .sheets
            .into_iter()
            .map(|s| s.properties.title)
            .collect())
    }
}

#[async_trait]
impl SheetsService for GoogleSheetsClient {
    #[tracing::instrument(skip(self))]
    async fn ensure_sheet_exists(&self, name: &str, hidden: bool) -> Result<(), SheetsError> {
        if self.sheet_titles().await?.iter().any(|t| t == name) {
            return Ok(());
        }

        let body = json!({
            "requests": [{
                "addSheet": {"properties": {"title": name, "hidden": hidden}}
            }]
        });
        // batchUpdate is a custom method on the spreadsheet resource: `{id}:batchUpdate`
        let (mut url, token) = self.url(&[])?;
        let path = format!("{}:batchUpdate", url.path());
        url.set_path(&path);

        let response = self.http.post(url).bearer_auth(token).json(&body).send().await?;
        check_status(response).await?;

        tracing::info!(sheet = name, "Sheet created");
        Ok(())
    }

    #[tracing::instrument(skip(self, rows), fields(rows = rows.len()))]
    async fn append_data(&self, name: &str, rows: SheetRows) -> Result<u64, SheetsError> {
        let range = format!("{}:append", sheet_range(name));
        let response: AppendResponse = self
            .send(
                Method::POST,
                &["values", &range],
                &[("valueInputOption", "USER_ENTERED"), ("insertDataOption", "INSERT_ROWS")],
                Some(json!({ "values": rows })),
            )
            .await?
            .json()
            .await?;
        Ok(response.updates.updated_rows)
    }

    #[tracing::instrument(skip(self, rows), fields(rows = rows.len()))]
    async fn overwrite_sheet(&self, name: &str, rows: SheetRows) -> Result<(), SheetsError> {
        self.ensure_sheet_exists(name, false).await?;

        let range = sheet_range(name);
        let clear = format!("{}:clear", range);
        self.send(Method::POST, &["values", &clear], &[], Some(json!({})))
            .await?;
        self.send(
            Method::PUT,
            &["values", &range],
            &[("valueInputOption", "USER_ENTERED")],
            Some(json!({ "range": range, "majorDimension": "ROWS", "values": rows })),
        )
        .await?;

        tracing::info!(sheet = name, "Sheet overwritten");
        Ok(())
    }
}
