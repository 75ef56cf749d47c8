//! The tabular-store collaborator: reads pending rows from a Google Sheet and
//! writes extracted fields and status markers back.
//!
//! Sheet layout: column A holds the original free text, columns B-G the six
//! extracted fields, column H the status marker. Row 1 is the header.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::workflow::{EventFields, PendingRow};

const API_URL: &str = "https://sheets.googleapis.com";

/// Status marker written after the extracted fields are persisted.
pub const STATUS_DONE: &str = "done";
/// Status marker written after the calendar entry is confirmed.
pub const STATUS_CALENDAR_SYNCED: &str = "calendar synced";

const HEADERS: [&str; 8] = [
    "Original text",
    "Title",
    "Date",
    "Time",
    "Location",
    "Description",
    "Notes",
    "Status",
];

/// Failures from the tabular store. All are non-fatal to a run; the engine
/// records them and moves on.
#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Read/write operations the pipeline needs from the tabular store.
#[allow(async_fn_in_trait)]
pub trait RowStore {
    /// Rows whose status marker is absent or not a completion marker, in
    /// sheet order.
    async fn fetch_unprocessed(&self) -> Result<Vec<PendingRow>, SheetsError>;
    async fn write_fields(&self, row_number: u32, fields: &EventFields)
    -> Result<(), SheetsError>;
    async fn mark_processed(&self, row_number: u32) -> Result<(), SheetsError>;
    async fn mark_calendar_synced(&self, row_number: u32) -> Result<(), SheetsError>;
}

/// Google Sheets v4 implementation of [`RowStore`], authenticated with a
/// bearer access token.
pub struct SheetsClient {
    access_token: String,
    sheet_id: String,
    sheet_name: String,
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl SheetsClient {
    pub fn new(access_token: String, sheet_id: String, sheet_name: String) -> Self {
        Self::with_base_url(access_token, sheet_id, sheet_name, API_URL.to_string())
    }

    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(
        access_token: String,
        sheet_id: String,
        sheet_name: String,
        base_url: String,
    ) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to build HTTP client");
        Self {
            access_token,
            sheet_id,
            sheet_name,
            client,
            base_url,
        }
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}!{}",
            self.base_url, self.sheet_id, self.sheet_name, range
        )
    }

    async fn put_values(&self, range: &str, values: Vec<Vec<String>>) -> Result<(), SheetsError> {
        let response = self
            .client
            .put(self.values_url(range))
            .bearer_auth(&self.access_token)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "values": values }))
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }

    /// One-time setup: write the column headers to row 1.
    pub async fn write_headers(&self) -> Result<(), SheetsError> {
        let headers = HEADERS.iter().map(|h| h.to_string()).collect();
        self.put_values("A1:H1", vec![headers]).await
    }
}

impl RowStore for SheetsClient {
    async fn fetch_unprocessed(&self) -> Result<Vec<PendingRow>, SheetsError> {
        let response = self
            .client
            .get(self.values_url("A2:H"))
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let body = check_status(response).await?.json::<ValueRange>().await?;
        Ok(pending_rows(&body.values))
    }

    async fn write_fields(
        &self,
        row_number: u32,
        fields: &EventFields,
    ) -> Result<(), SheetsError> {
        let range = format!("B{row_number}:G{row_number}");
        self.put_values(
            &range,
            vec![vec![
                fields.title.clone(),
                fields.date.clone(),
                fields.time.clone(),
                fields.location.clone(),
                fields.description.clone(),
                fields.notes.clone(),
            ]],
        )
        .await
    }

    async fn mark_processed(&self, row_number: u32) -> Result<(), SheetsError> {
        let range = format!("H{row_number}");
        self.put_values(&range, vec![vec![STATUS_DONE.to_string()]])
            .await
    }

    async fn mark_calendar_synced(&self, row_number: u32) -> Result<(), SheetsError> {
        let range = format!("H{row_number}");
        self.put_values(&range, vec![vec![STATUS_CALENDAR_SYNCED.to_string()]])
            .await
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SheetsError> {
    let status = response.status();
    if !status.is_success() {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        return Err(SheetsError::ApiError {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response)
}

/// Select the rows still waiting for processing.
///
/// `values` starts at sheet row 2 (the fetch range skips the header), so the
/// row number is the index offset by 2. A row qualifies when column A is
/// non-blank and column H carries neither completion marker.
fn pending_rows(values: &[Vec<Value>]) -> Vec<PendingRow> {
    let mut pending = Vec::new();
    for (idx, row) in values.iter().enumerate() {
        let text = cell_text(row, 0);
        if text.trim().is_empty() {
            continue;
        }
        let status = cell_text(row, 7);
        if status == STATUS_DONE || status == STATUS_CALENDAR_SYNCED {
            continue;
        }
        pending.push(PendingRow {
            row_number: idx as u32 + 2,
            text,
        });
    }
    pending
}

// The values API returns formatted cells, which are normally strings but can
// surface as bare numbers.
fn cell_text(row: &[Value], column: usize) -> String {
    match row.get(column) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
