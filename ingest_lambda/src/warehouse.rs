use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::records::{Record, RecordBatch};

/// Table receiving the rows of every invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub dataset: String,
    pub table: String,
}

impl Destination {
    pub fn new(dataset: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.dataset, self.table)
    }
}

/// One rejection reported by the warehouse for one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub row_index: usize,
    pub reason: Option<String>,
    pub location: Option<String>,
    pub message: String,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.row_index, self.message)?;
        match (&self.reason, &self.location) {
            (Some(reason), Some(location)) => write!(f, " ({reason} at {location})"),
            (Some(reason), None) => write!(f, " ({reason})"),
            (None, Some(location)) => write!(f, " (at {location})"),
            (None, None) => Ok(()),
        }
    }
}

/// Result of one streaming insert. Rows not listed in `row_errors` may have
/// been committed even when the outcome is not accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    pub row_errors: Vec<RowError>,
}

impl InsertOutcome {
    pub fn accepted(&self) -> bool {
        self.row_errors.is_empty()
    }
}

/// Streaming-insert access to an analytical warehouse.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WarehouseWriter: Send + Sync {
    async fn insert_rows(&self, destination: &Destination, rows: &RecordBatch)
        -> Result<InsertOutcome>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllRequest<'a> {
    skip_invalid_rows: bool,
    ignore_unknown_values: bool,
    rows: Vec<InsertAllRow<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllRow<'a> {
    insert_id: String,
    json: &'a Record,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<InsertErrors>,
}

#[derive(Debug, Deserialize)]
struct InsertErrors {
    index: usize,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    reason: Option<String>,
    location: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl From<InsertAllResponse> for InsertOutcome {
    fn from(response: InsertAllResponse) -> Self {
        let row_errors = response
            .insert_errors
            .into_iter()
            .flat_map(|entry| {
                let row_index = entry.index;
                let mut errors: Vec<RowError> = entry
                    .errors
                    .into_iter()
                    .map(|e| RowError {
                        row_index,
                        reason: e.reason,
                        location: e.location,
                        message: e.message.unwrap_or_default(),
                    })
                    .collect();
                if errors.is_empty() {
                    errors.push(RowError {
                        row_index,
                        reason: None,
                        location: None,
                        message: "row rejected".to_string(),
                    });
                }
                errors
            })
            .collect();
        InsertOutcome { row_errors }
    }
}

/// Warehouse writer using the BigQuery `tabledata.insertAll` REST endpoint.
#[derive(Debug, Clone)]
pub struct BigQueryWriter {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
    access_token: Option<String>,
    skip_invalid_rows: bool,
    ignore_unknown_values: bool,
}

impl BigQueryWriter {
    pub fn new(base_url: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            project_id: project_id.into(),
            access_token: None,
            skip_invalid_rows: false,
            ignore_unknown_values: false,
        }
    }

    pub fn from_config(config: &IngestConfig) -> Result<Self> {
        let mut writer = Self::new(&config.bigquery_url, config.require_project_id()?)
            .with_skip_invalid_rows(config.skip_invalid_rows)
            .with_ignore_unknown_values(config.ignore_unknown_values);
        if let Some(token) = &config.access_token {
            writer = writer.with_access_token(token);
        }
        Ok(writer)
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_skip_invalid_rows(mut self, skip: bool) -> Self {
        self.skip_invalid_rows = skip;
        self
    }

    pub fn with_ignore_unknown_values(mut self, ignore: bool) -> Self {
        self.ignore_unknown_values = ignore;
        self
    }

    fn insert_all_url(&self, destination: &Destination) -> String {
        format!(
            "{}/projects/{}/datasets/{}/tables/{}/insertAll",
            self.base_url.trim_end_matches('/'),
            self.project_id,
            destination.dataset,
            destination.table
        )
    }

    fn insert_all_request<'a>(&self, rows: &'a RecordBatch) -> InsertAllRequest<'a> {
        InsertAllRequest {
            skip_invalid_rows: self.skip_invalid_rows,
            ignore_unknown_values: self.ignore_unknown_values,
            rows: rows
                .iter()
                .map(|json| InsertAllRow {
                    insert_id: Uuid::new_v4().to_string(),
                    json,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl WarehouseWriter for BigQueryWriter {
    async fn insert_rows(
        &self,
        destination: &Destination,
        rows: &RecordBatch,
    ) -> Result<InsertOutcome> {
        if rows.is_empty() {
            debug!(destination = %destination, "no rows to insert");
            return Ok(InsertOutcome::default());
        }

        let mut request = self
            .client
            .post(self.insert_all_url(destination))
            .json(&self.insert_all_request(rows));
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or(body);
            warn!(destination = %destination, %status, "insertAll request rejected");
            return Err(IngestError::WarehouseRequest(format!(
                "status={status}, message={message}"
            )));
        }

        let outcome = InsertOutcome::from(response.json::<InsertAllResponse>().await?);
        debug!(
            destination = %destination,
            rows = rows.len(),
            row_errors = outcome.row_errors.len(),
            "insertAll completed"
        );
        Ok(outcome)
    }
}
