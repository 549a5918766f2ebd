use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};
use crate::warehouse::Destination;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IngestConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // Destination
    /// Warehouse dataset receiving the rows
    #[serde(default = "default_dataset")]
    pub dataset: String,

    /// Warehouse table receiving the rows
    #[serde(default = "default_table")]
    pub table: String,

    // Source
    /// Object key prefix. Filters event notifications and is prepended to the
    /// `file` query parameter of HTTP requests.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Bucket read by the HTTP trigger
    #[serde(default)]
    pub source_bucket: Option<String>,

    /// Refuse objects larger than this many bytes
    #[serde(default)]
    pub max_object_bytes: Option<u64>,

    /// Endpoint override for S3-compatible stores
    #[serde(default)]
    pub storage_endpoint_url: Option<String>,

    #[serde(default)]
    pub storage_region: Option<String>,

    // BigQuery
    #[serde(default)]
    pub project_id: Option<String>,

    #[serde(default = "default_bigquery_url")]
    pub bigquery_url: String,

    /// Pre-provisioned OAuth bearer token
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub skip_invalid_rows: bool,

    #[serde(default)]
    pub ignore_unknown_values: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_dataset() -> String {
    "BQWorkshop".to_string()
}

fn default_table() -> String {
    "customers".to_string()
}

fn default_key_prefix() -> String {
    "cloud-function/".to_string()
}

fn default_bigquery_url() -> String {
    "https://bigquery.googleapis.com/bigquery/v2".to_string()
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dataset: default_dataset(),
            table: default_table(),
            key_prefix: default_key_prefix(),
            source_bucket: None,
            max_object_bytes: None,
            storage_endpoint_url: None,
            storage_region: None,
            project_id: None,
            bigquery_url: default_bigquery_url(),
            access_token: None,
            skip_invalid_rows: false,
            ignore_unknown_values: false,
        }
    }
}

impl IngestConfig {
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("INGEST"))
            .build()?
            .try_deserialize()
    }

    pub fn destination(&self) -> Destination {
        Destination::new(&self.dataset, &self.table)
    }

    pub fn require_source_bucket(&self) -> Result<&str> {
        self.source_bucket
            .as_deref()
            .filter(|bucket| !bucket.is_empty())
            .ok_or(IngestError::MissingConfig("INGEST_SOURCE_BUCKET"))
    }

    pub fn require_project_id(&self) -> Result<&str> {
        self.project_id
            .as_deref()
            .filter(|project| !project.is_empty())
            .ok_or(IngestError::MissingConfig("INGEST_PROJECT_ID"))
    }
}
