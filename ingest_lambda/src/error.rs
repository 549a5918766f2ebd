use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Missing 'file' query parameter.")]
    BadRequest,

    #[error("object {bucket}/{key} not found")]
    ObjectNotFound { bucket: String, key: String },

    #[error("object {bucket}/{key} is {size} bytes, above the {limit} byte limit")]
    ObjectTooLarge {
        bucket: String,
        key: String,
        size: u64,
        limit: u64,
    },

    #[error("failed to read object {bucket}/{key}: {message}")]
    Storage {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("object content is not valid UTF-8: {0}")]
    Decode(#[from] std::str::Utf8Error),

    #[error("object content is not a JSON array of records: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("warehouse insert request failed: {0}")]
    WarehouseRequest(String),

    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error("{0}")]
    Unexpected(String),
}

impl IngestError {
    /// HTTP status reported for this error by the HTTP trigger.
    pub fn status_code(&self) -> u16 {
        match self {
            IngestError::BadRequest => 400,
            _ => 500,
        }
    }
}

impl From<reqwest::Error> for IngestError {
    fn from(err: reqwest::Error) -> Self {
        IngestError::WarehouseRequest(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
