//! Loads JSON objects from an object store into a warehouse table.
//!
//! Two Lambda entry points share one pipeline: the event handler reacts to
//! object-created notifications, the HTTP handler ingests the object named by
//! a `file` query parameter.

pub mod config;
pub mod error;
pub mod event_handler;
pub mod http_handler;
pub mod pipeline;
pub mod records;
pub mod report;
pub mod storage;
pub mod telemetry;
pub mod trigger;
pub mod warehouse;

pub use config::IngestConfig;
pub use error::{IngestError, Result};
pub use pipeline::{Ingestor, Outcome};
