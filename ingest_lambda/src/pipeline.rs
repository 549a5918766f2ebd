use std::sync::Arc;

use tracing::{error, info};

use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::records::parse_records;
use crate::storage::{ObjectFetcher, S3ObjectFetcher};
use crate::trigger::{filter_notification, InvocationContext, ObjectNotification, TriggerDecision};
use crate::warehouse::{BigQueryWriter, Destination, RowError, WarehouseWriter};

/// Terminal state of one invocation.
#[derive(Debug)]
pub enum Outcome {
    Skipped,
    Success { rows: usize },
    RowFailure { rows: usize, errors: Vec<RowError> },
    Failed(IngestError),
}

/// Moves one object from the object store into the warehouse table.
///
/// Holds no per-invocation state: a single instance serves every concurrent
/// invocation of the process.
#[derive(Clone)]
pub struct Ingestor {
    fetcher: Arc<dyn ObjectFetcher>,
    writer: Arc<dyn WarehouseWriter>,
    destination: Destination,
}

impl Ingestor {
    pub fn new(
        fetcher: Arc<dyn ObjectFetcher>,
        writer: Arc<dyn WarehouseWriter>,
        destination: Destination,
    ) -> Self {
        Self {
            fetcher,
            writer,
            destination,
        }
    }

    /// Build the process-wide ingestor with S3 storage and BigQuery clients.
    pub async fn from_config(config: &IngestConfig) -> Result<Self> {
        let writer = BigQueryWriter::from_config(config)?;
        let fetcher = S3ObjectFetcher::from_config(config).await;
        Ok(Self::new(
            Arc::new(fetcher),
            Arc::new(writer),
            config.destination(),
        ))
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Apply the key prefix filter, then ingest the object if it passes.
    pub async fn ingest_notification(
        &self,
        notification: ObjectNotification,
        key_prefix: &str,
    ) -> Outcome {
        match filter_notification(notification, key_prefix) {
            TriggerDecision::Skip => Outcome::Skipped,
            TriggerDecision::Proceed(context) => self.ingest(&context).await,
        }
    }

    /// Fetch, parse and insert the object named by `context`.
    pub async fn ingest(&self, context: &InvocationContext) -> Outcome {
        let outcome = match self.try_ingest(context).await {
            Ok((rows, errors)) if errors.is_empty() => Outcome::Success { rows },
            Ok((rows, errors)) => Outcome::RowFailure { rows, errors },
            Err(err) => Outcome::Failed(err),
        };
        self.log_outcome(context, &outcome);
        outcome
    }

    async fn try_ingest(&self, context: &InvocationContext) -> Result<(usize, Vec<RowError>)> {
        let payload = self.fetcher.fetch(context).await?;
        let records = parse_records(&payload)?;
        drop(payload);

        let inserted = self.writer.insert_rows(&self.destination, &records).await?;
        Ok((records.len(), inserted.row_errors))
    }

    fn log_outcome(&self, context: &InvocationContext, outcome: &Outcome) {
        let bucket = context.container_name();
        let key = context.object_key();
        match outcome {
            Outcome::Skipped => {}
            Outcome::Success { rows } => info!(
                bucket,
                key,
                rows,
                destination = %self.destination,
                "Successfully inserted data from {} into {}",
                key,
                self.destination
            ),
            Outcome::RowFailure { rows, errors } => error!(
                bucket,
                key,
                rows,
                rejected = errors.len(),
                "Encountered errors while inserting rows: {}",
                crate::report::format_row_errors(errors)
            ),
            Outcome::Failed(err) => error!(bucket, key, error = %err, "An error occurred: {}", err),
        }
    }
}
