use lambda_runtime::{Error, LambdaEvent};
use tracing::{error, info, warn};

use crate::pipeline::{Ingestor, Outcome};
use crate::report::SKIPPED_MESSAGE;
use crate::trigger::IngestEvent;

/// Ingest every object named by a storage notification. Each record is an
/// independent invocation; the response holds one line per record.
pub async fn function_handler(
    event: LambdaEvent<IngestEvent>,
    ingestor: &Ingestor,
    key_prefix: &str,
) -> Result<String, Error> {
    let notifications = event.payload.into_notifications();
    if notifications.is_empty() {
        warn!("No records found in storage event");
        return Ok(SKIPPED_MESSAGE.to_string());
    }

    let mut messages = Vec::with_capacity(notifications.len());
    let mut failures = 0;
    for notification in notifications {
        let outcome = match notification {
            Ok(notification) => ingestor.ingest_notification(notification, key_prefix).await,
            Err(err) => {
                error!(error = %err, "Unusable storage event record");
                Outcome::Failed(err)
            }
        };
        if !outcome.is_success() {
            failures += 1;
        }
        messages.push(outcome.event_message());
    }

    info!(
        records = messages.len(),
        failures,
        "Finished processing storage event"
    );
    Ok(messages.join("\n"))
}
