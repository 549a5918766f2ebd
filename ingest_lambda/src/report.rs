//! Caller-facing messages for invocation outcomes.

use crate::pipeline::Outcome;
use crate::warehouse::RowError;

pub const SKIPPED_MESSAGE: &str = "Skipped";
pub const SUCCESS_MESSAGE: &str = "Success";
pub const HTTP_SUCCESS_MESSAGE: &str = "Successfully read file and inserted data into the warehouse.";

pub fn format_row_errors(errors: &[RowError]) -> String {
    let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
    format!("[{}]", details.join("; "))
}

fn row_failure_message(errors: &[RowError]) -> String {
    format!(
        "Failed to insert rows into the warehouse. Errors: {}",
        format_row_errors(errors)
    )
}

impl Outcome {
    /// Message returned by the event trigger. Event triggers have no status
    /// channel, so failures are only visible in the text.
    pub fn event_message(&self) -> String {
        match self {
            Outcome::Skipped => SKIPPED_MESSAGE.to_string(),
            Outcome::Success { .. } => SUCCESS_MESSAGE.to_string(),
            Outcome::RowFailure { errors, .. } => row_failure_message(errors),
            Outcome::Failed(err) => format!("Error: {err}"),
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Outcome::Skipped | Outcome::Success { .. } => 200,
            Outcome::RowFailure { .. } => 500,
            Outcome::Failed(err) => err.status_code(),
        }
    }

    pub fn http_message(&self) -> String {
        match self {
            Outcome::Success { .. } => HTTP_SUCCESS_MESSAGE.to_string(),
            other => other.event_message(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Skipped | Outcome::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestError;

    fn row_error(row_index: usize, location: &str, message: &str) -> RowError {
        RowError {
            row_index,
            reason: Some("invalid".to_string()),
            location: Some(location.to_string()),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_skip_and_success_messages() {
        assert_eq!(Outcome::Skipped.event_message(), "Skipped");
        assert_eq!(Outcome::Skipped.http_status(), 200);

        let success = Outcome::Success { rows: 4 };
        assert_eq!(success.event_message(), "Success");
        assert_eq!(success.http_status(), 200);
        assert_eq!(success.http_message(), HTTP_SUCCESS_MESSAGE);
        assert!(success.is_success());
    }

    #[test]
    fn test_row_failure_lists_every_error() {
        let outcome = Outcome::RowFailure {
            rows: 6,
            errors: vec![
                row_error(2, "age", "Cannot convert value to integer."),
                row_error(5, "email", "no such field: email."),
            ],
        };

        assert_eq!(outcome.http_status(), 500);
        assert!(!outcome.is_success());
        assert_eq!(
            outcome.event_message(),
            "Failed to insert rows into the warehouse. Errors: \
             [row 2: Cannot convert value to integer. (invalid at age); \
             row 5: no such field: email. (invalid at email)]"
        );
        assert_eq!(outcome.http_message(), outcome.event_message());
    }

    #[test]
    fn test_bad_request_is_400() {
        let outcome = Outcome::Failed(IngestError::BadRequest);

        assert_eq!(outcome.http_status(), 400);
        assert_eq!(
            outcome.http_message(),
            "Error: Missing 'file' query parameter."
        );
    }

    #[test]
    fn test_other_failures_are_500() {
        let outcome = Outcome::Failed(IngestError::ObjectNotFound {
            bucket: "raw".to_string(),
            key: "cloud-function/a.json".to_string(),
        });

        assert_eq!(outcome.http_status(), 500);
        assert_eq!(
            outcome.event_message(),
            "Error: object raw/cloud-function/a.json not found"
        );
    }
}
