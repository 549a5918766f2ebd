use aws_lambda_events::event::s3::{S3Event, S3EventRecord};
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{IngestError, Result};

/// Location of the object one invocation works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    container_name: String,
    object_key: String,
}

impl InvocationContext {
    pub fn new(container_name: impl Into<String>, object_key: impl Into<String>) -> Self {
        Self {
            container_name: container_name.into(),
            object_key: object_key.into(),
        }
    }

    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    pub fn object_key(&self) -> &str {
        &self.object_key
    }
}

/// An object-created notification reduced to the fields the function uses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObjectNotification {
    pub bucket: String,
    pub name: String,
}

/// Payload accepted by the event trigger: either a bare storage notification
/// or an S3 event notification.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum IngestEvent {
    Object(ObjectNotification),
    S3(S3Event),
}

impl IngestEvent {
    /// Notifications carried by the event, one per usable record.
    ///
    /// S3 records without a bucket or key are dropped with a warning. A key
    /// that does not decode to UTF-8 is kept as an error so it gets reported.
    pub fn into_notifications(self) -> Vec<Result<ObjectNotification>> {
        match self {
            IngestEvent::Object(notification) => vec![Ok(notification)],
            IngestEvent::S3(event) => event
                .records
                .iter()
                .filter_map(notification_from_record)
                .collect(),
        }
    }
}

fn notification_from_record(record: &S3EventRecord) -> Option<Result<ObjectNotification>> {
    match (&record.s3.bucket.name, &record.s3.object.key) {
        (Some(bucket), Some(key)) => Some(
            decode_object_key(key).map(|name| ObjectNotification {
                bucket: bucket.clone(),
                name,
            }),
        ),
        _ => {
            warn!(
                event_name = ?record.event_name,
                "S3 event record has no bucket name or object key"
            );
            None
        }
    }
}

/// S3 event keys are form-encoded: spaces arrive as `+`, everything else
/// as `%XX` escapes.
pub fn decode_object_key(key: &str) -> Result<String> {
    let key = key.replace('+', " ");
    percent_decode_str(&key)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| IngestError::Unexpected(format!("object key {key:?} is not valid UTF-8: {e}")))
}

/// Outcome of filtering an event notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerDecision {
    Proceed(InvocationContext),
    Skip,
}

/// Accept the notification only when its key starts with `key_prefix`.
pub fn filter_notification(notification: ObjectNotification, key_prefix: &str) -> TriggerDecision {
    if !notification.name.starts_with(key_prefix) {
        info!(
            bucket = %notification.bucket,
            file = %notification.name,
            "Skipping file {} as it is not in the '{}' folder",
            notification.name,
            key_prefix
        );
        return TriggerDecision::Skip;
    }

    info!(
        bucket = %notification.bucket,
        file = %notification.name,
        "Processing file {} from bucket {}",
        notification.name,
        notification.bucket
    );
    TriggerDecision::Proceed(InvocationContext::new(notification.bucket, notification.name))
}

/// Fixed source of objects named by HTTP requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSource {
    bucket: String,
    path_prefix: String,
}

impl HttpSource {
    pub fn new(bucket: impl Into<String>, path_prefix: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            path_prefix: path_prefix.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Resolve the `file` query parameter into an object location.
    pub fn context_for_file(&self, file: Option<&str>) -> Result<InvocationContext> {
        let file = file.filter(|f| !f.is_empty()).ok_or(IngestError::BadRequest)?;
        let key = format!("{}{}", self.path_prefix, file);

        info!(bucket = %self.bucket, file = %key, "Processing requested file");
        Ok(InvocationContext::new(&self.bucket, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s3_event_json(records: &[(&str, &str)]) -> String {
        let records: Vec<_> = records
            .iter()
            .map(|(bucket, key)| {
                serde_json::json!({
                    "eventVersion": "2.1",
                    "eventSource": "aws:s3",
                    "awsRegion": "eu-west-1",
                    "eventTime": "2024-06-25T07:53:27.192Z",
                    "eventName": "ObjectCreated:Put",
                    "userIdentity": { "principalId": "AWS:AIDAEXAMPLE" },
                    "requestParameters": { "sourceIPAddress": "10.0.0.1" },
                    "responseElements": {},
                    "s3": {
                        "s3SchemaVersion": "1.0",
                        "configurationId": "ingest",
                        "bucket": {
                            "name": bucket,
                            "ownerIdentity": { "principalId": "EXAMPLE" },
                            "arn": format!("arn:aws:s3:::{bucket}")
                        },
                        "object": {
                            "key": key,
                            "size": 128,
                            "eTag": "b21b84d653bb07b05b1e6b33684dc11b",
                            "sequencer": "0C0F6F405D6ED209E1"
                        }
                    }
                })
            })
            .collect();
        serde_json::json!({ "Records": records }).to_string()
    }

    #[test]
    fn test_bare_notification_is_accepted() {
        let event: IngestEvent =
            serde_json::from_str(r#"{"bucket": "raw", "name": "cloud-function/a.json", "size": "12"}"#)
                .unwrap();

        let notifications = event.into_notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(
            notifications[0].as_ref().unwrap(),
            &ObjectNotification {
                bucket: "raw".to_string(),
                name: "cloud-function/a.json".to_string(),
            }
        );
    }

    #[test]
    fn test_s3_event_records_are_decoded() {
        let json = s3_event_json(&[
            ("raw", "cloud-function/first+file.json"),
            ("raw", "cloud-function/caf%C3%A9.json"),
        ]);
        let event: IngestEvent = serde_json::from_str(&json).unwrap();

        let names: Vec<_> = event
            .into_notifications()
            .into_iter()
            .map(|n| n.unwrap().name)
            .collect();
        assert_eq!(
            names,
            vec!["cloud-function/first file.json", "cloud-function/café.json"]
        );
    }

    #[test]
    fn test_records_without_bucket_or_key_are_dropped() {
        let mut event: serde_json::Value = serde_json::from_str(&s3_event_json(&[
            ("raw", "cloud-function/keyless.json"),
            ("raw", "cloud-function/a.json"),
            ("", "cloud-function/bucketless.json"),
        ]))
        .unwrap();
        let records = event["Records"].as_array_mut().unwrap();
        records[0]["s3"]["object"].as_object_mut().unwrap().remove("key");
        records[2]["s3"]["bucket"].as_object_mut().unwrap().remove("name");

        let event: IngestEvent = serde_json::from_value(event).unwrap();
        let notifications = event.into_notifications();

        assert_eq!(notifications.len(), 1);
        assert_eq!(
            notifications[0].as_ref().unwrap().name,
            "cloud-function/a.json"
        );
    }

    #[test]
    fn test_invalid_key_encoding_is_reported() {
        let err = decode_object_key("cloud-function/%FF.json").unwrap_err();
        assert!(matches!(err, IngestError::Unexpected(_)));
    }

    #[test]
    fn test_filter_skips_other_prefixes() {
        let notification = ObjectNotification {
            bucket: "raw".to_string(),
            name: "exports/a.json".to_string(),
        };
        assert_eq!(
            filter_notification(notification, "cloud-function/"),
            TriggerDecision::Skip
        );
    }

    #[test]
    fn test_filter_proceeds_on_matching_prefix() {
        let notification = ObjectNotification {
            bucket: "raw".to_string(),
            name: "cloud-function/a.json".to_string(),
        };
        assert_eq!(
            filter_notification(notification, "cloud-function/"),
            TriggerDecision::Proceed(InvocationContext::new("raw", "cloud-function/a.json"))
        );
    }

    #[test]
    fn test_http_source_builds_prefixed_key() {
        let source = HttpSource::new("raw-landing", "cloud-function/");
        let context = source.context_for_file(Some("customers.json")).unwrap();

        assert_eq!(context.container_name(), "raw-landing");
        assert_eq!(context.object_key(), "cloud-function/customers.json");
    }

    #[test]
    fn test_http_source_rejects_missing_or_empty_file() {
        let source = HttpSource::new("raw-landing", "cloud-function/");

        assert!(matches!(
            source.context_for_file(None),
            Err(IngestError::BadRequest)
        ));
        assert!(matches!(
            source.context_for_file(Some("")),
            Err(IngestError::BadRequest)
        ));
    }
}
