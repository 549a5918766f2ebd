use async_trait::async_trait;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use tracing::debug;

use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::trigger::InvocationContext;

/// Reads whole objects from an object store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectFetcher: Send + Sync {
    async fn fetch(&self, context: &InvocationContext) -> Result<Bytes>;
}

/// Object fetcher backed by the S3 API. Also reaches S3-compatible stores,
/// such as Cloud Storage's XML API, through an endpoint override.
#[derive(Debug, Clone)]
pub struct S3ObjectFetcher {
    client: S3Client,
    max_object_bytes: Option<u64>,
}

impl S3ObjectFetcher {
    pub fn new(client: S3Client, max_object_bytes: Option<u64>) -> Self {
        Self {
            client,
            max_object_bytes,
        }
    }

    pub async fn from_config(config: &IngestConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::v2025_01_17());
        if let Some(region) = &config.storage_region {
            loader = loader.region(Region::new(region.clone()));
        }
        let shared_config = loader.load().await;

        Self::new(
            S3Client::from_conf(s3_config(&shared_config, config).build()),
            config.max_object_bytes,
        )
    }

    fn storage_error(context: &InvocationContext, message: String) -> IngestError {
        IngestError::Storage {
            bucket: context.container_name().to_string(),
            key: context.object_key().to_string(),
            message,
        }
    }
}

/// S3 client settings layered over the shared AWS config. A custom endpoint
/// switches to path-style addressing, which S3-compatible stores expect.
fn s3_config(shared_config: &SdkConfig, config: &IngestConfig) -> aws_sdk_s3::config::Builder {
    let mut builder = aws_sdk_s3::config::Builder::from(shared_config);
    if let Some(region) = &config.storage_region {
        builder = builder.region(Region::new(region.clone()));
    }
    if let Some(endpoint_url) = &config.storage_endpoint_url {
        builder = builder.endpoint_url(endpoint_url).force_path_style(true);
    }
    builder
}

#[async_trait]
impl ObjectFetcher for S3ObjectFetcher {
    async fn fetch(&self, context: &InvocationContext) -> Result<Bytes> {
        let output = self
            .client
            .get_object()
            .bucket(context.container_name())
            .key(context.object_key())
            .send()
            .await
            .map_err(|err| {
                if err.as_service_error().is_some_and(|e| e.is_no_such_key()) {
                    IngestError::ObjectNotFound {
                        bucket: context.container_name().to_string(),
                        key: context.object_key().to_string(),
                    }
                } else {
                    Self::storage_error(context, DisplayErrorContext(&err).to_string())
                }
            })?;

        if let (Some(limit), Some(size)) = (self.max_object_bytes, output.content_length()) {
            let size = u64::try_from(size).unwrap_or_default();
            if size > limit {
                return Err(IngestError::ObjectTooLarge {
                    bucket: context.container_name().to_string(),
                    key: context.object_key().to_string(),
                    size,
                    limit,
                });
            }
        }

        let payload = output
            .body
            .collect()
            .await
            .map_err(|err| Self::storage_error(context, err.to_string()))?
            .into_bytes();

        debug!(
            bucket = %context.container_name(),
            key = %context.object_key(),
            bytes = payload.len(),
            "fetched object"
        );
        Ok(payload)
    }
}
