use ingest_lambda::event_handler::function_handler;
use ingest_lambda::telemetry::init_tracing;
use ingest_lambda::{IngestConfig, Ingestor};
use lambda_runtime::{run, service_fn, Error};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = IngestConfig::from_env()?;
    init_tracing(&config.log_level);

    let ingestor = Ingestor::from_config(&config).await?;
    let key_prefix = config.key_prefix.as_str();
    info!(
        destination = %ingestor.destination(),
        key_prefix,
        "Starting storage event ingest"
    );

    run(service_fn(|event| function_handler(event, &ingestor, key_prefix))).await
}
