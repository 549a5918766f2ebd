use ingest_lambda::http_handler::function_handler;
use ingest_lambda::telemetry::init_tracing;
use ingest_lambda::trigger::HttpSource;
use ingest_lambda::{IngestConfig, Ingestor};
use lambda_http::{run, service_fn, Error};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = IngestConfig::from_env()?;
    init_tracing(&config.log_level);

    let source = HttpSource::new(config.require_source_bucket()?, &config.key_prefix);
    let ingestor = Ingestor::from_config(&config).await?;
    info!(
        destination = %ingestor.destination(),
        bucket = source.bucket(),
        "Starting HTTP ingest"
    );

    run(service_fn(|event| function_handler(&ingestor, &source, event))).await
}
