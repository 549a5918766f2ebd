use tracing_subscriber::EnvFilter;

/// Install the JSON log subscriber used by both Lambda binaries.
pub fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        // CloudWatch adds the module context through the log group
        .with_target(false)
        .init();
}
