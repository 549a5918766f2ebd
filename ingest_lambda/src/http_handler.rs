use lambda_http::{Body, Error, Request, RequestExt, Response};
use tracing::warn;

use crate::pipeline::{Ingestor, Outcome};
use crate::trigger::HttpSource;

/// Ingest the object named by the `file` query parameter.
pub async fn function_handler(
    ingestor: &Ingestor,
    source: &HttpSource,
    event: Request,
) -> Result<Response<Body>, Error> {
    let params = event.query_string_parameters();
    let outcome = match source.context_for_file(params.first("file")) {
        Ok(context) => ingestor.ingest(&context).await,
        Err(err) => {
            warn!(error = %err, "Rejecting request");
            Outcome::Failed(err)
        }
    };

    Ok(Response::builder()
        .status(outcome.http_status())
        .header("content-type", "text/plain; charset=utf-8")
        .body(Body::Text(outcome.http_message()))?)
}
