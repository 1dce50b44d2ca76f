use axum::{
    extract::Request,
    http::{Method, Uri},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::info;

/// Access-log middleware: method, path, status, latency per request.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    info!(
        target: "access_log",
        "{} {} {}ms",
        format_request(&method, &uri),
        status.as_u16(),
        duration.as_millis(),
    );

    response
}

fn format_request(method: &Method, uri: &Uri) -> String {
    format!("{} {}", method, uri)
}
