use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use uuid::Uuid;

/// Tags every request with an `x-request-id` header and logs one line per
/// completed request with method, path, status and latency.
pub async fn request_log(mut req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let method = req.method().clone();
    let uri = req.uri().clone();

    if let Ok(value) = request_id.to_string().parse() {
        req.headers_mut().insert("x-request-id", value);
    }

    let start = Instant::now();
    let response = next.run(req).await;
    let latency = start.elapsed();

    tracing::info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = response.status().as_u16(),
        latency_ms = latency.as_millis() as u64,
        "request completed"
    );

    response
}
