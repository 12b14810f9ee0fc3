use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header::CONTENT_LENGTH, Request},
    middleware::Next,
    response::Response,
    Error as AxumError,
};
use std::time::Instant;

use crate::middleware::request_id::RequestId;

const MAX_BUFFERED_BODY_BYTES: usize = 64 * 1024;
const MAX_LOGGED_BODY_BYTES: usize = 2048;

/// Logs every 4xx/5xx response with its body preview. 4xx goes to warn,
/// 5xx to error. The body is buffered and forwarded unchanged.
pub async fn log_error_responses(req: Request<Body>, next: Next) -> Response {
    let context = RequestContext {
        method: req.method().to_string(),
        // Live-view paths carry the share token; only the route shape is logged.
        path: redact_share_token(req.uri().path()),
        request_id: req.extensions().get::<RequestId>().map(|id| id.0.clone()),
        started: Instant::now(),
    };

    let response = next.run(req).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    match buffer_body(body).await {
        Ok((bytes, preview)) => {
            context.log(status.as_u16(), &preview, None);
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(err) => {
            parts.headers.remove(CONTENT_LENGTH);
            context.log(status.as_u16(), "", Some(err));
            Response::from_parts(parts, Body::empty())
        }
    }
}

struct RequestContext {
    method: String,
    path: String,
    request_id: Option<String>,
    started: Instant,
}

impl RequestContext {
    fn log(&self, status: u16, body_preview: &str, body_error: Option<AxumError>) {
        let latency_ms = self.started.elapsed().as_millis() as u64;
        let request_id = self.request_id.as_deref().unwrap_or("-");
        let method = self.method.as_str();
        let path = self.path.as_str();

        match (status >= 500, body_error) {
            (true, Some(err)) => tracing::error!(
                status, method, path, request_id, latency_ms, error = ?err,
                "Failed to read error response body"
            ),
            (false, Some(err)) => tracing::warn!(
                status, method, path, request_id, latency_ms, error = ?err,
                "Failed to read error response body"
            ),
            (true, None) => tracing::error!(
                status, method, path, request_id, latency_ms, body = body_preview,
                "Request completed with error status"
            ),
            (false, None) => tracing::warn!(
                status, method, path, request_id, latency_ms, body = body_preview,
                "Request completed with error status"
            ),
        }
    }
}

async fn buffer_body(body: Body) -> Result<(Bytes, String), AxumError> {
    let bytes = to_bytes(body, MAX_BUFFERED_BODY_BYTES).await?;
    let preview = if bytes.len() > MAX_LOGGED_BODY_BYTES {
        let slice = bytes.slice(0..MAX_LOGGED_BODY_BYTES);
        format!(
            "{}... (truncated, {} bytes total)",
            String::from_utf8_lossy(&slice),
            bytes.len()
        )
    } else {
        String::from_utf8_lossy(&bytes).to_string()
    };
    Ok((bytes, preview))
}

fn redact_share_token(path: &str) -> String {
    for prefix in ["/api/sos/live/", "/live/"] {
        if let Some(rest) = path.strip_prefix(prefix) {
            if !rest.is_empty() {
                return format!("{}{{token}}", prefix);
            }
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};
    use tower::ServiceExt;

    #[test]
    fn share_tokens_are_redacted_from_logged_paths() {
        assert_eq!(redact_share_token("/api/sos/live/abc123"), "/api/sos/live/{token}");
        assert_eq!(redact_share_token("/live/abc123"), "/live/{token}");
        assert_eq!(redact_share_token("/api/sos/start"), "/api/sos/start");
    }

    #[tokio::test]
    async fn error_body_is_forwarded_unchanged() {
        let app = Router::new()
            .route(
                "/fail",
                get(|| async { (StatusCode::NOT_FOUND, "missing thing") }),
            )
            .layer(axum::middleware::from_fn(log_error_responses));

        let response = app
            .oneshot(Request::builder().uri("/fail").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"missing thing");
    }
}
