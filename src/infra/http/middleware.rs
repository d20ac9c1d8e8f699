use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tracing::{error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext {
        request_id: Uuid::new_v4().to_string(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

/// Warn on 4xx and error on 5xx, using the [`ErrorReport`] attached by the handler.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        let elapsed_ms = start.elapsed().as_millis();
        let (source, messages) = match response.extensions_mut().remove::<ErrorReport>() {
            Some(report) => (report.source, report.messages),
            None => ("unknown", Vec::new()),
        };
        let detail = messages
            .first()
            .cloned()
            .unwrap_or_else(|| "no diagnostic available".to_string());

        // Query strings are left out: they carry draft and revalidation secrets.
        if status.is_server_error() {
            error!(
                target = "newsdesk::http::response",
                status = status.as_u16(),
                method = %method,
                path = %path,
                elapsed_ms,
                source,
                detail = %detail,
                chain = ?messages,
                request_id,
                "request failed",
            );
        } else {
            warn!(
                target = "newsdesk::http::response",
                status = status.as_u16(),
                method = %method,
                path = %path,
                elapsed_ms,
                source,
                detail = %detail,
                chain = ?messages,
                request_id,
                "client request error",
            );
        }
    }

    response
}
