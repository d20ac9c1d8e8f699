use axum::{
    extract::State,
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};

use super::{ApiError, HttpState};

pub(super) async fn sitemap(State(state): State<HttpState>) -> Response {
    match state.sitemap.sitemap_xml().await {
        Ok(body) => text_response(body, "application/xml"),
        Err(err) => ApiError::upstream(
            "infra::http::public::sitemap",
            "Failed to generate sitemap.",
            &err,
        )
        .into_response(),
    }
}

pub(super) async fn robots_txt(State(state): State<HttpState>) -> Response {
    text_response(state.sitemap.robots_txt(), "text/plain; charset=utf-8")
}

pub(super) async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub(super) async fn fallback() -> ApiError {
    ApiError::not_found("infra::http::public::fallback", "Not found.")
}

fn text_response(body: String, content_type: &'static str) -> Response {
    let mut response = body.into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=3600"),
    );
    response
}
