//! Draft-mode toggles and cache revalidation.

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::types::CollectionKind;

use super::{ApiError, DRAFT_COOKIE, HttpState, secret_matches};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct SecretQuery {
    secret: Option<String>,
    tag: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct Revalidated {
    revalidated: bool,
    tag: &'static str,
    dropped: usize,
}

pub(super) async fn enable_draft(
    State(state): State<HttpState>,
    Query(query): Query<SecretQuery>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let secret = state
        .preview_secret
        .as_ref()
        .filter(|expected| secret_matches(Some(*expected), query.secret.as_deref()))
        .ok_or_else(|| ApiError::unauthorized("infra::http::draft::enable", "Invalid token"))?;

    let cookie = Cookie::build((DRAFT_COOKIE, secret.expose().to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    info!(target = "newsdesk::http::draft", "draft mode enabled");
    Ok((jar.add(cookie), "Draft mode is enabled"))
}

pub(super) async fn disable_draft(jar: CookieJar) -> impl IntoResponse {
    (
        jar.remove(Cookie::build(DRAFT_COOKIE).path("/")),
        "Draft mode is disabled",
    )
}

pub(super) async fn revalidate(
    State(state): State<HttpState>,
    Query(query): Query<SecretQuery>,
) -> Result<Json<Revalidated>, ApiError> {
    const SOURCE: &str = "infra::http::draft::revalidate";

    if !secret_matches(state.revalidate_secret.as_ref(), query.secret.as_deref()) {
        return Err(ApiError::unauthorized(SOURCE, "Invalid token"));
    }

    let kind = query
        .tag
        .as_deref()
        .map(str::trim)
        .and_then(CollectionKind::from_cache_tag)
        .ok_or_else(|| ApiError::bad_request(SOURCE, "Unknown cache tag."))?;

    let tag = kind.cache_tag();
    let dropped = state.cache.invalidate_tag(tag).await;
    Ok(Json(Revalidated {
        revalidated: true,
        tag,
        dropped,
    }))
}
