use axum::{
    Json,
    extract::{Path, Query, State},
};
use axum_extra::extract::CookieJar;
use newsdesk_api_types::PageEnvelope;
use serde::Deserialize;

use crate::application::{
    pagination::PageWindow,
    site::{HomeDigest, NoticePage, PostPage},
};
use crate::domain::entities::{NoticeSummary, Post};

use super::{ApiError, HttpState};

const FETCH_FAILED: &str = "Failed to fetch content.";

/// Raw news query. Values are parsed leniently so `?page=abc` falls back to
/// the first page instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct NewsQuery {
    page: Option<String>,
    limit: Option<String>,
}

impl NewsQuery {
    fn window(&self) -> PageWindow {
        let page = self
            .page
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u32>().ok());
        let limit = self
            .limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok());
        PageWindow::for_page(page, limit)
    }
}

pub(super) async fn home(
    State(state): State<HttpState>,
    jar: CookieJar,
) -> Result<Json<HomeDigest>, ApiError> {
    state
        .site
        .home(state.is_preview(&jar))
        .await
        .map(Json)
        .map_err(|err| ApiError::upstream("infra::http::content::home", FETCH_FAILED, &err))
}

pub(super) async fn posts(
    State(state): State<HttpState>,
    jar: CookieJar,
) -> Result<Json<Vec<Post>>, ApiError> {
    state
        .site
        .posts(state.is_preview(&jar))
        .await
        .map(Json)
        .map_err(|err| ApiError::upstream("infra::http::content::posts", FETCH_FAILED, &err))
}

pub(super) async fn post_detail(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
    jar: CookieJar,
) -> Result<Json<PostPage>, ApiError> {
    const SOURCE: &str = "infra::http::content::post_detail";

    match state.site.post(&slug, state.is_preview(&jar)).await {
        Ok(Some(page)) => Ok(Json(page)),
        Ok(None) => Err(ApiError::not_found(SOURCE, "Post not found.")),
        Err(err) => Err(ApiError::upstream(SOURCE, FETCH_FAILED, &err)),
    }
}

pub(super) async fn news(
    State(state): State<HttpState>,
    Query(query): Query<NewsQuery>,
    jar: CookieJar,
) -> Result<Json<PageEnvelope<NoticeSummary>>, ApiError> {
    const SOURCE: &str = "infra::http::content::news";

    let page = state
        .site
        .news(state.is_preview(&jar), query.window())
        .await
        .map_err(|err| ApiError::upstream(SOURCE, FETCH_FAILED, &err))?
        .ok_or_else(|| ApiError::not_found(SOURCE, "Page not found."))?;

    Ok(Json(PageEnvelope {
        page: page.page_number(),
        page_count: page.page_count(),
        total: page.total,
        limit: page.limit,
        skip: page.skip,
        items: page.items,
    }))
}

pub(super) async fn notice_detail(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
    jar: CookieJar,
) -> Result<Json<NoticePage>, ApiError> {
    const SOURCE: &str = "infra::http::content::notice_detail";

    match state.site.notice(&slug, state.is_preview(&jar)).await {
        Ok(Some(page)) => Ok(Json(page)),
        Ok(None) => Err(ApiError::not_found(SOURCE, "Notice not found.")),
        Err(err) => Err(ApiError::upstream(SOURCE, FETCH_FAILED, &err)),
    }
}
