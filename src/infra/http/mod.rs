//! Axum router: JSON content and comment APIs plus the public site files.

mod comments;
mod content;
mod draft;
mod error;
mod middleware;
mod public;


use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use subtle::ConstantTimeEq;

pub use error::{ApiError, MISCONFIGURED};
pub use middleware::RequestContext;

use crate::application::{
    comments::CommentService, content::ContentClient, site::SiteService, sitemap::SitemapService,
};
use crate::config::{Secret, Settings};
use crate::infra::{cache::ContentCache, cms::CmsAdapters};

/// Name of the cookie that switches reads to preview content.
pub const DRAFT_COOKIE: &str = "newsdesk_draft";

#[derive(Clone)]
pub struct HttpState {
    pub site: Arc<SiteService>,
    pub comments: Arc<CommentService>,
    pub sitemap: Arc<SitemapService>,
    pub cache: Arc<ContentCache>,
    pub preview_secret: Option<Secret>,
    pub revalidate_secret: Option<Secret>,
}

impl HttpState {
    /// Wire the services over the resolved adapters. Caching is off in
    /// development mode.
    pub fn new(settings: &Settings, adapters: CmsAdapters) -> Self {
        let cache = Arc::new(ContentCache::new(
            adapters.content,
            !settings.content.development,
            settings.content.cache_capacity,
        ));
        let content = ContentClient::new(cache.clone());
        let site = SiteService::new(content, settings.content.adjacency);
        let sitemap = SitemapService::new(site.pagination().clone(), &settings.site.url);
        let comments = CommentService::new(adapters.comments, settings.cms.default_locale.clone());

        Self {
            site: Arc::new(site),
            comments: Arc::new(comments),
            sitemap: Arc::new(sitemap),
            cache,
            preview_secret: settings.content.preview_secret.clone(),
            revalidate_secret: settings.content.revalidate_secret.clone(),
        }
    }

    /// True when the request carries a draft cookie minted with the current
    /// preview secret.
    pub fn is_preview(&self, jar: &CookieJar) -> bool {
        jar.get(DRAFT_COOKIE)
            .is_some_and(|cookie| secret_matches(self.preview_secret.as_ref(), Some(cookie.value())))
    }
}

/// Constant-time comparison; an unset secret never matches.
pub(crate) fn secret_matches(expected: Option<&Secret>, provided: Option<&str>) -> bool {
    match (expected, provided) {
        (Some(expected), Some(provided)) => expected
            .expose()
            .as_bytes()
            .ct_eq(provided.as_bytes())
            .into(),
        _ => false,
    }
}

pub fn build_router(state: HttpState) -> Router {
    let api = Router::new()
        .route(
            "/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route("/home", get(content::home))
        .route("/posts", get(content::posts))
        .route("/posts/{slug}", get(content::post_detail))
        .route("/news", get(content::news))
        .route("/news/{slug}", get(content::notice_detail))
        .route("/enable-draft", get(draft::enable_draft))
        .route("/disable-draft", get(draft::disable_draft))
        .route("/revalidate", post(draft::revalidate));

    Router::new()
        .nest("/api", api)
        .route("/sitemap.xml", get(public::sitemap))
        .route("/robots.txt", get(public::robots_txt))
        .route("/_health", get(public::health))
        .fallback(public::fallback)
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}
