//! HTTP adapters for the CMS content, delivery and management APIs.

use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde_json::Value;
use tracing::warn;

use crate::application::repos::{
    CommentStore, ContentRequest, ContentResponse, ContentSource, UpstreamError,
};
use crate::config::CmsSettings;
use crate::domain::comments::{CommentEntry, CommentFields};
use crate::infra::error::InfraError;
use crate::infra::telemetry::{METRIC_CMS_REQUEST_MS, METRIC_CMS_REQUEST_TOTAL};

mod comments;
mod graphql;

pub use comments::RestCommentStore;
pub use graphql::{GraphqlContentSource, render_query};

/// Content and comment adapters resolved from configuration.
#[derive(Clone)]
pub struct CmsAdapters {
    pub content: Arc<dyn ContentSource>,
    pub comments: Arc<dyn CommentStore>,
}

/// Build the adapters once at startup. Missing credentials swap in
/// [`UnconfiguredCms`] instead of failing the process.
pub fn build_adapters(settings: &CmsSettings) -> Result<CmsAdapters, InfraError> {
    let http = CmsHttp::new(settings)?;
    let unconfigured: Arc<UnconfiguredCms> = Arc::new(UnconfiguredCms);

    let content: Arc<dyn ContentSource> = match (&settings.space_id, &settings.delivery_token) {
        (Some(space_id), Some(token)) => Arc::new(GraphqlContentSource::new(
            http.clone(),
            &settings.graphql_url,
            space_id,
            &settings.environment,
            token.clone(),
            settings.preview_token.clone(),
        )?),
        _ => unconfigured.clone(),
    };

    let missing = settings.missing_credentials();
    let comments: Arc<dyn CommentStore> = match (
        &settings.space_id,
        &settings.delivery_token,
        &settings.management_token,
    ) {
        (Some(space_id), Some(delivery), Some(management)) => Arc::new(RestCommentStore::new(
            http,
            settings,
            space_id,
            delivery.clone(),
            management.clone(),
        )),
        _ => unconfigured,
    };

    if !missing.is_empty() {
        warn!(
            target = "newsdesk::cms",
            missing = ?missing,
            "CMS credentials incomplete; affected endpoints will answer 500"
        );
    }

    Ok(CmsAdapters { content, comments })
}

/// Shared HTTP client plus the bookkeeping every CMS call performs.
#[derive(Clone)]
pub(crate) struct CmsHttp {
    client: Client,
}

impl CmsHttp {
    pub(crate) fn new(settings: &CmsSettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(concat!("newsdesk/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self { client })
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    /// Send the request and return the JSON body of a successful response.
    pub(crate) async fn send_json(
        &self,
        api: &'static str,
        request: RequestBuilder,
    ) -> Result<Value, UpstreamError> {
        let started = Instant::now();
        let result = Self::execute(request).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(UpstreamError::Status { .. }) => "status",
            Err(UpstreamError::Timeout) => "timeout",
            Err(_) => "error",
        };
        counter!(METRIC_CMS_REQUEST_TOTAL, "api" => api, "outcome" => outcome).increment(1);
        histogram!(METRIC_CMS_REQUEST_MS, "api" => api)
            .record(started.elapsed().as_secs_f64() * 1000.0);

        result
    }

    async fn execute(request: RequestBuilder) -> Result<Value, UpstreamError> {
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }

        let bytes = response.bytes().await.map_err(map_transport_error)?;
        serde_json::from_slice(&bytes).map_err(UpstreamError::decode)
    }
}

pub(crate) fn map_transport_error(err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Timeout
    } else {
        // Strip the URL so tokens in query strings never reach logs.
        UpstreamError::Transport(err.without_url().to_string())
    }
}

/// Upstream error body: JSON when parseable, text otherwise.
async fn error_body(response: Response) -> Option<Value> {
    let text = response.text().await.ok()?;
    if text.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

/// Clone `base` and append path segments, percent-encoding each one.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, UpstreamError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| UpstreamError::Transport(format!("`{base}` cannot be a base url")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Stand-in used when credentials are missing: every call fails fast.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredCms;

#[async_trait]
impl ContentSource for UnconfiguredCms {
    async fn fetch(&self, _request: &ContentRequest) -> Result<ContentResponse, UpstreamError> {
        Err(UpstreamError::Misconfigured)
    }
}

#[async_trait]
impl CommentStore for UnconfiguredCms {
    fn is_configured(&self) -> bool {
        false
    }

    async fn list_by_subject(&self, _slug: &str) -> Result<Vec<CommentEntry>, UpstreamError> {
        Err(UpstreamError::Misconfigured)
    }

    async fn create_entry(&self, _fields: &CommentFields) -> Result<CommentEntry, UpstreamError> {
        Err(UpstreamError::Misconfigured)
    }

    async fn publish_entry(&self, _id: &str, _version: u64) -> Result<CommentEntry, UpstreamError> {
        Err(UpstreamError::Misconfigured)
    }
}
