//! Comment storage over the delivery (reads) and management (writes) REST APIs.

use async_trait::async_trait;
use reqwest::{Url, header::CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::{CmsHttp, endpoint};
use crate::application::repos::{CommentStore, UpstreamError};
use crate::config::{CmsSettings, Secret};
use crate::domain::comments::{CommentEntry, CommentFields};

const MANAGEMENT_CONTENT_TYPE: &str = "application/vnd.contentful.management.v1+json";
const CONTENT_TYPE_HEADER: &str = "X-Contentful-Content-Type";
const VERSION_HEADER: &str = "X-Contentful-Version";

#[derive(Debug, Deserialize)]
struct EntryCollection {
    #[serde(default)]
    items: Vec<Option<CommentEntry>>,
}

pub struct RestCommentStore {
    http: CmsHttp,
    delivery_url: Url,
    management_url: Url,
    space_id: String,
    environment: String,
    content_type: String,
    delivery_token: Secret,
    management_token: Secret,
}

impl RestCommentStore {
    pub(crate) fn new(
        http: CmsHttp,
        settings: &CmsSettings,
        space_id: &str,
        delivery_token: Secret,
        management_token: Secret,
    ) -> Self {
        Self {
            http,
            delivery_url: settings.delivery_url.clone(),
            management_url: settings.management_url.clone(),
            space_id: space_id.to_string(),
            environment: settings.environment.clone(),
            content_type: settings.comment_content_type.clone(),
            delivery_token,
            management_token,
        }
    }

    fn entries_url(&self, base: &Url, tail: &[&str]) -> Result<Url, UpstreamError> {
        let mut segments = vec![
            "spaces",
            self.space_id.as_str(),
            "environments",
            self.environment.as_str(),
            "entries",
        ];
        segments.extend_from_slice(tail);
        endpoint(base, &segments)
    }
}

fn decode_entry(value: Value) -> Result<CommentEntry, UpstreamError> {
    serde_json::from_value(value).map_err(UpstreamError::decode)
}

#[async_trait]
impl CommentStore for RestCommentStore {
    async fn list_by_subject(&self, slug: &str) -> Result<Vec<CommentEntry>, UpstreamError> {
        let mut url = self.entries_url(&self.delivery_url, &[])?;
        url.query_pairs_mut()
            .append_pair("content_type", &self.content_type)
            .append_pair("fields.subject", slug)
            .append_pair("order", "sys.createdAt");

        let request = self
            .http
            .client()
            .get(url)
            .bearer_auth(self.delivery_token.expose());
        let body = self.http.send_json("delivery", request).await?;

        let collection: EntryCollection =
            serde_json::from_value(body).map_err(UpstreamError::decode)?;
        let entries: Vec<CommentEntry> = collection.items.into_iter().flatten().collect();
        debug!(
            target = "newsdesk::cms::comments",
            subject = slug,
            count = entries.len(),
            "listed comments"
        );
        Ok(entries)
    }

    async fn create_entry(&self, fields: &CommentFields) -> Result<CommentEntry, UpstreamError> {
        let url = self.entries_url(&self.management_url, &[])?;
        let request = self
            .http
            .client()
            .post(url)
            .bearer_auth(self.management_token.expose())
            .header(CONTENT_TYPE, MANAGEMENT_CONTENT_TYPE)
            .header(CONTENT_TYPE_HEADER, &self.content_type)
            .body(json!({ "fields": fields }).to_string());

        decode_entry(self.http.send_json("management", request).await?)
    }

    async fn publish_entry(&self, id: &str, version: u64) -> Result<CommentEntry, UpstreamError> {
        let url = self.entries_url(&self.management_url, &[id, "published"])?;
        let request = self
            .http
            .client()
            .put(url)
            .bearer_auth(self.management_token.expose())
            .header(VERSION_HEADER, version.to_string());

        decode_entry(self.http.send_json("management", request).await?)
    }
}
