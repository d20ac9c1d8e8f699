//! In-memory adapters used by unit tests across the application layer.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::application::repos::{
    CommentStore, ContentRequest, ContentResponse, ContentSource, EntryFilter, RawCollection,
    SortOrder, UpstreamError,
};
use crate::domain::comments::{CommentEntry, CommentFields, EntrySys};
use crate::domain::timestamps::parse_cms_timestamp;
use crate::domain::types::CollectionKind;

const DEFAULT_LIMIT: u32 = 100;

/// Evaluates collection queries against fixed entry lists the way the CMS would.
#[derive(Default)]
pub struct InMemoryContent {
    posts: Vec<Value>,
    notices: Vec<Value>,
    requests: Mutex<Vec<ContentRequest>>,
    failure: Mutex<Option<u16>>,
}

impl InMemoryContent {
    pub fn with_posts(entries: &[(&str, &str)]) -> Self {
        Self {
            posts: entries_from(entries),
            ..Self::default()
        }
    }

    pub fn with_notices(entries: &[(&str, &str)]) -> Self {
        Self {
            notices: entries_from(entries),
            ..Self::default()
        }
    }

    pub fn from_raw_posts(posts: Vec<Value>) -> Self {
        Self {
            posts,
            ..Self::default()
        }
    }

    pub fn and_notices(mut self, entries: &[(&str, &str)]) -> Self {
        self.notices = entries_from(entries);
        self
    }

    pub fn fail_with(&self, status: u16) {
        *self.failure.lock().expect("failure lock") = Some(status);
    }

    pub fn requests(&self) -> Vec<ContentRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    fn evaluate(&self, request: &ContentRequest) -> ContentResponse {
        let collections = request
            .collections
            .iter()
            .map(|query| {
                let source = match query.kind {
                    CollectionKind::Post => &self.posts,
                    CollectionKind::Notice => &self.notices,
                };

                let mut matching: Vec<Value> = source
                    .iter()
                    .filter(|entry| matches_filter(entry, &query.filter))
                    .cloned()
                    .collect();

                if let Some(order) = query.order {
                    matching.sort_by_key(date_of);
                    if order == SortOrder::DateDesc {
                        matching.reverse();
                    }
                }

                let total = matching.len() as u32;
                let skip = query.skip.unwrap_or(0);
                let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
                let items = matching
                    .into_iter()
                    .skip(skip as usize)
                    .take(limit as usize)
                    .collect();

                RawCollection {
                    items,
                    total,
                    limit,
                    skip,
                }
            })
            .collect();

        ContentResponse { collections }
    }
}

#[async_trait]
impl ContentSource for InMemoryContent {
    async fn fetch(&self, request: &ContentRequest) -> Result<ContentResponse, UpstreamError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        if let Some(status) = *self.failure.lock().expect("failure lock") {
            return Err(UpstreamError::Status { status, body: None });
        }
        Ok(self.evaluate(request))
    }
}

fn entries_from(entries: &[(&str, &str)]) -> Vec<Value> {
    entries
        .iter()
        .map(|(slug, date)| json!({"slug": slug, "title": format!("Title {slug}"), "date": date}))
        .collect()
}

fn date_of(entry: &Value) -> Option<time::OffsetDateTime> {
    entry
        .get("date")
        .and_then(Value::as_str)
        .and_then(parse_cms_timestamp)
}

fn slug_of(entry: &Value) -> Option<&str> {
    entry.get("slug").and_then(Value::as_str)
}

fn matches_filter(entry: &Value, filter: &EntryFilter) -> bool {
    match filter {
        EntryFilter::SlugExists => slug_of(entry).is_some(),
        EntryFilter::SlugEquals(slug) => slug_of(entry) == Some(slug.as_str()),
        EntryFilter::SlugNotIn(slugs) => {
            slug_of(entry).is_some_and(|slug| !slugs.iter().any(|s| s == slug))
        }
        EntryFilter::DateAfter(bound) => {
            slug_of(entry).is_some() && date_of(entry).is_some_and(|date| date > *bound)
        }
        EntryFilter::DateBefore(bound) => {
            slug_of(entry).is_some() && date_of(entry).is_some_and(|date| date < *bound)
        }
    }
}

/// Which step of the comment write path should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentFailure {
    List(u16),
    Create(u16),
    Publish(u16),
}

#[derive(Default)]
pub struct InMemoryComments {
    pub unconfigured: bool,
    entries: Mutex<Vec<CommentEntry>>,
    created: Mutex<Vec<CommentFields>>,
    published: Mutex<Vec<(String, u64)>>,
    failure: Mutex<Option<CommentFailure>>,
    calls: Mutex<usize>,
}

impl InMemoryComments {
    pub fn unconfigured() -> Self {
        Self {
            unconfigured: true,
            ..Self::default()
        }
    }

    pub fn with_entries(entries: Vec<CommentEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
            ..Self::default()
        }
    }

    pub fn fail(&self, failure: CommentFailure) {
        *self.failure.lock().expect("failure lock") = Some(failure);
    }

    pub fn created(&self) -> Vec<CommentFields> {
        self.created.lock().expect("created lock").clone()
    }

    pub fn published(&self) -> Vec<(String, u64)> {
        self.published.lock().expect("published lock").clone()
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().expect("calls lock")
    }

    fn record_call(&self) {
        *self.calls.lock().expect("calls lock") += 1;
    }

    fn failure(&self) -> Option<CommentFailure> {
        *self.failure.lock().expect("failure lock")
    }
}

#[async_trait]
impl CommentStore for InMemoryComments {
    fn is_configured(&self) -> bool {
        !self.unconfigured
    }

    async fn list_by_subject(&self, slug: &str) -> Result<Vec<CommentEntry>, UpstreamError> {
        self.record_call();
        if let Some(CommentFailure::List(status)) = self.failure() {
            return Err(UpstreamError::Status { status, body: None });
        }
        let entries = self.entries.lock().expect("entries lock");
        Ok(entries
            .iter()
            .filter(|entry| {
                entry
                    .fields
                    .subject
                    .as_ref()
                    .and_then(|subject| subject.resolve_string("en-US"))
                    .as_deref()
                    == Some(slug)
            })
            .cloned()
            .collect())
    }

    async fn create_entry(&self, fields: &CommentFields) -> Result<CommentEntry, UpstreamError> {
        self.record_call();
        if let Some(CommentFailure::Create(status)) = self.failure() {
            return Err(UpstreamError::Status {
                status,
                body: Some(json!({"message": "create rejected"})),
            });
        }
        let mut created = self.created.lock().expect("created lock");
        created.push(fields.clone());
        let entry = CommentEntry {
            sys: EntrySys {
                id: format!("entry-{}", created.len()),
                created_at: "2024-05-01T00:00:00.000Z".to_string(),
                version: Some(1),
            },
            fields: fields.clone(),
        };
        self.entries.lock().expect("entries lock").push(entry.clone());
        Ok(entry)
    }

    async fn publish_entry(&self, id: &str, version: u64) -> Result<CommentEntry, UpstreamError> {
        self.record_call();
        if let Some(CommentFailure::Publish(status)) = self.failure() {
            return Err(UpstreamError::Status {
                status,
                body: Some(json!({"message": "version mismatch"})),
            });
        }
        self.published
            .lock()
            .expect("published lock")
            .push((id.to_string(), version));
        let entries = self.entries.lock().expect("entries lock");
        let mut entry = entries
            .iter()
            .find(|entry| entry.sys.id == id)
            .cloned()
            .ok_or(UpstreamError::Status {
                status: 404,
                body: None,
            })?;
        entry.sys.version = Some(version + 1);
        Ok(entry)
    }
}
