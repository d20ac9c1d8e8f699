//! Traits describing the CMS adapters and the query model they accept.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::{
    comments::{CommentEntry, CommentFields},
    entities::Selection,
    types::CollectionKind,
};

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream responded with status {status}")]
    Status { status: u16, body: Option<Value> },
    #[error("upstream request timed out")]
    Timeout,
    #[error("upstream transport error: {0}")]
    Transport(String),
    #[error("failed to decode upstream response: {0}")]
    Decode(String),
    #[error("upstream credentials are not configured")]
    Misconfigured,
}

impl UpstreamError {
    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryFilter {
    SlugExists,
    SlugEquals(String),
    SlugNotIn(Vec<String>),
    /// Entries with a slug dated strictly after the bound.
    DateAfter(OffsetDateTime),
    /// Entries with a slug dated strictly before the bound.
    DateBefore(OffsetDateTime),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    DateAsc,
    DateDesc,
}

/// One collection selection inside a content request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionQuery {
    pub alias: Option<&'static str>,
    pub kind: CollectionKind,
    pub selection: Selection,
    pub filter: EntryFilter,
    pub order: Option<SortOrder>,
    pub limit: Option<u32>,
    pub skip: Option<u32>,
    pub with_totals: bool,
}

impl CollectionQuery {
    pub fn new(kind: CollectionKind, selection: Selection, filter: EntryFilter) -> Self {
        Self {
            alias: None,
            kind,
            selection,
            filter,
            order: None,
            limit: None,
            skip: None,
            with_totals: false,
        }
    }

    pub fn aliased(mut self, alias: &'static str) -> Self {
        self.alias = Some(alias);
        self
    }

    pub fn ordered(mut self, order: SortOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u32) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn with_totals(mut self) -> Self {
        self.with_totals = true;
        self
    }

    /// Key under which the response data carries this collection.
    pub fn response_key(&self) -> &'static str {
        self.alias.unwrap_or_else(|| self.kind.collection_field())
    }
}

/// A single round trip to the content endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentRequest {
    pub preview: bool,
    pub collections: Vec<CollectionQuery>,
}

impl ContentRequest {
    pub fn single(preview: bool, query: CollectionQuery) -> Self {
        Self {
            preview,
            collections: vec![query],
        }
    }

    /// Cache tag of the request; every collection in one request shares a kind.
    pub fn cache_tag(&self) -> &'static str {
        self.collections
            .first()
            .map(|query| query.kind.cache_tag())
            .unwrap_or("content")
    }
}

/// Raw collection envelope before items are decoded into entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCollection {
    pub items: Vec<Value>,
    pub total: u32,
    pub limit: u32,
    pub skip: u32,
}

impl RawCollection {
    /// Read `{items, total, limit, skip}` leniently: absent parts become empty or zero.
    pub fn from_value(value: Option<&Value>) -> Self {
        let Some(value) = value else {
            return Self::default();
        };
        let number = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0)
        };
        let items = value
            .get("items")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter(|item| !item.is_null()).cloned().collect())
            .unwrap_or_default();

        Self {
            items,
            total: number("total"),
            limit: number("limit"),
            skip: number("skip"),
        }
    }
}

/// Collections returned for a request, in request order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentResponse {
    pub collections: Vec<RawCollection>,
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self, request: &ContentRequest) -> Result<ContentResponse, UpstreamError>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Whether credentials for the comment APIs are present.
    fn is_configured(&self) -> bool {
        true
    }

    /// Published comments whose subject equals `slug`, oldest first.
    async fn list_by_subject(&self, slug: &str) -> Result<Vec<CommentEntry>, UpstreamError>;

    /// Create an unpublished entry and return it with its version.
    async fn create_entry(&self, fields: &CommentFields) -> Result<CommentEntry, UpstreamError>;

    /// Publish the entry at the given version.
    async fn publish_entry(&self, id: &str, version: u64) -> Result<CommentEntry, UpstreamError>;
}
