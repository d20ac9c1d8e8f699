//! Typed reads over a [`ContentSource`].

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::application::repos::{
    CollectionQuery, ContentRequest, ContentSource, EntryFilter, RawCollection, SortOrder,
    UpstreamError,
};
use crate::domain::entities::Entry;

/// Decoded collection window as reported by the CMS.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    pub items: Vec<T>,
    pub total: u32,
    pub limit: u32,
    pub skip: u32,
}

#[derive(Debug, Clone)]
pub struct CollectionOptions {
    pub preview: bool,
    pub filter: EntryFilter,
    pub order: Option<SortOrder>,
    pub limit: Option<u32>,
    pub skip: Option<u32>,
}

impl CollectionOptions {
    /// Every entry with a slug, newest first.
    pub fn listing(preview: bool) -> Self {
        Self {
            preview,
            filter: EntryFilter::SlugExists,
            order: Some(SortOrder::DateDesc),
            limit: None,
            skip: None,
        }
    }

    pub fn window(mut self, limit: u32, skip: u32) -> Self {
        self.limit = Some(limit);
        self.skip = Some(skip);
        self
    }
}

#[derive(Clone)]
pub struct ContentClient {
    source: Arc<dyn ContentSource>,
}

impl ContentClient {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self { source }
    }

    pub async fn fetch_collection<T: Entry>(
        &self,
        options: CollectionOptions,
    ) -> Result<Collection<T>, UpstreamError> {
        let mut query = CollectionQuery::new(T::KIND, T::SELECTION, options.filter).with_totals();
        query.order = options.order;
        query.limit = options.limit;
        query.skip = options.skip;

        let mut collections = self.query(options.preview, vec![query]).await?;
        Ok(collections.remove(0))
    }

    pub async fn fetch_one<T: Entry>(
        &self,
        slug: &str,
        preview: bool,
    ) -> Result<Option<T>, UpstreamError> {
        let query = CollectionQuery::new(
            T::KIND,
            T::SELECTION,
            EntryFilter::SlugEquals(slug.to_string()),
        )
        .limit(1);

        let collection: Collection<T> = self.query(preview, vec![query]).await?.remove(0);
        Ok(collection.items.into_iter().next())
    }

    /// The most recent entries other than `slug`.
    pub async fn more_entries<T: Entry>(
        &self,
        slug: &str,
        preview: bool,
        limit: u32,
    ) -> Result<Vec<T>, UpstreamError> {
        let options = CollectionOptions {
            preview,
            filter: EntryFilter::SlugNotIn(vec![slug.to_string()]),
            order: Some(SortOrder::DateDesc),
            limit: Some(limit),
            skip: None,
        };
        Ok(self.fetch_collection::<T>(options).await?.items)
    }

    /// Issue several collection selections in one round trip and decode each
    /// one into `D`. Results follow the order of `queries`.
    pub async fn query<D: DeserializeOwned>(
        &self,
        preview: bool,
        queries: Vec<CollectionQuery>,
    ) -> Result<Vec<Collection<D>>, UpstreamError> {
        let expected = queries.len();
        let request = ContentRequest {
            preview,
            collections: queries,
        };
        let response = self.source.fetch(&request).await?;

        let mut raw = response.collections;
        raw.resize_with(expected, RawCollection::default);
        raw.into_iter().map(decode_collection).collect()
    }
}

/// Entries are addressed by slug, so items whose slug is `null` are dropped.
fn decode_collection<D: DeserializeOwned>(raw: RawCollection) -> Result<Collection<D>, UpstreamError> {
    let received = raw.items.len();
    let items = raw
        .items
        .into_iter()
        .filter(|item| item.get("slug").is_some_and(Value::is_string))
        .map(serde_json::from_value::<D>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(UpstreamError::decode)?;

    if items.len() < received {
        debug!(
            target = "newsdesk::content",
            skipped = received - items.len(),
            "dropped collection items without a slug"
        );
    }

    Ok(Collection {
        items,
        total: raw.total,
        limit: raw.limit,
        skip: raw.skip,
    })
}
