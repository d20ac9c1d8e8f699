//! Tagged in-process cache for published content responses.

use std::{num::NonZeroUsize, sync::Arc};

use async_trait::async_trait;
use lru::LruCache;
use metrics::counter;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::application::repos::{ContentRequest, ContentResponse, ContentSource, UpstreamError};

const METRIC_CACHE_HIT: &str = "newsdesk_cache_hit_total";
const METRIC_CACHE_MISS: &str = "newsdesk_cache_miss_total";
const METRIC_CACHE_EVICTED: &str = "newsdesk_cache_evicted_total";

#[derive(Clone)]
struct CachedResponse {
    tag: &'static str,
    response: ContentResponse,
}

/// Wraps a [`ContentSource`] and memoises non-preview responses until their
/// tag is invalidated or they fall out of the LRU window. Disabled instances
/// pass every request through.
pub struct ContentCache {
    inner: Arc<dyn ContentSource>,
    entries: Mutex<LruCache<ContentRequest, CachedResponse>>,
    enabled: bool,
}

impl ContentCache {
    pub fn new(inner: Arc<dyn ContentSource>, enabled: bool, capacity: NonZeroUsize) -> Self {
        Self {
            inner,
            entries: Mutex::new(LruCache::new(capacity)),
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub async fn capacity(&self) -> usize {
        self.entries.lock().await.cap().get()
    }

    /// Drop every response carrying `tag`; returns how many were dropped.
    pub async fn invalidate_tag(&self, tag: &str) -> usize {
        let mut guard = self.entries.lock().await;
        let stale: Vec<ContentRequest> = guard
            .iter()
            .filter(|(_, cached)| cached.tag == tag)
            .map(|(request, _)| request.clone())
            .collect();
        for request in &stale {
            guard.pop(request);
        }
        let dropped = stale.len();
        info!(
            target = "newsdesk::cache",
            tag,
            dropped,
            "invalidated cached responses"
        );
        dropped
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl ContentSource for ContentCache {
    async fn fetch(&self, request: &ContentRequest) -> Result<ContentResponse, UpstreamError> {
        if !self.enabled || request.preview {
            return self.inner.fetch(request).await;
        }

        let tag = request.cache_tag();
        let cached = self
            .entries
            .lock()
            .await
            .get(request)
            .map(|cached| cached.response.clone());
        if let Some(response) = cached {
            counter!(METRIC_CACHE_HIT, "tag" => tag).increment(1);
            return Ok(response);
        }

        counter!(METRIC_CACHE_MISS, "tag" => tag).increment(1);
        let response = self.inner.fetch(request).await?;
        debug!(target = "newsdesk::cache", tag, "caching content response");

        let evicted = self.entries.lock().await.push(
            request.clone(),
            CachedResponse {
                tag,
                response: response.clone(),
            },
        );
        if let Some((evicted, cached)) = evicted
            && &evicted != request
        {
            counter!(METRIC_CACHE_EVICTED, "tag" => cached.tag).increment(1);
            debug!(
                target = "newsdesk::cache",
                tag = cached.tag,
                "evicted least recently used response"
            );
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::repos::{CollectionQuery, EntryFilter};
    use crate::application::testing::InMemoryContent;
    use crate::domain::entities::Selection;
    use crate::domain::types::CollectionKind;

    fn request(kind: CollectionKind, preview: bool) -> ContentRequest {
        ContentRequest::single(
            preview,
            CollectionQuery::new(kind, Selection::Summary, EntryFilter::SlugExists),
        )
    }

    fn capacity(value: usize) -> NonZeroUsize {
        NonZeroUsize::new(value).expect("non-zero capacity")
    }

    fn cache(enabled: bool) -> (ContentCache, Arc<InMemoryContent>) {
        let inner = Arc::new(
            InMemoryContent::with_posts(&[("p1", "2024-01-01T00:00:00Z")])
                .and_notices(&[("n1", "2024-01-01T00:00:00Z")]),
        );
        (ContentCache::new(inner.clone(), enabled, capacity(16)), inner)
    }

    #[tokio::test]
    async fn repeated_published_reads_hit_the_cache() {
        let (cache, inner) = cache(true);
        let first = cache.fetch(&request(CollectionKind::Post, false)).await.expect("first");
        let second = cache.fetch(&request(CollectionKind::Post, false)).await.expect("second");

        assert_eq!(first, second);
        assert_eq!(inner.requests().len(), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn preview_reads_are_never_cached() {
        let (cache, inner) = cache(true);
        for _ in 0..2 {
            cache.fetch(&request(CollectionKind::Post, true)).await.expect("preview");
        }
        assert_eq!(inner.requests().len(), 2);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn development_mode_disables_caching() {
        let (cache, inner) = cache(false);
        for _ in 0..2 {
            cache.fetch(&request(CollectionKind::Notice, false)).await.expect("read");
        }
        assert_eq!(inner.requests().len(), 2);
    }

    #[tokio::test]
    async fn invalidation_only_drops_matching_tag() {
        let (cache, inner) = cache(true);
        cache.fetch(&request(CollectionKind::Post, false)).await.expect("posts");
        cache.fetch(&request(CollectionKind::Notice, false)).await.expect("notices");

        assert_eq!(cache.invalidate_tag("posts").await, 1);
        assert_eq!(cache.len().await, 1);

        cache.fetch(&request(CollectionKind::Notice, false)).await.expect("notices");
        cache.fetch(&request(CollectionKind::Post, false)).await.expect("posts");
        assert_eq!(inner.requests().len(), 3);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let (cache, inner) = cache(true);
        inner.fail_with(503);
        assert!(cache.fetch(&request(CollectionKind::Post, false)).await.is_err());
        assert!(cache.is_empty().await);
    }

    fn detail(slug: &str) -> ContentRequest {
        ContentRequest::single(
            false,
            CollectionQuery::new(
                CollectionKind::Post,
                Selection::PostFull,
                EntryFilter::SlugEquals(slug.to_string()),
            ),
        )
    }

    #[tokio::test]
    async fn distinct_requests_are_bounded_by_capacity() {
        let inner = Arc::new(InMemoryContent::with_posts(&[("p1", "2024-01-01T00:00:00Z")]));
        let cache = ContentCache::new(inner.clone(), true, capacity(4));

        for i in 0..50 {
            cache.fetch(&detail(&format!("junk-{i}"))).await.expect("read");
        }
        assert_eq!(cache.len().await, 4);
        assert_eq!(cache.capacity().await, 4);

        // The newest entries survive, the oldest went first.
        cache.fetch(&detail("junk-49")).await.expect("hit");
        assert_eq!(inner.requests().len(), 50);
        cache.fetch(&detail("junk-0")).await.expect("miss");
        assert_eq!(inner.requests().len(), 51);
    }

    #[tokio::test]
    async fn recently_read_entries_outlive_older_ones() {
        let inner = Arc::new(InMemoryContent::with_posts(&[("p1", "2024-01-01T00:00:00Z")]));
        let cache = ContentCache::new(inner.clone(), true, capacity(2));

        cache.fetch(&detail("a")).await.expect("a");
        cache.fetch(&detail("b")).await.expect("b");
        cache.fetch(&detail("a")).await.expect("a again");
        cache.fetch(&detail("c")).await.expect("c");
        assert_eq!(inner.requests().len(), 3);

        cache.fetch(&detail("a")).await.expect("a cached");
        assert_eq!(inner.requests().len(), 3);
        cache.fetch(&detail("b")).await.expect("b evicted");
        assert_eq!(inner.requests().len(), 4);
    }

    #[tokio::test]
    async fn invalidation_still_works_on_a_full_cache() {
        let inner = Arc::new(
            InMemoryContent::with_posts(&[("p1", "2024-01-01T00:00:00Z")])
                .and_notices(&[("n1", "2024-01-01T00:00:00Z")]),
        );
        let cache = ContentCache::new(inner.clone(), true, capacity(2));
        cache.fetch(&detail("a")).await.expect("post");
        cache.fetch(&request(CollectionKind::Notice, false)).await.expect("notices");

        assert_eq!(cache.invalidate_tag("posts").await, 1);
        assert_eq!(cache.len().await, 1);
    }
}
