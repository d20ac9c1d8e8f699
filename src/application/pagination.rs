//! Offset pagination over CMS collections.

use tracing::{debug, warn};

use crate::application::content::{Collection, CollectionOptions, ContentClient};
use crate::application::repos::UpstreamError;
use crate::domain::entities::Entry;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 10;

/// A clamped `limit`/`skip` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    limit: u32,
    skip: u32,
}

impl PageWindow {
    /// Clamp `limit` to `[1, MAX_PAGE_SIZE]` and `skip` to `>= 0`.
    pub fn new(limit: Option<i64>, skip: Option<i64>) -> Self {
        let limit = limit
            .unwrap_or(i64::from(DEFAULT_PAGE_SIZE))
            .clamp(1, i64::from(MAX_PAGE_SIZE));
        let skip = skip.unwrap_or(0).clamp(0, i64::from(u32::MAX));
        Self {
            limit: limit as u32,
            skip: skip as u32,
        }
    }

    /// Window for a 1-based page number.
    pub fn for_page(page: Option<u32>, limit: Option<i64>) -> Self {
        let base = Self::new(limit, None);
        let page = page.unwrap_or(1).max(1);
        Self {
            limit: base.limit,
            skip: (page - 1).saturating_mul(base.limit),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn skip(&self) -> u32 {
        self.skip
    }
}

/// One page of entries together with the server-reported total.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u32,
    pub limit: u32,
    pub skip: u32,
}

impl<T> Page<T> {
    /// `ceil(total / limit)`.
    pub fn page_count(&self) -> u32 {
        if self.limit == 0 {
            return 0;
        }
        self.total.div_ceil(self.limit)
    }

    /// 1-based number of this page.
    pub fn page_number(&self) -> u32 {
        if self.limit == 0 {
            return 1;
        }
        self.skip / self.limit + 1
    }

    /// True when the window starts past the last entry. The first page of an
    /// empty collection is still in range.
    pub fn is_beyond_last(&self) -> bool {
        self.skip > 0 && self.skip >= self.total
    }
}

#[derive(Clone)]
pub struct PaginationService {
    content: ContentClient,
}

impl PaginationService {
    pub fn new(content: ContentClient) -> Self {
        Self { content }
    }

    pub async fn paginate<T: Entry>(
        &self,
        preview: bool,
        window: PageWindow,
    ) -> Result<Page<T>, UpstreamError> {
        let Collection {
            items,
            total,
            limit,
            skip,
        } = self
            .content
            .fetch_collection::<T>(
                CollectionOptions::listing(preview).window(window.limit, window.skip),
            )
            .await?;

        // The CMS reports 0 for limit/skip it did not echo back.
        Ok(Page {
            items,
            total,
            limit: if limit == 0 { window.limit } else { limit },
            skip: if skip == 0 { window.skip } else { skip },
        })
    }

    /// Every entry of the collection, newest first, fetched page by page.
    pub async fn all_entries<T: Entry>(&self, preview: bool) -> Result<Vec<T>, UpstreamError> {
        let first = self
            .paginate::<T>(preview, PageWindow::new(Some(i64::from(MAX_PAGE_SIZE)), Some(0)))
            .await?;
        let total = first.total;
        let limit = first.limit.max(1);
        let mut items = first.items;

        let mut offset = limit;
        while offset < total && (items.len() as u32) < total {
            let page = self
                .paginate::<T>(
                    preview,
                    PageWindow::new(Some(i64::from(limit)), Some(i64::from(offset))),
                )
                .await?;

            if page.items.is_empty() {
                warn!(
                    target = "newsdesk::pagination",
                    kind = %T::KIND,
                    offset,
                    total,
                    "collection shrank while paging; stopping early"
                );
                break;
            }

            items.extend(page.items);
            offset += limit;
        }

        debug!(
            target = "newsdesk::pagination",
            kind = %T::KIND,
            total,
            fetched = items.len(),
            "collected full listing"
        );
        Ok(items)
    }
}
