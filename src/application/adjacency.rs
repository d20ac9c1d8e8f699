//! Chronological neighbours of an entry.
//!
//! Two interchangeable strategies:
//!
//! - [`AdjacencyStrategy::Scan`] loads the whole listing (newest first) and
//!   looks at the elements around the target.
//! - [`AdjacencyStrategy::Range`] loads the target alone and then asks for the
//!   first entry strictly after and strictly before its date.
//!
//! Both agree whenever dates are unique. When several entries share the exact
//! same timestamp the result depends on the CMS ordering of ties in both
//! strategies and is not defined further.

use serde::{Deserialize, Serialize};

use crate::application::content::ContentClient;
use crate::application::pagination::PaginationService;
use crate::application::repos::{CollectionQuery, EntryFilter, SortOrder, UpstreamError};
use crate::domain::entities::{Entry, EntrySummary, Selection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjacencyStrategy {
    Scan,
    Range,
}

/// An entry together with its newer and older neighbours.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Adjacent<T> {
    pub current: Option<T>,
    pub newer: Option<EntrySummary>,
    pub older: Option<EntrySummary>,
}

impl<T> Adjacent<T> {
    pub fn absent() -> Self {
        Self {
            current: None,
            newer: None,
            older: None,
        }
    }
}

#[derive(Clone)]
pub struct AdjacencyResolver {
    content: ContentClient,
    pagination: PaginationService,
}

impl AdjacencyResolver {
    pub fn new(content: ContentClient, pagination: PaginationService) -> Self {
        Self {
            content,
            pagination,
        }
    }

    pub async fn adjacent<T: Entry>(
        &self,
        slug: &str,
        preview: bool,
        strategy: AdjacencyStrategy,
    ) -> Result<Adjacent<T>, UpstreamError> {
        match strategy {
            AdjacencyStrategy::Scan => self.by_scan(slug, preview).await,
            AdjacencyStrategy::Range => self.by_range(slug, preview).await,
        }
    }

    async fn by_scan<T: Entry>(&self, slug: &str, preview: bool) -> Result<Adjacent<T>, UpstreamError> {
        let mut listing = self.pagination.all_entries::<T>(preview).await?;

        let Some(index) = listing.iter().position(|entry| entry.slug() == slug) else {
            return Ok(Adjacent::absent());
        };

        let newer = index
            .checked_sub(1)
            .and_then(|i| listing.get(i))
            .map(Entry::summary);
        let older = listing.get(index + 1).map(Entry::summary);
        let current = listing.swap_remove(index);

        Ok(Adjacent {
            current: Some(current),
            newer,
            older,
        })
    }

    async fn by_range<T: Entry>(&self, slug: &str, preview: bool) -> Result<Adjacent<T>, UpstreamError> {
        let Some(current) = self.content.fetch_one::<T>(slug, preview).await? else {
            return Ok(Adjacent::absent());
        };
        let Some(date) = current.date() else {
            return Ok(Adjacent {
                current: Some(current),
                newer: None,
                older: None,
            });
        };

        let newer = CollectionQuery::new(T::KIND, Selection::Summary, EntryFilter::DateAfter(date))
            .aliased("newer")
            .ordered(SortOrder::DateAsc)
            .limit(1);
        let older = CollectionQuery::new(T::KIND, Selection::Summary, EntryFilter::DateBefore(date))
            .aliased("older")
            .ordered(SortOrder::DateDesc)
            .limit(1);

        let mut neighbours = self
            .content
            .query::<EntrySummary>(preview, vec![newer, older])
            .await?
            .into_iter()
            .map(|collection| collection.items.into_iter().next());

        Ok(Adjacent {
            current: Some(current),
            newer: neighbours.next().flatten(),
            older: neighbours.next().flatten(),
        })
    }
}
