//! Read models assembled for the public pages.

use serde::Serialize;
use tracing::debug;

use crate::application::adjacency::{AdjacencyResolver, AdjacencyStrategy, Adjacent};
use crate::application::content::ContentClient;
use crate::application::pagination::{Page, PageWindow, PaginationService};
use crate::application::repos::UpstreamError;
use crate::domain::entities::{EntrySummary, Notice, NoticeSummary, Post};

pub const HOME_DIGEST_SIZE: u32 = 3;
pub const MORE_POSTS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomeDigest {
    pub posts: Vec<Post>,
    pub news: Vec<NoticeSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    pub post: Post,
    pub newer: Option<EntrySummary>,
    pub older: Option<EntrySummary>,
    pub more_posts: Vec<Post>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoticePage {
    pub notice: Notice,
    pub newer: Option<EntrySummary>,
    pub older: Option<EntrySummary>,
}

/// Adjacency strategy per collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjacencyPolicy {
    pub posts: AdjacencyStrategy,
    pub notices: AdjacencyStrategy,
}

impl Default for AdjacencyPolicy {
    fn default() -> Self {
        Self {
            posts: AdjacencyStrategy::Scan,
            notices: AdjacencyStrategy::Range,
        }
    }
}

#[derive(Clone)]
pub struct SiteService {
    content: ContentClient,
    pagination: PaginationService,
    adjacency: AdjacencyResolver,
    policy: AdjacencyPolicy,
}

impl SiteService {
    pub fn new(content: ContentClient, policy: AdjacencyPolicy) -> Self {
        let pagination = PaginationService::new(content.clone());
        let adjacency = AdjacencyResolver::new(content.clone(), pagination.clone());
        Self {
            content,
            pagination,
            adjacency,
            policy,
        }
    }

    pub fn pagination(&self) -> &PaginationService {
        &self.pagination
    }

    /// Latest posts and notices, fetched concurrently.
    pub async fn home(&self, preview: bool) -> Result<HomeDigest, UpstreamError> {
        let window = PageWindow::new(Some(i64::from(HOME_DIGEST_SIZE)), Some(0));
        let (posts, news) = tokio::try_join!(
            self.pagination.paginate::<Post>(preview, window),
            self.pagination.paginate::<NoticeSummary>(preview, window),
        )?;

        Ok(HomeDigest {
            posts: posts.items,
            news: news.items,
        })
    }

    pub async fn posts(&self, preview: bool) -> Result<Vec<Post>, UpstreamError> {
        self.pagination.all_entries::<Post>(preview).await
    }

    /// A post with its neighbours and the latest other posts.
    pub async fn post(&self, slug: &str, preview: bool) -> Result<Option<PostPage>, UpstreamError> {
        let (adjacent, more_posts) = tokio::try_join!(
            self.adjacency
                .adjacent::<Post>(slug, preview, self.policy.posts),
            self.content.more_entries::<Post>(slug, preview, MORE_POSTS),
        )?;

        let Adjacent {
            current,
            newer,
            older,
        } = adjacent;
        Ok(current.map(|post| PostPage {
            post,
            newer,
            older,
            more_posts,
        }))
    }

    /// One page of the news listing; `None` when the page lies past the end.
    pub async fn news(
        &self,
        preview: bool,
        window: PageWindow,
    ) -> Result<Option<Page<NoticeSummary>>, UpstreamError> {
        let page = self
            .pagination
            .paginate::<NoticeSummary>(preview, window)
            .await?;

        if page.is_beyond_last() {
            debug!(
                target = "newsdesk::site",
                skip = page.skip,
                total = page.total,
                "news page out of range"
            );
            return Ok(None);
        }
        Ok(Some(page))
    }

    pub async fn notice(
        &self,
        slug: &str,
        preview: bool,
    ) -> Result<Option<NoticePage>, UpstreamError> {
        let Adjacent {
            current,
            newer,
            older,
        } = self
            .adjacency
            .adjacent::<Notice>(slug, preview, self.policy.notices)
            .await?;

        Ok(current.map(|notice| NoticePage {
            notice,
            newer,
            older,
        }))
    }
}
