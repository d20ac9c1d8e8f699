//! Sitemap service for sitemap.xml and robots.txt generation.
//!
//! Keeps the HTTP layer focused on request/response handling; the listings
//! come from [`PaginationService::all_entries`].

use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::application::pagination::PaginationService;
use crate::application::repos::UpstreamError;
use crate::domain::entities::{Entry, NoticeSummary, Post};
use crate::domain::types::CollectionKind;

const CHANGE_FREQUENCY: &str = "weekly";

#[derive(Clone)]
pub struct SitemapService {
    pagination: PaginationService,
    site_url: String,
}

struct SitemapEntry {
    loc: String,
    lastmod: OffsetDateTime,
    priority: f32,
}

impl SitemapService {
    pub fn new(pagination: PaginationService, site_url: &str) -> Self {
        Self {
            pagination,
            site_url: site_url.trim_end_matches('/').to_string(),
        }
    }

    /// Generate sitemap.xml content from the published listings.
    pub async fn sitemap_xml(&self) -> Result<String, UpstreamError> {
        let (posts, news) = tokio::try_join!(
            self.pagination.all_entries::<Post>(false),
            self.pagination.all_entries::<NoticeSummary>(false),
        )?;

        Ok(self.render(&posts, &news, OffsetDateTime::now_utc()))
    }

    pub fn robots_txt(&self) -> String {
        format!(
            "User-agent: *\nAllow: /\nSitemap: {}/sitemap.xml\n",
            self.site_url
        )
    }

    fn render(&self, posts: &[Post], news: &[NoticeSummary], now: OffsetDateTime) -> String {
        let mut entries = vec![
            self.entry("/", now, 1.0),
            self.entry(CollectionKind::Post.path_prefix(), newest_of(posts, now), 0.8),
            self.entry(CollectionKind::Notice.path_prefix(), newest_of(news, now), 0.6),
        ];
        entries.extend(self.detail_entries(posts, now, 0.6));
        entries.extend(self.detail_entries(news, now, 0.5));

        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
        );
        for entry in entries {
            xml.push_str(&render_entry(&entry));
        }
        xml.push_str("</urlset>\n");
        xml
    }

    fn detail_entries<'a, T: Entry>(
        &'a self,
        entries: &'a [T],
        now: OffsetDateTime,
        priority: f32,
    ) -> impl Iterator<Item = SitemapEntry> + 'a {
        entries.iter().map(move |entry| {
            let path = format!("{}/{}", T::KIND.path_prefix(), entry.slug());
            self.entry(&path, entry.date().unwrap_or(now), priority)
        })
    }

    fn entry(&self, path: &str, lastmod: OffsetDateTime, priority: f32) -> SitemapEntry {
        SitemapEntry {
            loc: format!("{}{}", self.site_url, path),
            lastmod,
            priority,
        }
    }
}

fn newest_of<T: Entry>(entries: &[T], now: OffsetDateTime) -> OffsetDateTime {
    entries.first().and_then(T::date).unwrap_or(now)
}

fn render_entry(entry: &SitemapEntry) -> String {
    let loc = escape_xml(&entry.loc);
    let lastmod = entry.lastmod.format(&Rfc3339).unwrap_or_default();
    format!(
        "  <url><loc>{loc}</loc><lastmod>{lastmod}</lastmod><changefreq>{CHANGE_FREQUENCY}</changefreq><priority>{:.1}</priority></url>\n",
        entry.priority
    )
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
