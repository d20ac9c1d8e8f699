//! Read-only projections of CMS entries.
//!
//! The GraphQL endpoint sends `null` for every selected field an editor left
//! empty. Such fields are optional or fall back to their default so that a
//! partially filled entry still decodes.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use time::OffsetDateTime;

use crate::domain::{timestamps, types::CollectionKind};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub picture: Option<ImageRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SysRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockAsset {
    pub sys: SysRef,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetLinks {
    #[serde(default, deserialize_with = "skip_null_items")]
    pub block: Vec<BlockAsset>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentLinks {
    #[serde(default, deserialize_with = "null_as_default")]
    pub assets: AssetLinks,
}

/// Rich text document plus the assets it embeds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RichContent {
    #[serde(default)]
    pub json: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub links: ContentLinks,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub slug: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, with = "timestamps::lenient")]
    pub date: Option<OffsetDateTime>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub cover_image: Option<ImageRef>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub content: Option<RichContent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub slug: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, with = "timestamps::lenient")]
    pub date: Option<OffsetDateTime>,
    #[serde(default)]
    pub cover_image: Option<ImageRef>,
    #[serde(default)]
    pub content: Option<RichContent>,
}

/// Lightweight notice projection used by news listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoticeSummary {
    pub slug: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, with = "timestamps::lenient")]
    pub date: Option<OffsetDateTime>,
}

/// Neighbour reference returned by adjacency lookups for any collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySummary {
    pub slug: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, with = "timestamps::lenient")]
    pub date: Option<OffsetDateTime>,
}

/// Which field set a query selects for an entry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selection {
    PostFull,
    NoticeFull,
    Summary,
}

/// An entry type that can be decoded from a collection query.
pub trait Entry: DeserializeOwned + Send + Sync + 'static {
    const KIND: CollectionKind;
    const SELECTION: Selection;

    fn slug(&self) -> &str;
    fn title(&self) -> &str;
    fn date(&self) -> Option<OffsetDateTime>;

    fn summary(&self) -> EntrySummary {
        EntrySummary {
            slug: self.slug().to_string(),
            title: self.title().to_string(),
            date: self.date(),
        }
    }
}

impl Entry for Post {
    const KIND: CollectionKind = CollectionKind::Post;
    const SELECTION: Selection = Selection::PostFull;

    fn slug(&self) -> &str {
        &self.slug
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn date(&self) -> Option<OffsetDateTime> {
        self.date
    }
}

impl Entry for Notice {
    const KIND: CollectionKind = CollectionKind::Notice;
    const SELECTION: Selection = Selection::NoticeFull;

    fn slug(&self) -> &str {
        &self.slug
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn date(&self) -> Option<OffsetDateTime> {
        self.date
    }
}

impl Entry for NoticeSummary {
    const KIND: CollectionKind = CollectionKind::Notice;
    const SELECTION: Selection = Selection::Summary;

    fn slug(&self) -> &str {
        &self.slug
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn date(&self) -> Option<OffsetDateTime> {
        self.date
    }
}

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn skip_null_items<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    let items = Option::<Vec<Option<T>>>::deserialize(deserializer)?;
    Ok(items.unwrap_or_default().into_iter().flatten().collect())
}
