//! Shared domain enumerations aligned with the CMS content model.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Content types this site reads from the CMS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Post,
    Notice,
}

impl CollectionKind {
    /// Root field of the GraphQL collection query, e.g. `postCollection`.
    pub fn collection_field(self) -> &'static str {
        match self {
            CollectionKind::Post => "postCollection",
            CollectionKind::Notice => "noticeCollection",
        }
    }

    /// Tag attached to cached responses of this collection.
    pub fn cache_tag(self) -> &'static str {
        match self {
            CollectionKind::Post => "posts",
            CollectionKind::Notice => "notices",
        }
    }

    /// Public path prefix of detail pages for this collection.
    pub fn path_prefix(self) -> &'static str {
        match self {
            CollectionKind::Post => "/blog",
            CollectionKind::Notice => "/news",
        }
    }

    pub fn from_cache_tag(tag: &str) -> Option<Self> {
        match tag {
            "posts" => Some(CollectionKind::Post),
            "notices" => Some(CollectionKind::Notice),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CollectionKind::Post => "post",
            CollectionKind::Notice => "notice",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
