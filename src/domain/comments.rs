//! Comment drafts and the CMS entry shape they round-trip through.

use newsdesk_api_types::Comment;
use serde::{Deserialize, Serialize};

use crate::domain::{
    error::DomainError,
    locale::{Blank, LocalizedValue},
};

pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

/// A validated comment ready to be written to the CMS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentDraft {
    pub slug: String,
    pub body: String,
    pub author: String,
    pub parent_id: Option<String>,
}

impl CommentDraft {
    /// Trim every input and enforce the required fields.
    pub fn new(
        slug: Option<&str>,
        body: Option<&str>,
        author: Option<&str>,
        parent_id: Option<&str>,
    ) -> Result<Self, DomainError> {
        let slug = non_blank(slug);
        let body = non_blank(body);

        let (Some(slug), Some(body)) = (slug, body) else {
            return Err(DomainError::validation("'slug' and 'body' are required."));
        };

        Ok(Self {
            slug,
            body,
            author: non_blank(author).unwrap_or_else(|| ANONYMOUS_AUTHOR.to_string()),
            parent_id: non_blank(parent_id),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySys {
    pub id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub version: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSys {
    pub id: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub sys_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
}

/// Typed reference to another entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryLink {
    pub sys: LinkSys,
}

impl EntryLink {
    pub fn to_entry(id: impl Into<String>) -> Self {
        Self {
            sys: LinkSys {
                id: id.into(),
                sys_type: Some("Link".to_string()),
                link_type: Some("Entry".to_string()),
            },
        }
    }
}

impl Blank for EntryLink {
    fn is_blank(&self) -> bool {
        self.sys.id.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<LocalizedValue<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<LocalizedValue<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<LocalizedValue<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_comment: Option<LocalizedValue<EntryLink>>,
}

impl CommentFields {
    /// Management API payload for a draft: every field keyed by `locale`.
    pub fn for_draft(draft: &CommentDraft, locale: &str) -> Self {
        let localized = |value: &str| {
            LocalizedValue::LocaleMap([(locale.to_string(), value.to_string())].into())
        };

        Self {
            body: Some(localized(&draft.body)),
            author: Some(localized(&draft.author)),
            subject: Some(localized(&draft.slug)),
            parent_comment: draft.parent_id.as_ref().map(|id| {
                LocalizedValue::LocaleMap([(locale.to_string(), EntryLink::to_entry(id))].into())
            }),
        }
    }
}

/// A comment entry as returned by either the delivery or the management API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentEntry {
    pub sys: EntrySys,
    #[serde(default)]
    pub fields: CommentFields,
}

impl CommentEntry {
    /// Collapse localized fields into the public comment shape.
    pub fn into_comment(self, default_locale: &str) -> Comment {
        let text = |value: &Option<LocalizedValue<String>>| {
            value
                .as_ref()
                .and_then(|value| value.resolve_string(default_locale))
        };

        Comment {
            body: text(&self.fields.body).unwrap_or_default(),
            author: text(&self.fields.author).unwrap_or_else(|| ANONYMOUS_AUTHOR.to_string()),
            subject: text(&self.fields.subject).unwrap_or_default(),
            parent_id: self
                .fields
                .parent_comment
                .as_ref()
                .and_then(|link| link.resolve(default_locale))
                .map(|link| link.sys.id.clone()),
            created_at: self.sys.created_at,
            id: self.sys.id,
        }
    }
}
