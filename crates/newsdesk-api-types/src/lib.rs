//! Wire types shared by the Newsdesk server and its clients.
//!
//! Field names follow the JSON the comment widget and page renderer already
//! consume, so everything is camelCase on the wire.

use serde::{Deserialize, Serialize};

/// A published comment as returned by `GET /api/comments` and `POST /api/comments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub body: String,
    pub author: String,
    pub subject: String,
    pub created_at: String,
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentList {
    pub items: Vec<Comment>,
}

/// Body accepted by `POST /api/comments`. Every field is optional on the wire so
/// that missing values surface as validation errors instead of decode errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CommentListQuery {
    pub slug: Option<String>,
}

/// Error envelope for every non-success JSON response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

/// One window of a paginated collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEnvelope<T> {
    pub items: Vec<T>,
    pub total: u32,
    pub limit: u32,
    pub skip: u32,
    pub page: u32,
    pub page_count: u32,
}
