//! Comment gateway: validation, the two-step write and locale normalisation.

use std::sync::Arc;

use newsdesk_api_types::{Comment, CommentList, CreateCommentRequest};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::repos::{CommentStore, UpstreamError};
use crate::domain::comments::{CommentDraft, CommentFields};
use crate::domain::error::DomainError;

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("comment service is not configured")]
    Misconfigured,
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error("failed to fetch comments")]
    Fetch(#[source] UpstreamError),
    #[error("failed to create comment entry")]
    Create(#[source] UpstreamError),
    #[error("failed to publish comment entry `{entry_id}`")]
    Publish {
        entry_id: String,
        #[source]
        source: UpstreamError,
    },
    #[error("created entry `{entry_id}` carries no version")]
    MissingVersion { entry_id: String },
}

impl CommentError {
    /// Message safe to show to the caller.
    pub fn public_message(&self) -> String {
        match self {
            CommentError::Misconfigured => "Service misconfigured".to_string(),
            CommentError::Validation(DomainError::Validation { message }) => message.clone(),
            CommentError::Fetch(_) => "Failed to fetch comments.".to_string(),
            CommentError::Create(_) => "Failed to create comment entry.".to_string(),
            CommentError::Publish { .. } | CommentError::MissingVersion { .. } => {
                "Failed to publish comment entry.".to_string()
            }
        }
    }

    pub fn upstream(&self) -> Option<&UpstreamError> {
        match self {
            CommentError::Fetch(source)
            | CommentError::Create(source)
            | CommentError::Publish { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Upstream response body to pass through as `detail`.
    pub fn detail(&self) -> Option<Value> {
        match self.upstream()? {
            UpstreamError::Status { body, .. } => body.clone(),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn CommentStore>,
    default_locale: String,
}

impl CommentService {
    pub fn new(store: Arc<dyn CommentStore>, default_locale: impl Into<String>) -> Self {
        Self {
            store,
            default_locale: default_locale.into(),
        }
    }

    pub async fn list_comments(&self, slug: Option<&str>) -> Result<CommentList, CommentError> {
        self.ensure_configured()?;
        let slug = slug
            .map(str::trim)
            .filter(|slug| !slug.is_empty())
            .ok_or_else(|| DomainError::validation("Query parameter 'slug' is required."))?;

        let entries = self
            .store
            .list_by_subject(slug)
            .await
            .map_err(CommentError::Fetch)?;

        let items = entries
            .into_iter()
            .map(|entry| entry.into_comment(&self.default_locale))
            .collect();
        Ok(CommentList { items })
    }

    pub async fn create_comment(
        &self,
        request: &CreateCommentRequest,
    ) -> Result<Comment, CommentError> {
        self.ensure_configured()?;
        let draft = CommentDraft::new(
            request.slug.as_deref(),
            request.body.as_deref(),
            request.author.as_deref(),
            request.parent_id.as_deref(),
        )?;

        let fields = CommentFields::for_draft(&draft, &self.default_locale);
        let created = self
            .store
            .create_entry(&fields)
            .await
            .map_err(CommentError::Create)?;

        let entry_id = created.sys.id.clone();
        let Some(version) = created.sys.version else {
            warn!(
                target = "newsdesk::comments",
                entry_id = %entry_id,
                "created comment entry has no version; left unpublished"
            );
            return Err(CommentError::MissingVersion { entry_id });
        };

        let published = match self.store.publish_entry(&entry_id, version).await {
            Ok(published) => published,
            Err(source) => {
                warn!(
                    target = "newsdesk::comments",
                    entry_id = %entry_id,
                    error = %source,
                    "publishing comment failed; unpublished entry left behind"
                );
                return Err(CommentError::Publish { entry_id, source });
            }
        };

        info!(
            target = "newsdesk::comments",
            entry_id = %published.sys.id,
            subject = %draft.slug,
            "comment published"
        );
        Ok(published.into_comment(&self.default_locale))
    }

    /// Fails with [`CommentError::Misconfigured`] when credentials are missing.
    pub fn ensure_configured(&self) -> Result<(), CommentError> {
        if self.store.is_configured() {
            Ok(())
        } else {
            Err(CommentError::Misconfigured)
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::application::testing::{CommentFailure, InMemoryComments};
    use crate::domain::comments::{CommentEntry, EntrySys};
    use crate::domain::locale::LocalizedValue;

    fn service(store: InMemoryComments) -> (CommentService, Arc<InMemoryComments>) {
        let store = Arc::new(store);
        (CommentService::new(store.clone(), "en-US"), store)
    }

    fn request(slug: &str, body: &str) -> CreateCommentRequest {
        CreateCommentRequest {
            slug: Some(slug.to_string()),
            body: Some(body.to_string()),
            ..CreateCommentRequest::default()
        }
    }

    fn delivered(id: &str, subject: &str, body: &str) -> CommentEntry {
        CommentEntry {
            sys: EntrySys {
                id: id.to_string(),
                created_at: "2024-04-01T00:00:00.000Z".to_string(),
                version: None,
            },
            fields: CommentFields {
                body: Some(LocalizedValue::Flattened(body.to_string())),
                author: None,
                subject: Some(LocalizedValue::Flattened(subject.to_string())),
                parent_comment: None,
            },
        }
    }

    #[tokio::test]
    async fn create_writes_locale_keyed_fields_and_publishes() {
        let (service, store) = service(InMemoryComments::default());
        let comment = service
            .create_comment(&request("post-1", "hello"))
            .await
            .expect("created");

        assert_eq!(comment.author, "Anonymous");
        assert_eq!(comment.subject, "post-1");
        assert_eq!(comment.body, "hello");
        assert_eq!(comment.parent_id, None);

        let created = store.created();
        assert_eq!(created.len(), 1);
        assert_eq!(
            serde_json::to_value(&created[0]).expect("json"),
            json!({
                "body": {"en-US": "hello"},
                "author": {"en-US": "Anonymous"},
                "subject": {"en-US": "post-1"}
            })
        );
        assert_eq!(store.published(), [("entry-1".to_string(), 1)]);
    }

    #[tokio::test]
    async fn create_links_parent_comment() {
        let (service, store) = service(InMemoryComments::default());
        let mut req = request("post-1", "reply");
        req.author = Some("  Mio ".into());
        req.parent_id = Some("c0".into());

        let comment = service.create_comment(&req).await.expect("created");
        assert_eq!(comment.author, "Mio");
        assert_eq!(comment.parent_id.as_deref(), Some("c0"));
        assert!(store.created()[0].parent_comment.is_some());
    }

    #[tokio::test]
    async fn blank_body_is_rejected_without_upstream_calls() {
        let (service, store) = service(InMemoryComments::default());
        let err = service
            .create_comment(&request("post-1", "   "))
            .await
            .expect_err("validation");

        assert!(matches!(err, CommentError::Validation(_)));
        assert_eq!(err.public_message(), "'slug' and 'body' are required.");
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn publish_failure_surfaces_upstream_status_and_leaves_orphan() {
        let (service, store) = service(InMemoryComments::default());
        store.fail(CommentFailure::Publish(422));

        let err = service
            .create_comment(&request("post-1", "hello"))
            .await
            .expect_err("publish failure");

        match &err {
            CommentError::Publish { entry_id, source } => {
                assert_eq!(entry_id, "entry-1");
                assert_eq!(source.status(), Some(422));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.public_message(), "Failed to publish comment entry.");
        assert_eq!(err.detail(), Some(json!({"message": "version mismatch"})));
        assert_eq!(store.created().len(), 1);
        assert!(store.published().is_empty());
    }

    #[tokio::test]
    async fn create_failure_skips_publish() {
        let (service, store) = service(InMemoryComments::default());
        store.fail(CommentFailure::Create(400));

        let err = service
            .create_comment(&request("post-1", "hello"))
            .await
            .expect_err("create failure");
        assert!(matches!(err, CommentError::Create(_)));
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn list_returns_only_matching_subject() {
        let (service, _) = service(InMemoryComments::with_entries(vec![
            delivered("c1", "post-1", "first"),
            delivered("c2", "post-2", "other"),
            delivered("c3", "post-1", "second"),
        ]));

        let list = service.list_comments(Some("post-1")).await.expect("list");
        let bodies: Vec<_> = list.items.iter().map(|c| c.body.as_str()).collect();
        assert_eq!(bodies, ["first", "second"]);
        assert!(list.items.iter().all(|c| c.author == "Anonymous"));
    }

    #[tokio::test]
    async fn list_without_matches_is_empty_success() {
        let (service, _) = service(InMemoryComments::default());
        let list = service.list_comments(Some("nothing")).await.expect("list");
        assert!(list.items.is_empty());
    }

    #[tokio::test]
    async fn list_matches_trimmed_subject_like_create_stores_it() {
        let (service, _) = service(InMemoryComments::default());
        service
            .create_comment(&request(" post-1 ", "hello"))
            .await
            .expect("created");

        let list = service.list_comments(Some("post-1  ")).await.expect("list");
        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].subject, "post-1");
    }

    #[tokio::test]
    async fn list_requires_slug() {
        let (service, store) = service(InMemoryComments::default());
        let err = service.list_comments(Some(" ")).await.expect_err("missing slug");
        assert!(matches!(err, CommentError::Validation(_)));
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn unconfigured_store_short_circuits() {
        let (service, store) = service(InMemoryComments::unconfigured());

        let err = service
            .create_comment(&request("post-1", "hello"))
            .await
            .expect_err("misconfigured");
        assert!(matches!(err, CommentError::Misconfigured));

        let err = service.list_comments(Some("post-1")).await.expect_err("misconfigured");
        assert_eq!(err.public_message(), "Service misconfigured");
        assert_eq!(store.calls(), 0);
    }
}
