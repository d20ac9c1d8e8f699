//! GraphQL content endpoint adapter.

use async_trait::async_trait;
use reqwest::{Url, header};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{CmsHttp, endpoint};
use crate::application::repos::{
    CollectionQuery, ContentRequest, ContentResponse, ContentSource, EntryFilter, RawCollection,
    SortOrder, UpstreamError,
};
use crate::config::Secret;
use crate::domain::entities::Selection;
use crate::domain::timestamps::to_filter_literal;
use crate::infra::error::InfraError;

const RICH_CONTENT_FIELDS: &str = "content { json links { assets { block { sys { id } url description } } } }";

pub struct GraphqlContentSource {
    http: CmsHttp,
    endpoint: Url,
    delivery_token: Secret,
    preview_token: Option<Secret>,
}

impl GraphqlContentSource {
    pub(crate) fn new(
        http: CmsHttp,
        base: &Url,
        space_id: &str,
        environment: &str,
        delivery_token: Secret,
        preview_token: Option<Secret>,
    ) -> Result<Self, InfraError> {
        let endpoint = endpoint(
            base,
            &["content", "v1", "spaces", space_id, "environments", environment],
        )
        .map_err(|err| InfraError::configuration(err.to_string()))?;

        Ok(Self {
            http,
            endpoint,
            delivery_token,
            preview_token,
        })
    }

    fn token(&self, preview: bool) -> Result<&Secret, UpstreamError> {
        if preview {
            self.preview_token.as_ref().ok_or(UpstreamError::Misconfigured)
        } else {
            Ok(&self.delivery_token)
        }
    }
}

#[async_trait]
impl ContentSource for GraphqlContentSource {
    async fn fetch(&self, request: &ContentRequest) -> Result<ContentResponse, UpstreamError> {
        let token = self.token(request.preview)?;
        let query = render_query(request);
        debug!(
            target = "newsdesk::cms::graphql",
            preview = request.preview,
            collections = request.collections.len(),
            "querying content endpoint"
        );

        let builder = self
            .http
            .client()
            .post(self.endpoint.clone())
            .bearer_auth(token.expose())
            .header(header::CONTENT_TYPE, "application/json")
            .json(&json!({ "query": query }));
        let body = self.http.send_json("graphql", builder).await?;

        if let Some(errors) = body.get("errors").and_then(Value::as_array)
            && !errors.is_empty()
        {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|error| error.get("message").and_then(Value::as_str))
                .collect();
            warn!(
                target = "newsdesk::cms::graphql",
                count = errors.len(),
                messages = ?messages,
                "content endpoint reported GraphQL errors"
            );
        }

        let data = body.get("data");
        let collections = request
            .collections
            .iter()
            .map(|query| {
                RawCollection::from_value(data.and_then(|data| data.get(query.response_key())))
            })
            .collect();

        Ok(ContentResponse { collections })
    }
}

/// Render the GraphQL document for a request.
pub fn render_query(request: &ContentRequest) -> String {
    let mut query = String::from("query {");
    for collection in &request.collections {
        query.push(' ');
        query.push_str(&render_collection(collection, request.preview));
    }
    query.push_str(" }");
    query
}

fn render_collection(query: &CollectionQuery, preview: bool) -> String {
    let mut arguments = vec![format!("where: {{ {} }}", render_filter(&query.filter))];
    if let Some(order) = query.order {
        arguments.push(format!(
            "order: {}",
            match order {
                SortOrder::DateAsc => "date_ASC",
                SortOrder::DateDesc => "date_DESC",
            }
        ));
    }
    arguments.push(format!("preview: {preview}"));
    if let Some(limit) = query.limit {
        arguments.push(format!("limit: {limit}"));
    }
    if let Some(skip) = query.skip {
        arguments.push(format!("skip: {skip}"));
    }

    let alias = query
        .alias
        .map(|alias| format!("{alias}: "))
        .unwrap_or_default();
    let totals = if query.with_totals { "total limit skip " } else { "" };

    format!(
        "{alias}{}({}) {{ {totals}items {{ {} }} }}",
        query.kind.collection_field(),
        arguments.join(", "),
        selection_fields(query.selection),
    )
}

fn render_filter(filter: &EntryFilter) -> String {
    match filter {
        EntryFilter::SlugExists => "slug_exists: true".to_string(),
        EntryFilter::SlugEquals(slug) => format!("slug: {}", string_literal(slug)),
        EntryFilter::SlugNotIn(slugs) => {
            let items: Vec<String> = slugs.iter().map(|slug| string_literal(slug)).collect();
            format!("slug_not_in: [{}]", items.join(", "))
        }
        EntryFilter::DateAfter(date) => format!(
            "slug_exists: true, date_gt: {}",
            string_literal(&to_filter_literal(*date))
        ),
        EntryFilter::DateBefore(date) => format!(
            "slug_exists: true, date_lt: {}",
            string_literal(&to_filter_literal(*date))
        ),
    }
}

fn selection_fields(selection: Selection) -> String {
    match selection {
        Selection::PostFull => format!(
            "slug title coverImage {{ url }} date author {{ name picture {{ url }} }} excerpt {RICH_CONTENT_FIELDS}"
        ),
        Selection::NoticeFull => {
            format!("slug title coverImage: cover {{ url }} date {RICH_CONTENT_FIELDS}")
        }
        Selection::Summary => "slug title date".to_string(),
    }
}

/// Quote and escape a GraphQL string literal.
fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            ch if ch.is_control() => out.push_str(&format!("\\u{:04X}", ch as u32)),
            ch => out.push(ch),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use httpmock::MockServer;
    use time::macros::datetime;

    use super::*;
    use crate::application::content::{CollectionOptions, ContentClient};
    use crate::config::CmsSettings;
    use crate::domain::entities::Post;
    use crate::domain::types::CollectionKind;

    fn settings() -> CmsSettings {
        CmsSettings {
            space_id: Some("space".into()),
            environment: "master".into(),
            delivery_token: Some(Secret::new("cda")),
            management_token: Some(Secret::new("cma")),
            preview_token: Some(Secret::new("preview")),
            default_locale: "en-US".into(),
            comment_content_type: "comment".into(),
            graphql_url: Url::parse("https://graphql.example").expect("url"),
            delivery_url: Url::parse("https://cdn.example").expect("url"),
            management_url: Url::parse("https://api.example").expect("url"),
            request_timeout: Duration::from_secs(5),
        }
    }

    fn source(server: &MockServer, timeout: Duration) -> GraphqlContentSource {
        let mut settings = settings();
        settings.request_timeout = timeout;
        GraphqlContentSource::new(
            CmsHttp::new(&settings).expect("client"),
            &Url::parse(&server.base_url()).expect("url"),
            "space",
            "master",
            Secret::new("cda"),
            Some(Secret::new("preview")),
        )
        .expect("source")
    }

    fn listing() -> ContentRequest {
        ContentRequest::single(
            false,
            CollectionQuery::new(CollectionKind::Notice, Selection::Summary, EntryFilter::SlugExists)
                .ordered(SortOrder::DateDesc)
                .limit(10)
                .skip(0)
                .with_totals(),
        )
    }

    #[test]
    fn listing_query_embeds_filter_order_and_window() {
        assert_eq!(
            render_query(&listing()),
            "query { noticeCollection(where: { slug_exists: true }, order: date_DESC, preview: false, limit: 10, skip: 0) { total limit skip items { slug title date } } }"
        );
    }

    #[test]
    fn range_query_uses_aliases_and_normalised_dates() {
        let date = datetime!(2024-03-01 09:00 +09:00);
        let request = ContentRequest {
            preview: true,
            collections: vec![
                CollectionQuery::new(CollectionKind::Post, Selection::Summary, EntryFilter::DateAfter(date))
                    .aliased("newer")
                    .ordered(SortOrder::DateAsc)
                    .limit(1),
                CollectionQuery::new(CollectionKind::Post, Selection::Summary, EntryFilter::DateBefore(date))
                    .aliased("older")
                    .ordered(SortOrder::DateDesc)
                    .limit(1),
            ],
        };
        let query = render_query(&request);
        assert!(query.contains(
            "newer: postCollection(where: { slug_exists: true, date_gt: \"2024-03-01T00:00:00.000Z\" }, order: date_ASC, preview: true, limit: 1)"
        ));
        assert!(query.contains(
            "older: postCollection(where: { slug_exists: true, date_lt: \"2024-03-01T00:00:00.000Z\" }, order: date_DESC, preview: true, limit: 1)"
        ));
    }

    #[test]
    fn slug_literals_cannot_break_out_of_the_filter() {
        let rendered = render_filter(&EntryFilter::SlugEquals("a\" } evil: { \\\n".into()));
        assert_eq!(rendered, "slug: \"a\\\" } evil: { \\\\\\n\"");

        let rendered = render_filter(&EntryFilter::SlugNotIn(vec!["x\u{1}".into()]));
        assert_eq!(rendered, "slug_not_in: [\"x\\u0001\"]");
    }

    #[test]
    fn notice_selection_aliases_cover() {
        assert!(selection_fields(Selection::NoticeFull).contains("coverImage: cover { url }"));
        assert!(selection_fields(Selection::PostFull).contains("author { name picture { url } }"));
    }

    #[tokio::test]
    async fn fetch_posts_query_with_bearer_token() {
        let server = MockServer::start();
        let mock = server
            .mock(|when, then| {
                when.method("POST")
                    .path("/content/v1/spaces/space/environments/master")
                    .header("authorization", "Bearer cda");
                then.status(200).json_body(json!({
                    "data": {"noticeCollection": {
                        "total": 2, "limit": 10, "skip": 0,
                        "items": [{"slug": "n2", "title": "B", "date": "2024-01-02"}, null]
                    }}
                }));
            });

        let response = source(&server, Duration::from_secs(5))
            .fetch(&listing())
            .await
            .expect("response");

        mock.assert();
        assert_eq!(response.collections.len(), 1);
        assert_eq!(response.collections[0].total, 2);
        assert_eq!(response.collections[0].items.len(), 1);
    }

    #[tokio::test]
    async fn unfinished_entries_decode_with_empty_fields() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("POST");
            then.status(200).json_body(json!({
                "data": {"postCollection": {
                    "total": 3, "limit": 10, "skip": 0,
                    "items": [
                        {
                            "slug": "draft", "title": null, "coverImage": {"url": null},
                            "date": null, "author": {"name": null, "picture": null},
                            "excerpt": null, "content": null
                        },
                        {
                            "slug": null, "title": null, "coverImage": null,
                            "date": null, "author": null, "excerpt": null, "content": null
                        },
                        {
                            "slug": "ready", "title": "Ready", "coverImage": null,
                            "date": "2024-01-01T00:00:00.000Z", "author": null,
                            "excerpt": null,
                            "content": {"json": {"nodeType": "document"}, "links": {"assets": {"block": []}}}
                        }
                    ]
                }}
            }));
        });

        let client = ContentClient::new(Arc::new(source(&server, Duration::from_secs(5))));
        let posts = client
            .fetch_collection::<Post>(CollectionOptions::listing(false))
            .await
            .expect("listing");

        let slugs: Vec<_> = posts.items.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, ["draft", "ready"]);
        assert_eq!(posts.items[0].title, "");
        assert_eq!(posts.items[0].cover_image.as_ref().map(|c| c.url.as_str()), Some(""));
        assert_eq!(posts.items[0].author.as_ref().map(|a| a.name.as_str()), Some(""));
        assert_eq!(posts.total, 3);
    }

    #[tokio::test]
    async fn preview_requests_use_preview_token() {
        let server = MockServer::start();
        let mock = server
            .mock(|when, then| {
                when.method("POST").header("authorization", "Bearer preview");
                then.status(200).json_body(json!({"data": {}}));
            });

        let mut request = listing();
        request.preview = true;
        let response = source(&server, Duration::from_secs(5))
            .fetch(&request)
            .await
            .expect("response");

        mock.assert();
        assert_eq!(response.collections[0], RawCollection::default());
    }

    #[tokio::test]
    async fn graphql_errors_do_not_fail_the_request() {
        let server = MockServer::start();
        server
            .mock(|when, then| {
                when.method("POST");
                then.status(200).json_body(json!({
                    "data": {"noticeCollection": {"total": 0, "items": []}},
                    "errors": [{"message": "partial failure"}]
                }));
            });

        let response = source(&server, Duration::from_secs(5))
            .fetch(&listing())
            .await
            .expect("response");
        assert!(response.collections[0].items.is_empty());
    }

    #[tokio::test]
    async fn upstream_status_and_body_are_preserved() {
        let server = MockServer::start();
        server
            .mock(|when, then| {
                when.method("POST");
                then.status(401)
                    .json_body(json!({"message": "access token invalid"}));
            });

        let err = source(&server, Duration::from_secs(5))
            .fetch(&listing())
            .await
            .expect_err("unauthorized");
        match err {
            UpstreamError::Status { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, Some(json!({"message": "access token invalid"})));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_json_is_a_decode_error() {
        let server = MockServer::start();
        server
            .mock(|when, then| {
                when.method("POST");
                then.status(200).body("<html>not json</html>");
            });

        let err = source(&server, Duration::from_secs(5))
            .fetch(&listing())
            .await
            .expect_err("decode failure");
        assert!(matches!(err, UpstreamError::Decode(_)));
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let server = MockServer::start();
        server
            .mock(|when, then| {
                when.method("POST");
                then.status(200)
                    .delay(Duration::from_millis(500))
                    .json_body(json!({"data": {}}));
            });

        let err = source(&server, Duration::from_millis(50))
            .fetch(&listing())
            .await
            .expect_err("timeout");
        assert!(matches!(err, UpstreamError::Timeout));
    }
}
