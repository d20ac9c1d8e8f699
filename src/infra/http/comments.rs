use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use newsdesk_api_types::{CommentList, CommentListQuery, CreateCommentRequest};

use super::{ApiError, HttpState};

const SOURCE_LIST: &str = "infra::http::comments::list";
const SOURCE_CREATE: &str = "infra::http::comments::create";

pub(super) async fn list_comments(
    State(state): State<HttpState>,
    Query(query): Query<CommentListQuery>,
) -> Result<Json<CommentList>, ApiError> {
    state
        .comments
        .list_comments(query.slug.as_deref())
        .await
        .map(Json)
        .map_err(|err| ApiError::from((SOURCE_LIST, err)))
}

/// The body is decoded by hand so malformed JSON and a missing content type
/// both answer 400 with the same message.
pub(super) async fn create_comment(
    State(state): State<HttpState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    state
        .comments
        .ensure_configured()
        .map_err(|err| ApiError::from((SOURCE_CREATE, err)))?;

    let request: CreateCommentRequest = serde_json::from_slice(&body)
        .map_err(|_| ApiError::bad_request(SOURCE_CREATE, "Invalid JSON body."))?;

    let comment = state
        .comments
        .create_comment(&request)
        .await
        .map_err(|err| ApiError::from((SOURCE_CREATE, err)))?;

    Ok((StatusCode::CREATED, Json(comment)).into_response())
}
