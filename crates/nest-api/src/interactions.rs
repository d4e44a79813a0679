use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use nest_types::api::{Claims, CreateCommentRequest, LikeResponse, ShareResponse};
use nest_types::models::Comment;

use crate::convert;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::{AppState, with_db};

const MAX_COMMENT_LEN: usize = 2000;

/// Runs `f` against an existing post, or answers 404.
async fn on_post<F, T>(state: &AppState, post_id: Uuid, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&nest_db::Database, &str) -> nest_db::StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    with_db(state, move |db| {
        let id = post_id.to_string();
        if !db.post_exists(&id)? {
            return Ok(None);
        }
        f(db, &id).map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("post not found"))
}

/// Toggle the caller's like on a post.
pub async fn toggle_like(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(post_id): ApiPath<Uuid>,
) -> Result<Json<LikeResponse>, ApiError> {
    let user_id = claims.sub.to_string();
    let (liked, like_count) = on_post(&state, post_id, move |db, id| db.toggle_like(&user_id, id)).await?;
    Ok(Json(LikeResponse { liked, like_count }))
}

pub async fn list_comments(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<Uuid>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let rows = on_post(&state, post_id, |db, id| db.get_comments(id)).await?;
    Ok(Json(rows.into_iter().map(convert::comment).collect()))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(post_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::bad_request("comment must not be empty"));
    }
    if content.chars().count() > MAX_COMMENT_LEN {
        return Err(ApiError::bad_request("comment must be at most 2000 characters"));
    }

    let user_id = claims.sub.to_string();
    let comment_id = Uuid::new_v4().to_string();
    let row = on_post(&state, post_id, move |db, id| {
        db.insert_comment(&comment_id, id, &user_id, &content)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(convert::comment(row))))
}

pub async fn share_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(post_id): ApiPath<Uuid>,
) -> Result<Json<ShareResponse>, ApiError> {
    let user_id = claims.sub.to_string();
    let share_id = Uuid::new_v4().to_string();
    let share_count = on_post(&state, post_id, move |db, id| db.insert_share(&share_id, &user_id, id)).await?;
    Ok(Json(ShareResponse { share_count }))
}
