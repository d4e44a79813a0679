use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use nest_db::models::PageCursor;
use nest_types::api::{Claims, CreatePostRequest};
use nest_types::models::{Post, Topic};

use crate::convert::{self, to_db_timestamp};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::{AppState, with_db};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const MAX_MEDIA_PATHS: usize = 9;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<u32>,
    /// Return posts strictly older than this timestamp.
    pub before: Option<DateTime<Utc>>,
    /// Id of the last post already shown; ties on `created_at` are kept.
    pub before_id: Option<Uuid>,
    /// Topic slug filter.
    pub topic: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub before: Option<DateTime<Utc>>,
    pub before_id: Option<Uuid>,
}

impl PageQuery {
    /// Cursor bounds in stored form: `(before, before_id)`.
    pub fn cursor_parts(&self) -> (Option<String>, Option<String>) {
        cursor_parts(self.before, self.before_id)
    }
}

fn cursor_parts(before: Option<DateTime<Utc>>, before_id: Option<Uuid>) -> (Option<String>, Option<String>) {
    (before.map(to_db_timestamp), before_id.map(|id| id.to_string()))
}

pub fn page_size(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

pub async fn list_topics(State(state): State<AppState>) -> Result<Json<Vec<Topic>>, ApiError> {
    let rows = with_db(&state, |db| db.list_topics()).await?;
    Ok(Json(rows.into_iter().map(convert::topic).collect()))
}

pub async fn feed(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<FeedQuery>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let cursor = cursor_parts(query.before, query.before_id);
    load_page(&state, &claims, query.topic, cursor, query.limit).await
}

pub async fn topic_posts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(name): ApiPath<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<Vec<Post>>, ApiError> {
    load_page(&state, &claims, Some(name), query.cursor_parts(), query.limit).await
}

async fn load_page(
    state: &AppState,
    claims: &Claims,
    topic: Option<String>,
    (before, before_id): (Option<String>, Option<String>),
    limit: Option<u32>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let viewer_id = claims.sub.to_string();
    let limit = page_size(limit);

    let rows = with_db(state, move |db| {
        let topic_id = match topic {
            Some(name) => match db.get_topic_by_name(&name)? {
                Some(t) => Some(t.id),
                None => return Ok(None),
            },
            None => None,
        };
        let cursor = PageCursor {
            before: before.as_deref(),
            before_id: before_id.as_deref(),
        };
        db.get_feed(&viewer_id, topic_id, cursor, limit).map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("topic not found"))?;

    Ok(Json(rows.into_iter().map(convert::post).collect()))
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::bad_request("content must not be empty"));
    }
    if req.media_paths.len() > MAX_MEDIA_PATHS {
        return Err(ApiError::bad_request("at most 9 media files per post"));
    }

    let post_id = Uuid::new_v4();
    let user_id = claims.sub.to_string();
    let row = with_db(&state, move |db| {
        let Some(topic) = db.get_topic_by_name(&req.topic)? else {
            return Ok(None);
        };
        let id = post_id.to_string();
        db.insert_post(&id, &user_id, topic.id, &content, &req.media_paths)?;
        db.get_post(&user_id, &id)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("topic not found"))?;

    info!(post_id = %post_id, author = %claims.username, "Post created");

    Ok((StatusCode::CREATED, Json(convert::post(row))))
}

pub async fn get_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(post_id): ApiPath<Uuid>,
) -> Result<Json<Post>, ApiError> {
    let viewer_id = claims.sub.to_string();
    let row = with_db(&state, move |db| db.get_post(&viewer_id, &post_id.to_string()))
        .await?
        .ok_or_else(|| ApiError::not_found("post not found"))?;

    Ok(Json(convert::post(row)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(page_size(None), DEFAULT_PAGE_SIZE);
        assert_eq!(page_size(Some(0)), 1);
        assert_eq!(page_size(Some(50)), 50);
        assert_eq!(page_size(Some(10_000)), MAX_PAGE_SIZE);
    }
}
