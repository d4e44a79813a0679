use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;
use uuid::Uuid;

use nest_db::models::PageCursor;
use nest_types::api::{Claims, SendMessageRequest};
use nest_types::models::{Conversation, PrivateMessage};

use crate::convert;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::posts::{PageQuery, page_size};
use crate::state::{AppState, with_db};

const MAX_MESSAGE_LEN: usize = 4000;

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.receiver_id == claims.sub {
        return Err(ApiError::bad_request("cannot message yourself"));
    }
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::bad_request("message must not be empty"));
    }
    if content.chars().count() > MAX_MESSAGE_LEN {
        return Err(ApiError::bad_request("message must be at most 4000 characters"));
    }

    let sender_id = claims.sub.to_string();
    let receiver_id = req.receiver_id.to_string();
    let message_id = Uuid::new_v4().to_string();

    let row = with_db(&state, move |db| {
        if db.get_user_by_id(&receiver_id)?.is_none() {
            return Ok(None);
        }
        db.insert_message(&message_id, &sender_id, &receiver_id, &content).map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("receiver not found"))?;

    Ok((StatusCode::CREATED, Json(convert::message(row))))
}

/// One entry per peer, most recent conversation first.
pub async fn inbox(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    let user_id = claims.sub.to_string();
    let rows = with_db(&state, move |db| db.list_conversations(&user_id)).await?;
    Ok(Json(rows.into_iter().map(convert::conversation).collect()))
}

/// Messages with `peer_id`, newest first. Opening the conversation marks the
/// peer's messages as read.
pub async fn conversation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(peer_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<Vec<PrivateMessage>>, ApiError> {
    let user_id = claims.sub.to_string();
    let peer = peer_id.to_string();
    let (before, before_id) = query.cursor_parts();
    let limit = page_size(query.limit);

    let rows = with_db(&state, move |db| {
        let marked = db.mark_conversation_read(&user_id, &peer)?;
        if marked > 0 {
            debug!("Marked {} messages from {} as read", marked, peer);
        }
        let cursor = PageCursor {
            before: before.as_deref(),
            before_id: before_id.as_deref(),
        };
        db.get_conversation(&user_id, &peer, cursor, limit)
    })
    .await?;

    Ok(Json(rows.into_iter().map(convert::message).collect()))
}
