use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use nest_types::api::{Claims, SaveDraftRequest};
use nest_types::models::Draft;

use crate::convert;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::posts::MAX_MEDIA_PATHS;
use crate::state::{AppState, with_db};

/// Trims the content and rejects drafts with nothing in them.
fn validate(req: SaveDraftRequest) -> Result<(Option<String>, Vec<String>), ApiError> {
    let content = req
        .content
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    if content.is_none() && req.media_paths.is_empty() {
        return Err(ApiError::bad_request("draft is empty"));
    }
    if req.media_paths.len() > MAX_MEDIA_PATHS {
        return Err(ApiError::bad_request("at most 9 media files per draft"));
    }
    Ok((content, req.media_paths))
}

pub async fn list_drafts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Draft>>, ApiError> {
    let user_id = claims.sub.to_string();
    let rows = with_db(&state, move |db| db.list_drafts(&user_id)).await?;
    Ok(Json(rows.into_iter().map(convert::draft).collect()))
}

pub async fn create_draft(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<SaveDraftRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (content, media_paths) = validate(req)?;
    let user_id = claims.sub.to_string();
    let draft_id = Uuid::new_v4().to_string();

    let row = with_db(&state, move |db| {
        db.insert_draft(&draft_id, &user_id, content.as_deref(), &media_paths)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(convert::draft(row))))
}

pub async fn update_draft(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(draft_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<SaveDraftRequest>,
) -> Result<Json<Draft>, ApiError> {
    let (content, media_paths) = validate(req)?;
    let user_id = claims.sub.to_string();

    let row = with_db(&state, move |db| {
        db.update_draft(&draft_id.to_string(), &user_id, content.as_deref(), &media_paths)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("draft not found"))?;

    Ok(Json(convert::draft(row)))
}

pub async fn delete_draft(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(draft_id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user_id = claims.sub.to_string();
    let deleted = with_db(&state, move |db| db.delete_draft(&draft_id.to_string(), &user_id)).await?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("draft not found"))
    }
}
