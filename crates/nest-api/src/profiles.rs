use axum::{
    Extension, Json,
    extract::State,
};
use uuid::Uuid;

use nest_types::api::{Claims, UpdateProfileRequest};
use nest_types::models::User;

use crate::convert;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::{AppState, with_db};

const MAX_DISPLAY_NAME: usize = 100;
const MAX_BIO: usize = 500;

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<User>, ApiError> {
    get_user(State(state), ApiPath(claims.sub)).await
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    if req.display_name.as_ref().is_some_and(|n| n.chars().count() > MAX_DISPLAY_NAME) {
        return Err(ApiError::bad_request("display_name must be at most 100 characters"));
    }
    if req.bio.as_ref().is_some_and(|b| b.chars().count() > MAX_BIO) {
        return Err(ApiError::bad_request("bio must be at most 500 characters"));
    }

    let user_id = claims.sub.to_string();
    let row = with_db(&state, move |db| {
        db.update_profile(
            &user_id,
            req.display_name.as_deref(),
            req.bio.as_deref(),
            req.avatar.as_deref(),
        )
    })
    .await?
    .ok_or_else(|| ApiError::not_found("user not found"))?;

    Ok(Json(convert::user(row)))
}

pub async fn get_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Json<User>, ApiError> {
    let row = with_db(&state, move |db| db.get_user_by_id(&user_id.to_string()))
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    Ok(Json(convert::user(row)))
}
