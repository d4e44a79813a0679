use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::session::{decode_token, token_from_headers};
use crate::state::AppState;

/// Validates the session token (Bearer header or session cookie) and stores
/// its [`nest_types::api::Claims`] as a request extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = token_from_headers(req.headers()).ok_or_else(|| ApiError::unauthorized("not logged in"))?;

    let claims = decode_token(&state.jwt_secret, &token)
        .map_err(|_| ApiError::unauthorized("invalid or expired session"))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
