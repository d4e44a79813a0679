use axum::{
    Json,
    extract::State,
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{error, info};

use nest_types::api::{NonceQuery, NonceResponse, WalletLoginRequest, WalletLoginResponse};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::resolver::resolve_or_create_user;
use crate::session::{open_session, session_cookie};
use crate::state::AppState;

/// `GET /auth/wallet/nonce?address=0x...`
///
/// Issues a fresh challenge for the wallet, replacing any outstanding one.
pub async fn nonce(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<NonceQuery>,
) -> Result<Json<NonceResponse>, ApiError> {
    let address = query.address.unwrap_or_default();
    let nonce = state.wallet.issue_nonce(&address)?;
    Ok(Json(NonceResponse { nonce }))
}

/// `POST /auth/wallet/login`
///
/// Verifies the signature over the outstanding nonce, then finds or
/// registers the wallet's user and opens a session for it.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<WalletLoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let address = req.address.unwrap_or_default();
    let signature = req.signature.unwrap_or_default();

    let verified = state.wallet.verify(&address, &signature)?;

    let db_state = state.clone();
    let user = tokio::task::spawn_blocking(move || resolve_or_create_user(&db_state.db, &verified))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal()
        })??;

    let (user_id, token) = open_session(&state.jwt_secret, &user.id, &user.username)?;

    info!(user_id = %user_id, username = %user.username, "Wallet login");

    Ok((
        jar.add(session_cookie(token.clone(), state.cookie_secure)),
        Json(WalletLoginResponse {
            success: true,
            user_id,
            username: user.username,
            token,
        }),
    ))
}
