use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::CookieJar;
use tracing::{error, info};
use uuid::Uuid;

use nest_types::api::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::session::{create_token, open_session, removal_cookie, session_cookie};
use crate::state::{AppState, with_db};

const INVALID_CREDENTIALS: &str = "invalid username or password";

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Validate input
    let username = req.username.trim().to_string();
    if username.len() < 3 || username.len() > 32 {
        return Err(ApiError::bad_request("username must be 3-32 characters"));
    }
    if req.password.len() < 8 {
        return Err(ApiError::bad_request("password must be at least 8 characters"));
    }

    // Check if username is taken
    let taken = {
        let username = username.clone();
        with_db(&state, move |db| db.get_user_by_username(&username)).await?
    };
    if taken.is_some() {
        return Err(ApiError::conflict("username already taken"));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Password hashing failed: {}", e);
            ApiError::internal()
        })?
        .to_string();

    let user_id = Uuid::new_v4();
    {
        let username = username.clone();
        with_db(&state, move |db| db.create_user(&user_id.to_string(), &username, &password_hash))
            .await
            .map_err(|e| match e.status {
                // Lost a race with another registration for the same name
                StatusCode::CONFLICT => ApiError::conflict("username already taken"),
                _ => e,
            })?;
    }

    let token = create_token(&state.jwt_secret, user_id, &username).map_err(|e| {
        error!("Token creation failed: {}", e);
        ApiError::internal()
    })?;

    info!(user_id = %user_id, "Registered password user");

    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(token.clone(), state.cookie_secure)),
        Json(RegisterResponse { user_id, token }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_string();
    let user = with_db(&state, move |db| db.get_user_by_username(&username))
        .await?
        .ok_or_else(|| ApiError::unauthorized(INVALID_CREDENTIALS))?;

    // Wallet-only accounts have no password to check against
    let stored = user
        .password
        .as_deref()
        .ok_or_else(|| ApiError::unauthorized(INVALID_CREDENTIALS))?;

    let parsed_hash = PasswordHash::new(stored).map_err(|e| {
        error!("Stored password hash for '{}' is unreadable: {}", user.username, e);
        ApiError::internal()
    })?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::unauthorized(INVALID_CREDENTIALS))?;

    let (user_id, token) = open_session(&state.jwt_secret, &user.id, &user.username)?;

    Ok((
        jar.add(session_cookie(token.clone(), state.cookie_secure)),
        Json(LoginResponse {
            user_id,
            username: user.username,
            token,
        }),
    ))
}

/// Clears the session cookie. Bearer tokens are stateless and simply expire.
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (jar.remove(removal_cookie()), StatusCode::NO_CONTENT)
}

