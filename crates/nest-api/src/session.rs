use axum::http::{HeaderMap, header};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::error;
use uuid::Uuid;

use nest_types::api::Claims;

use crate::error::ApiError;

/// Name of the cookie carrying the session token for browser clients.
pub const SESSION_COOKIE: &str = "nest_session";

const SESSION_DAYS: i64 = 30;

pub fn create_token(secret: &str, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(SESSION_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn decode_token(secret: &str, token: &str) -> anyhow::Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Signs a session for a stored user row. A non-UUID id fails the login
/// rather than producing a token for the nil UUID.
pub fn open_session(secret: &str, raw_id: &str, username: &str) -> Result<(Uuid, String), ApiError> {
    let user_id: Uuid = raw_id.parse().map_err(|e| {
        error!("User '{}' has a non-UUID id '{}': {}", username, raw_id, e);
        ApiError::internal()
    })?;

    let token = create_token(secret, user_id, username).map_err(|e| {
        error!("Token creation failed: {}", e);
        ApiError::internal()
    })?;

    Ok((user_id, token))
}

pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Empty cookie with the same path, used to make the browser drop the session.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

/// Session token from `Authorization: Bearer ...`, falling back to the cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    bearer.or_else(|| {
        CookieJar::from_headers(headers)
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn token_round_trips_claims() {
        let user_id = Uuid::new_v4();
        let token = create_token("test-secret", user_id, "a1b2c3d4").unwrap();

        let claims = decode_token("test-secret", &token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, "a1b2c3d4");
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = create_token("secret-one", Uuid::new_v4(), "alice").unwrap();
        assert!(decode_token("secret-two", &token).is_err());
    }

    #[test]
    fn open_session_signs_the_stored_id() {
        let user_id = Uuid::new_v4();
        let (parsed, token) = open_session("test-secret", &user_id.to_string(), "alice").unwrap();
        assert_eq!(parsed, user_id);
        assert_eq!(decode_token("test-secret", &token).unwrap().sub, user_id);
    }

    #[test]
    fn open_session_refuses_non_uuid_ids() {
        let err = open_session("test-secret", "u1", "alice").unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "internal server error");
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        headers.insert(header::COOKIE, HeaderValue::from_static("nest_session=from-cookie"));

        assert_eq!(token_from_headers(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn cookie_is_used_without_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; nest_session=abc"));

        assert_eq!(token_from_headers(&headers).as_deref(), Some("abc"));
        assert_eq!(token_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn session_cookie_is_http_only() {
        let cookie = session_cookie("tok".into(), true);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }
}
