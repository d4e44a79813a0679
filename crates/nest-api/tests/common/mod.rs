#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use k256::ecdsa::SigningKey;
use rand_core::OsRng;
use serde_json::{Value, json};
use tower::ServiceExt;

use nest_api::{AppState, AppStateInner, router};
use nest_db::Database;
use nest_wallet::WalletAuthenticator;
use nest_wallet::signature::{address_of, sign_personal_message};

pub const JWT_SECRET: &str = "integration-test-secret";

pub fn app() -> (Router, AppState) {
    app_with_nonce_ttl(Duration::from_secs(300))
}

pub fn app_with_nonce_ttl(ttl: Duration) -> (Router, AppState) {
    let db = Database::open_in_memory().unwrap();
    let state: AppState = Arc::new(AppStateInner::new(db, WalletAuthenticator::new(ttl), JWT_SECRET));
    (router(state.clone()), state)
}

pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response {
    call_with_headers(app, method, uri, token, body, &[]).await
}

pub async fn call_with_headers(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
    extra: &[(&str, &str)],
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    for (name, value) in extra {
        builder = builder.header(*name, *value);
    }
    let body = match body {
        Some(v) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };

    Response { status, headers, body }
}

pub struct TestWallet {
    key: SigningKey,
    pub address: String,
}

impl TestWallet {
    pub fn new() -> Self {
        let key = SigningKey::random(&mut OsRng);
        let address = address_of(key.verifying_key());
        Self { key, address }
    }

    pub fn sign(&self, message: &str) -> String {
        sign_personal_message(&self.key, message).unwrap()
    }
}

pub async fn request_nonce(app: &Router, address: &str) -> String {
    let res = call(app, Method::GET, &format!("/auth/wallet/nonce?address={address}"), None, None).await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    res.body["nonce"].as_str().unwrap().to_string()
}

/// Full nonce -> sign -> login round. Returns the login response body.
pub async fn wallet_login(app: &Router, wallet: &TestWallet) -> Value {
    let nonce = request_nonce(app, &wallet.address).await;
    let res = call(
        app,
        Method::POST,
        "/auth/wallet/login",
        None,
        Some(json!({ "address": wallet.address, "signature": wallet.sign(&nonce) })),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    res.body
}

/// Registers a password user and returns `(user_id, token)`.
pub async fn register(app: &Router, username: &str) -> (String, String) {
    let res = call(
        app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "username": username, "password": "correct horse" })),
    )
    .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    (
        res.body["user_id"].as_str().unwrap().to_string(),
        res.body["token"].as_str().unwrap().to_string(),
    )
}
