mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{Method, StatusCode, header};
use serde_json::json;

use common::{TestWallet, app, app_with_nonce_ttl, call, call_with_headers, register, request_nonce, wallet_login};
use nest_api::resolver::{derive_username, fallback_username, resolve_or_create_user};
use nest_db::Database;
use nest_wallet::WalletAuthenticator;

#[tokio::test]
async fn health_is_public() {
    let (app, _) = app();
    let res = call(&app, Method::GET, "/health", None, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn first_login_registers_wallet_user() {
    let (app, _) = app();
    let wallet = TestWallet::new();

    let body = wallet_login(&app, &wallet).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["username"], &wallet.address[2..10]);

    let token = body["token"].as_str().unwrap();
    let me = call(&app, Method::GET, "/me", Some(token), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["id"], body["user_id"]);
    assert_eq!(me.body["wallet_address"], wallet.address.as_str());
}

#[tokio::test]
async fn returning_wallet_gets_same_user() {
    let (app, _) = app();
    let wallet = TestWallet::new();

    let first = wallet_login(&app, &wallet).await;
    let second = wallet_login(&app, &wallet).await;
    assert_eq!(first["user_id"], second["user_id"]);
    assert_eq!(first["username"], second["username"]);
}

#[tokio::test]
async fn address_case_does_not_matter() {
    let (app, _) = app();
    let wallet = TestWallet::new();
    let first = wallet_login(&app, &wallet).await;

    let shouting = format!("0x{}", wallet.address[2..].to_uppercase());
    let nonce = request_nonce(&app, &shouting).await;
    let res = call(
        &app,
        Method::POST,
        "/auth/wallet/login",
        None,
        Some(json!({ "address": shouting, "signature": wallet.sign(&nonce) })),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["user_id"], first["user_id"]);
}

#[tokio::test]
async fn nonce_requires_address() {
    let (app, _) = app();

    let res = call(&app, Method::GET, "/auth/wallet/nonce", None, None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "missing parameter: address");

    let res = call(&app, Method::GET, "/auth/wallet/nonce?address=", None, None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn nonce_has_expected_shape() {
    let (app, _) = app();
    let nonce = request_nonce(&app, &TestWallet::new().address).await;

    let body = nonce.strip_prefix("NTUNEST-").unwrap();
    assert_eq!(body.len(), 16);
    assert!(body.chars().all(|c| c.is_ascii_hexdigit()));
}

#[tokio::test]
async fn missing_fields_are_rejected() {
    let (app, _) = app();
    let wallet = TestWallet::new();
    request_nonce(&app, &wallet.address).await;

    let res = call(&app, Method::POST, "/auth/wallet/login", None, Some(json!({ "address": wallet.address }))).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "missing parameter: signature");

    let res = call(&app, Method::POST, "/auth/wallet/login", None, Some(json!({ "signature": "0x00" }))).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "missing parameter: address");
}

#[tokio::test]
async fn malformed_login_bodies_get_json_errors() {
    let (app, _) = app();

    let wrong_type = call(
        &app,
        Method::POST,
        "/auth/wallet/login",
        None,
        Some(json!({ "address": 123, "signature": "0x00" })),
    )
    .await;
    assert_eq!(wrong_type.status, StatusCode::BAD_REQUEST);
    assert!(wrong_type.body["error"].is_string(), "{}", wrong_type.body);

    let truncated = call_with_headers(
        &app,
        Method::POST,
        "/auth/wallet/login",
        None,
        None,
        &[("content-type", "application/json")],
    )
    .await;
    assert_eq!(truncated.status, StatusCode::BAD_REQUEST);
    assert!(truncated.body["error"].is_string(), "{}", truncated.body);

    let no_body = call(&app, Method::POST, "/auth/wallet/login", None, None).await;
    assert_eq!(no_body.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(no_body.body["error"].is_string(), "{}", no_body.body);
}

#[tokio::test]
async fn login_without_nonce_is_rejected() {
    let (app, _) = app();
    let wallet = TestWallet::new();

    let res = call(
        &app,
        Method::POST,
        "/auth/wallet/login",
        None,
        Some(json!({ "address": wallet.address, "signature": wallet.sign("NTUNEST-0123456789abcdef") })),
    )
    .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn signature_cannot_be_replayed() {
    let (app, _) = app();
    let wallet = TestWallet::new();

    let nonce = request_nonce(&app, &wallet.address).await;
    let payload = json!({ "address": wallet.address, "signature": wallet.sign(&nonce) });

    let first = call(&app, Method::POST, "/auth/wallet/login", None, Some(payload.clone())).await;
    assert_eq!(first.status, StatusCode::OK);

    let replay = call(&app, Method::POST, "/auth/wallet/login", None, Some(payload)).await;
    assert_eq!(replay.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn foreign_signature_is_rejected_and_burns_the_nonce() {
    let (app, state) = app();
    let victim = TestWallet::new();
    let attacker = TestWallet::new();

    let nonce = request_nonce(&app, &victim.address).await;
    let res = call(
        &app,
        Method::POST,
        "/auth/wallet/login",
        None,
        Some(json!({ "address": victim.address, "signature": attacker.sign(&nonce) })),
    )
    .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"], "invalid signature");

    // The victim's own signature over the burned nonce no longer works
    let res = call(
        &app,
        Method::POST,
        "/auth/wallet/login",
        None,
        Some(json!({ "address": victim.address, "signature": victim.sign(&nonce) })),
    )
    .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    // Nobody was registered along the way
    let users = state.db.search_users(&victim.address[2..10]).unwrap();
    assert!(users.is_empty());
}

#[tokio::test]
async fn garbage_signature_is_unauthorized() {
    let (app, _) = app();
    let wallet = TestWallet::new();
    request_nonce(&app, &wallet.address).await;

    let res = call(
        &app,
        Method::POST,
        "/auth/wallet/login",
        None,
        Some(json!({ "address": wallet.address, "signature": "0xnot-a-signature" })),
    )
    .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_nonce_is_rejected() {
    let (app, _) = app_with_nonce_ttl(Duration::ZERO);
    let wallet = TestWallet::new();

    let nonce = request_nonce(&app, &wallet.address).await;
    let res = call(
        &app,
        Method::POST,
        "/auth/wallet/login",
        None,
        Some(json!({ "address": wallet.address, "signature": wallet.sign(&nonce) })),
    )
    .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_sets_session_cookie() {
    let (app, _) = app();
    let wallet = TestWallet::new();

    let nonce = request_nonce(&app, &wallet.address).await;
    let res = call(
        &app,
        Method::POST,
        "/auth/wallet/login",
        None,
        Some(json!({ "address": wallet.address, "signature": wallet.sign(&nonce) })),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);

    let set_cookie = res.headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set_cookie.starts_with("nest_session="));
    assert!(set_cookie.contains("HttpOnly"));

    let cookie = set_cookie.split(';').next().unwrap();
    let me = call_with_headers(&app, Method::GET, "/me", None, None, &[("cookie", cookie)]).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["id"], res.body["user_id"]);
}

#[tokio::test]
async fn protected_routes_need_a_session() {
    let (app, _) = app();

    let res = call(&app, Method::GET, "/me", None, None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = call(&app, Method::GET, "/me", Some("not.a.jwt"), None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn taken_username_gets_longer_fallback() {
    let (app, _) = app();
    let wallet = TestWallet::new();
    let (squatter_id, _) = register(&app, &derive_username(&wallet.address)).await;

    let body = wallet_login(&app, &wallet).await;
    assert_ne!(body["user_id"], squatter_id.as_str());
    assert_eq!(body["username"], fallback_username(&wallet.address));
}

#[test]
fn concurrent_first_logins_create_one_user() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let auth = WalletAuthenticator::default();
    let wallet = TestWallet::new();

    let nonce = auth.issue_nonce(&wallet.address).unwrap();
    let verified = auth.verify(&wallet.address, &wallet.sign(&nonce)).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let db = db.clone();
            let verified = verified.clone();
            std::thread::spawn(move || resolve_or_create_user(&db, &verified).unwrap())
        })
        .collect();

    let ids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap().id).collect();
    assert!(ids.iter().all(|id| id == &ids[0]));

    let row = db.get_user_by_wallet(&wallet.address).unwrap().unwrap();
    assert_eq!(row.id, ids[0]);
}
