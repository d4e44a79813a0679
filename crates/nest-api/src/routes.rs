use axum::{
    Json, Router, middleware,
    routing::{get, post, put},
};
use serde_json::{Value, json};

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{auth, drafts, interactions, messages, posts, profiles, search, wallet};

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// All HTTP routes. Everything except health and the auth endpoints needs a
/// session.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/wallet/nonce", get(wallet::nonce))
        .route("/auth/wallet/login", post(wallet::login));

    let protected_routes = Router::new()
        .route("/me", get(profiles::me).patch(profiles::update_me))
        .route("/users/{user_id}", get(profiles::get_user))
        .route("/topics", get(posts::list_topics))
        .route("/topics/{name}/posts", get(posts::topic_posts))
        .route("/posts", get(posts::feed).post(posts::create_post))
        .route("/posts/{post_id}", get(posts::get_post))
        .route("/posts/{post_id}/like", post(interactions::toggle_like))
        .route(
            "/posts/{post_id}/comments",
            get(interactions::list_comments).post(interactions::create_comment),
        )
        .route("/posts/{post_id}/share", post(interactions::share_post))
        .route("/drafts", get(drafts::list_drafts).post(drafts::create_draft))
        .route(
            "/drafts/{draft_id}",
            put(drafts::update_draft).delete(drafts::delete_draft),
        )
        .route("/messages", get(messages::inbox).post(messages::send_message))
        .route("/messages/{peer_id}", get(messages::conversation))
        .route("/search", get(search::search))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
