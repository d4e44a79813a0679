use axum::{
    Extension, Json,
    extract::State,
};
use serde::Deserialize;

use nest_types::api::{Claims, SearchResponse};

use crate::convert;
use crate::error::ApiError;
use crate::extract::ApiQuery;
use crate::state::{AppState, with_db};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    All,
    Posts,
    Users,
}

impl SearchKind {
    /// Unknown values search everything.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("posts") => Self::Posts,
            Some("users") => Self::Users,
            _ => Self::All,
        }
    }

    fn posts(self) -> bool {
        matches!(self, Self::All | Self::Posts)
    }

    fn users(self) -> bool {
        matches!(self, Self::All | Self::Users)
    }
}

pub async fn search(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let kind = SearchKind::parse(query.kind.as_deref());
    let q = query.q.unwrap_or_default().trim().to_string();

    if q.is_empty() {
        return Ok(Json(SearchResponse {
            posts: kind.posts().then(Vec::new),
            users: kind.users().then(Vec::new),
        }));
    }

    let viewer_id = claims.sub.to_string();
    let (posts, users) = with_db(&state, move |db| {
        let posts = if kind.posts() { Some(db.search_posts(&viewer_id, &q)?) } else { None };
        let users = if kind.users() { Some(db.search_users(&q)?) } else { None };
        Ok((posts, users))
    })
    .await?;

    Ok(Json(SearchResponse {
        posts: posts.map(|rows| rows.into_iter().map(convert::post).collect()),
        users: users.map(|rows| rows.into_iter().map(convert::user).collect()),
    }))
}
