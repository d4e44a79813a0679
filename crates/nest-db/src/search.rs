use crate::Database;
use crate::error::StoreResult;
use crate::models::{PostRow, UserRow};
use crate::posts::{POST_SELECT, map_post};
use crate::users::map_user;

const SEARCH_LIMIT: u32 = 30;

/// Escapes LIKE wildcards so `%` and `_` in a query match literally.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

impl Database {
    /// Posts whose content or author username contains `query`, newest first.
    pub fn search_posts(&self, viewer_id: &str, query: &str) -> StoreResult<Vec<PostRow>> {
        let pattern = like_pattern(query);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{POST_SELECT}
                 WHERE p.content LIKE ?2 ESCAPE '\\' OR u.username LIKE ?2 ESCAPE '\\'
                 ORDER BY p.created_at DESC, p.rowid DESC
                 LIMIT ?3"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![viewer_id, pattern, SEARCH_LIMIT], map_post)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Users whose username, display name or bio contains `query`, newest first.
    pub fn search_users(&self, query: &str) -> StoreResult<Vec<UserRow>> {
        let pattern = like_pattern(query);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, password, wallet_address, display_name, avatar, bio, created_at
                 FROM users
                 WHERE username LIKE ?1 ESCAPE '\\'
                    OR display_name LIKE ?1 ESCAPE '\\'
                    OR bio LIKE ?1 ESCAPE '\\'
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![pattern, SEARCH_LIMIT], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
