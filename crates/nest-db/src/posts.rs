use rusqlite::Row;

use crate::error::StoreResult;
use crate::models::{CommentRow, PageCursor, PostRow};
use crate::{Database, OptionalExt};

/// Post columns joined with author, topic and counters. `?1` is the viewer id
/// used for the `liked` flag.
pub(crate) const POST_SELECT: &str = "
    SELECT p.id, p.user_id, u.username, t.name, t.display_name, p.content, p.media_paths, p.created_at,
        (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id),
        (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id),
        (SELECT COUNT(*) FROM shares s WHERE s.post_id = p.id),
        EXISTS(SELECT 1 FROM likes l WHERE l.post_id = p.id AND l.user_id = ?1)
    FROM posts p
    JOIN users u ON p.user_id = u.id
    JOIN topics t ON p.topic_id = t.id";

impl Database {
    // -- Posts --

    pub fn insert_post(
        &self,
        id: &str,
        user_id: &str,
        topic_id: i64,
        content: &str,
        media_paths: &[String],
    ) -> StoreResult<()> {
        let media = serde_json::to_string(media_paths)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, user_id, topic_id, content, media_paths) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, user_id, topic_id, content, media],
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, viewer_id: &str, post_id: &str) -> StoreResult<Option<PostRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("{POST_SELECT} WHERE p.id = ?2"),
                [viewer_id, post_id],
                map_post,
            )
            .optional()
        })
    }

    pub fn post_exists(&self, post_id: &str) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1)",
                [post_id],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// Newest-first feed, optionally restricted to one topic. An unknown
    /// `cursor.before_id` yields an empty page.
    pub fn get_feed(
        &self,
        viewer_id: &str,
        topic_id: Option<i64>,
        cursor: PageCursor<'_>,
        limit: u32,
    ) -> StoreResult<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{POST_SELECT}
                 WHERE (?2 IS NULL OR p.topic_id = ?2)
                   AND (?3 IS NULL OR p.created_at < ?3)
                   AND (?5 IS NULL OR (p.created_at, p.rowid) < (SELECT created_at, rowid FROM posts WHERE id = ?5))
                 ORDER BY p.created_at DESC, p.rowid DESC
                 LIMIT ?4"
            ))?;
            let rows = stmt
                .query_map(
                    rusqlite::params![viewer_id, topic_id, cursor.before, limit, cursor.before_id],
                    map_post,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Likes --

    /// Toggle a like: removes if present, inserts if not.
    /// Returns (liked, like_count) after the toggle.
    pub fn toggle_like(&self, user_id: &str, post_id: &str) -> StoreResult<(bool, i64)> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let removed = tx.execute(
                "DELETE FROM likes WHERE user_id = ?1 AND post_id = ?2",
                [user_id, post_id],
            )?;
            if removed == 0 {
                tx.execute(
                    "INSERT INTO likes (user_id, post_id) VALUES (?1, ?2)",
                    [user_id, post_id],
                )?;
            }

            let count: i64 = tx.query_row(
                "SELECT COUNT(*) FROM likes WHERE post_id = ?1",
                [post_id],
                |row| row.get(0),
            )?;
            tx.commit()?;

            Ok((removed == 0, count))
        })
    }

    // -- Comments --

    pub fn insert_comment(&self, id: &str, post_id: &str, user_id: &str, content: &str) -> StoreResult<CommentRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, post_id, user_id, content) VALUES (?1, ?2, ?3, ?4)",
                [id, post_id, user_id, content],
            )?;
            let row = conn.query_row(
                "SELECT c.id, c.post_id, c.user_id, u.username, c.content, c.created_at
                 FROM comments c JOIN users u ON c.user_id = u.id
                 WHERE c.id = ?1",
                [id],
                map_comment,
            )?;
            Ok(row)
        })
    }

    /// Comments on a post, oldest first.
    pub fn get_comments(&self, post_id: &str) -> StoreResult<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.post_id, c.user_id, u.username, c.content, c.created_at
                 FROM comments c
                 JOIN users u ON c.user_id = u.id
                 WHERE c.post_id = ?1
                 ORDER BY c.created_at ASC, c.rowid ASC",
            )?;
            let rows = stmt
                .query_map([post_id], map_comment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Shares --

    /// Records a share and returns the post's new share count.
    pub fn insert_share(&self, id: &str, user_id: &str, post_id: &str) -> StoreResult<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO shares (id, user_id, post_id) VALUES (?1, ?2, ?3)",
                [id, user_id, post_id],
            )?;
            let count = conn.query_row(
                "SELECT COUNT(*) FROM shares WHERE post_id = ?1",
                [post_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}

pub(crate) fn map_post(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        author_username: row.get(2)?,
        topic_name: row.get(3)?,
        topic_display_name: row.get(4)?,
        content: row.get(5)?,
        media_paths: row.get(6)?,
        created_at: row.get(7)?,
        like_count: row.get(8)?,
        comment_count: row.get(9)?,
        share_count: row.get(10)?,
        liked: row.get(11)?,
    })
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        user_id: row.get(2)?,
        author_username: row.get(3)?,
        content: row.get(4)?,
        created_at: row.get(5)?,
    })
}
