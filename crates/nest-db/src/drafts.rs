use rusqlite::Row;

use crate::error::{StoreError, StoreResult};
use crate::models::DraftRow;
use crate::{Database, OptionalExt};

const DRAFT_COLUMNS: &str = "id, user_id, content, media_paths, created_at, updated_at";

impl Database {
    pub fn insert_draft(
        &self,
        id: &str,
        user_id: &str,
        content: Option<&str>,
        media_paths: &[String],
    ) -> StoreResult<DraftRow> {
        let media = serde_json::to_string(media_paths)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO drafts (id, user_id, content, media_paths) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, user_id, content, media],
            )?;
            conn.query_row(
                &format!("SELECT {DRAFT_COLUMNS} FROM drafts WHERE id = ?1"),
                [id],
                map_draft,
            )
            .map_err(StoreError::from)
        })
    }

    /// Drafts owned by `user_id`, most recently edited first.
    pub fn list_drafts(&self, user_id: &str) -> StoreResult<Vec<DraftRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DRAFT_COLUMNS} FROM drafts
                 WHERE user_id = ?1
                 ORDER BY updated_at DESC, rowid DESC"
            ))?;
            let rows = stmt
                .query_map([user_id], map_draft)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Replaces a draft's content. Returns `None` when no draft with this id
    /// belongs to `user_id`.
    pub fn update_draft(
        &self,
        id: &str,
        user_id: &str,
        content: Option<&str>,
        media_paths: &[String],
    ) -> StoreResult<Option<DraftRow>> {
        let media = serde_json::to_string(media_paths)?;
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE drafts
                 SET content = ?3, media_paths = ?4,
                     updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
                 WHERE id = ?1 AND user_id = ?2",
                rusqlite::params![id, user_id, content, media],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            conn.query_row(
                &format!("SELECT {DRAFT_COLUMNS} FROM drafts WHERE id = ?1"),
                [id],
                map_draft,
            )
            .optional()
        })
    }

    /// Returns false when no draft with this id belongs to `user_id`.
    pub fn delete_draft(&self, id: &str, user_id: &str) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM drafts WHERE id = ?1 AND user_id = ?2",
                [id, user_id],
            )?;
            Ok(removed > 0)
        })
    }
}

fn map_draft(row: &Row<'_>) -> rusqlite::Result<DraftRow> {
    Ok(DraftRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        content: row.get(2)?,
        media_paths: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}
