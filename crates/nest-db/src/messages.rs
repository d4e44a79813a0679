use rusqlite::Row;

use crate::Database;
use crate::error::StoreResult;
use crate::models::{ConversationRow, MessageRow, PageCursor};

const MESSAGE_COLUMNS: &str = "id, sender_id, receiver_id, content, is_read, created_at";

impl Database {
    pub fn insert_message(
        &self,
        id: &str,
        sender_id: &str,
        receiver_id: &str,
        content: &str,
    ) -> StoreResult<MessageRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, sender_id, receiver_id, content) VALUES (?1, ?2, ?3, ?4)",
                [id, sender_id, receiver_id, content],
            )?;
            let row = conn.query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
                [id],
                map_message,
            )?;
            Ok(row)
        })
    }

    /// Messages exchanged between `user_id` and `peer_id`, newest first.
    pub fn get_conversation(
        &self,
        user_id: &str,
        peer_id: &str,
        cursor: PageCursor<'_>,
        limit: u32,
    ) -> StoreResult<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE ((sender_id = ?1 AND receiver_id = ?2) OR (sender_id = ?2 AND receiver_id = ?1))
                   AND (?3 IS NULL OR created_at < ?3)
                   AND (?5 IS NULL OR (created_at, rowid) < (SELECT created_at, rowid FROM messages WHERE id = ?5))
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?4"
            ))?;
            let rows = stmt
                .query_map(
                    rusqlite::params![user_id, peer_id, cursor.before, limit, cursor.before_id],
                    map_message,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Marks everything `peer_id` sent to `user_id` as read. Returns how many
    /// messages changed.
    pub fn mark_conversation_read(&self, user_id: &str, peer_id: &str) -> StoreResult<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET is_read = 1
                 WHERE receiver_id = ?1 AND sender_id = ?2 AND is_read = 0",
                [user_id, peer_id],
            )?;
            Ok(changed)
        })
    }

    /// One row per peer: the latest message in each conversation plus the
    /// number of unread messages from that peer.
    pub fn list_conversations(&self, user_id: &str) -> StoreResult<Vec<ConversationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.peer_id, u.username, m.content, m.created_at,
                     (SELECT COUNT(*) FROM messages r
                      WHERE r.sender_id = c.peer_id AND r.receiver_id = ?1 AND r.is_read = 0)
                 FROM (
                     SELECT CASE WHEN sender_id = ?1 THEN receiver_id ELSE sender_id END AS peer_id,
                            MAX(rowid) AS last_rowid
                     FROM messages
                     WHERE sender_id = ?1 OR receiver_id = ?1
                     GROUP BY peer_id
                 ) c
                 JOIN messages m ON m.rowid = c.last_rowid
                 JOIN users u ON u.id = c.peer_id
                 ORDER BY m.created_at DESC, m.rowid DESC",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(ConversationRow {
                        peer_id: row.get(0)?,
                        peer_username: row.get(1)?,
                        last_message: row.get(2)?,
                        last_message_at: row.get(3)?,
                        unread_count: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_message(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        content: row.get(3)?,
        is_read: row.get(4)?,
        created_at: row.get(5)?,
    })
}
