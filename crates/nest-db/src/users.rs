use rusqlite::{Connection, Row};

use crate::error::StoreResult;
use crate::models::{TopicRow, UserRow};
use crate::{Database, OptionalExt};

const USER_COLUMNS: &str =
    "id, username, password, wallet_address, display_name, avatar, bio, created_at";

impl Database {
    // -- Users --

    /// Inserts a password account. A taken username surfaces as `StoreError::Conflict`.
    pub fn create_user(&self, id: &str, username: &str, password_hash: &str) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password) VALUES (?1, ?2, ?3)",
                (id, username, password_hash),
            )?;
            Ok(())
        })
    }

    /// Inserts a wallet-only account (no password). Either a taken username or
    /// an already registered address surfaces as `StoreError::Conflict`.
    pub fn create_wallet_user(&self, id: &str, username: &str, wallet_address: &str) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, wallet_address) VALUES (?1, ?2, ?3)",
                (id, username, wallet_address),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn get_user_by_wallet(&self, wallet_address: &str) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "wallet_address", wallet_address))
    }

    /// Updates only the provided profile fields. Returns the updated row, or
    /// `None` when the user does not exist.
    pub fn update_profile(
        &self,
        id: &str,
        display_name: Option<&str>,
        bio: Option<&str>,
        avatar: Option<&str>,
    ) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET
                    display_name = COALESCE(?2, display_name),
                    bio = COALESCE(?3, bio),
                    avatar = COALESCE(?4, avatar)
                 WHERE id = ?1",
                rusqlite::params![id, display_name, bio, avatar],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_user(conn, "id", id)
        })
    }

    // -- Topics --

    pub fn list_topics(&self) -> StoreResult<Vec<TopicRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name, display_name FROM topics ORDER BY id")?;
            let rows = stmt
                .query_map([], map_topic)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_topic_by_name(&self, name: &str) -> StoreResult<Option<TopicRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, display_name FROM topics WHERE name = ?1",
                [name],
                map_topic,
            )
            .optional()
        })
    }
}

pub(crate) fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        wallet_address: row.get(3)?,
        display_name: row.get(4)?,
        avatar: row.get(5)?,
        bio: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn map_topic(row: &Row<'_>) -> rusqlite::Result<TopicRow> {
    Ok(TopicRow {
        id: row.get(0)?,
        name: row.get(1)?,
        display_name: row.get(2)?,
    })
}

/// `column` is always one of the fixed identifiers above, never user input.
fn query_user(conn: &Connection, column: &str, value: &str) -> StoreResult<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"))?;
    stmt.query_row([value], map_user).optional()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;

    #[test]
    fn duplicate_username_is_conflict() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "alice", "hash").unwrap();

        let err = db.create_user("u2", "alice", "hash").unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn wallet_user_has_no_password() {
        let db = Database::open_in_memory().unwrap();
        db.create_wallet_user("u1", "12345678", "0x1234567890").unwrap();

        let user = db.get_user_by_wallet("0x1234567890").unwrap().unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.username, "12345678");
        assert!(user.password.is_none());
    }

    #[test]
    fn duplicate_wallet_is_conflict() {
        let db = Database::open_in_memory().unwrap();
        db.create_wallet_user("u1", "first", "0xabc").unwrap();

        let err = db.create_wallet_user("u2", "second", "0xabc").unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn update_profile_keeps_unset_fields() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "alice", "hash").unwrap();

        db.update_profile("u1", Some("Alice"), Some("hello"), None).unwrap();
        let user = db.update_profile("u1", None, None, Some("/uploads/a.png")).unwrap().unwrap();

        assert_eq!(user.display_name.as_deref(), Some("Alice"));
        assert_eq!(user.bio.as_deref(), Some("hello"));
        assert_eq!(user.avatar.as_deref(), Some("/uploads/a.png"));

        assert!(db.update_profile("missing", Some("x"), None, None).unwrap().is_none());
    }

    #[test]
    fn seeded_topics_are_listed() {
        let db = Database::open_in_memory().unwrap();
        let topics = db.list_topics().unwrap();
        assert_eq!(topics.len(), 8);

        let study = db.get_topic_by_name("study").unwrap().unwrap();
        assert_eq!(study.display_name, "Learning Exchange");
        assert!(db.get_topic_by_name("nope").unwrap().is_none());
    }
}
