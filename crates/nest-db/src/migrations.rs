use rusqlite::Connection;
use tracing::{info, warn};

use crate::error::{StoreError, StoreResult};

fn users_table(name: &str) -> String {
    format!(
        "
    CREATE TABLE IF NOT EXISTS {name} (
        id              TEXT PRIMARY KEY,
        username        TEXT NOT NULL UNIQUE,
        password        TEXT,
        wallet_address  TEXT UNIQUE,
        display_name    TEXT,
        avatar          TEXT,
        bio             TEXT,
        created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
    );
    "
    )
}

/// Optional profile columns older builds did not have.
const OPTIONAL_USER_COLUMNS: &[&str] = &["wallet_address", "display_name", "avatar", "bio"];

pub fn run(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(&users_table("users"))?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS topics (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL UNIQUE,
                display_name    TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS posts (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                topic_id        INTEGER NOT NULL REFERENCES topics(id) ON DELETE CASCADE,
                content         TEXT NOT NULL,
                media_paths     TEXT NOT NULL DEFAULT '[]',
                created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_posts_created
                ON posts(created_at);
            CREATE INDEX IF NOT EXISTS idx_posts_topic
                ON posts(topic_id, created_at);

            CREATE TABLE IF NOT EXISTS likes (
                user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                post_id         TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
                PRIMARY KEY (user_id, post_id)
            );

            CREATE INDEX IF NOT EXISTS idx_likes_post
                ON likes(post_id);

            CREATE TABLE IF NOT EXISTS comments (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                post_id         TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                content         TEXT NOT NULL,
                created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_comments_post
                ON comments(post_id, created_at);

            CREATE TABLE IF NOT EXISTS shares (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                post_id         TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_shares_post
                ON shares(post_id);

            CREATE TABLE IF NOT EXISTS drafts (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content         TEXT,
                media_paths     TEXT NOT NULL DEFAULT '[]',
                created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
                updated_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_drafts_user
                ON drafts(user_id, updated_at);

            CREATE TABLE IF NOT EXISTS messages (
                id              TEXT PRIMARY KEY,
                sender_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                receiver_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content         TEXT NOT NULL,
                is_read         INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_messages_receiver
                ON messages(receiver_id, created_at);
            CREATE INDEX IF NOT EXISTS idx_messages_sender
                ON messages(sender_id, created_at);

            -- Seed the campus topics
            INSERT OR IGNORE INTO topics (name, display_name) VALUES
                ('trade', 'Second-hand Trading'),
                ('food', 'Food Sharing'),
                ('study', 'Learning Exchange'),
                ('events', 'Campus Events'),
                ('lost', 'Lost Property'),
                ('living', 'Accommodation & Living'),
                ('hobbies', 'Hobbies & Interests'),
                ('chat', 'Casual Chat');

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    repair_legacy_users(conn)?;

    info!("Database migrations complete");
    Ok(())
}

struct ColumnInfo {
    name: String,
    not_null: bool,
}

fn user_columns(conn: &Connection) -> StoreResult<Vec<ColumnInfo>> {
    let mut stmt = conn.prepare("PRAGMA table_info(users)")?;
    let columns = stmt
        .query_map([], |row| {
            Ok(ColumnInfo {
                name: row.get(1)?,
                not_null: row.get::<_, i64>(3)? != 0,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// Brings a `users` table created by an older build up to the current shape:
/// adds missing profile/wallet columns and makes `password` nullable so
/// wallet-only accounts can be inserted.
fn repair_legacy_users(conn: &Connection) -> StoreResult<()> {
    let columns = user_columns(conn)?;
    if columns.is_empty() {
        return Err(StoreError::Schema("users table is missing".into()));
    }

    for &name in OPTIONAL_USER_COLUMNS {
        if columns.iter().any(|c| c.name == name) {
            continue;
        }
        warn!("users.{} is missing, adding it", name);
        conn.execute_batch(&format!("ALTER TABLE users ADD COLUMN {name} TEXT;"))
            .map_err(|e| StoreError::Schema(format!("adding users.{name}: {e}")))?;
        if name == "wallet_address" {
            conn.execute_batch(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_wallet_address ON users(wallet_address);",
            )
            .map_err(|e| StoreError::Schema(format!("indexing users.wallet_address: {e}")))?;
        }
    }

    let password_required = columns.iter().any(|c| c.name == "password" && c.not_null);
    if password_required {
        warn!("users.password is NOT NULL, rebuilding users table");
        rebuild_users_table(conn)
            .map_err(|e| StoreError::Schema(format!("relaxing users.password: {e}")))?;
    }

    Ok(())
}

/// SQLite cannot drop a NOT NULL constraint in place, so the rows are copied
/// into a fresh table which then takes the old name. Renaming the new table
/// (not the old one) keeps the foreign keys of other tables pointing at `users`.
fn rebuild_users_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = OFF;")?;

    let rebuilt = conn.execute_batch(&format!(
        "
        BEGIN;
        {}
        INSERT INTO users_rebuild (id, username, password, wallet_address, display_name, avatar, bio, created_at)
            SELECT id, username, password, wallet_address, display_name, avatar, bio, created_at
            FROM users;
        DROP TABLE users;
        ALTER TABLE users_rebuild RENAME TO users;
        COMMIT;
        ",
        users_table("users_rebuild")
    ));

    if rebuilt.is_err() {
        conn.execute_batch("ROLLBACK;").ok();
    }
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    rebuilt
}
