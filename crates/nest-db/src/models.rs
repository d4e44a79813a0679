//! Database row types. These map directly to SQLite rows and stay distinct
//! from the nest-types API models to keep the DB layer independent.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: Option<String>,
    pub wallet_address: Option<String>,
    pub display_name: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct TopicRow {
    pub id: i64,
    pub name: String,
    pub display_name: String,
}

/// A post joined with its author, topic and interaction counters.
#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: String,
    pub user_id: String,
    pub author_username: String,
    pub topic_name: String,
    pub topic_display_name: String,
    pub content: String,
    /// JSON array of media paths.
    pub media_paths: String,
    pub created_at: String,
    pub like_count: i64,
    pub comment_count: i64,
    pub share_count: i64,
    pub liked: bool,
}

#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub author_username: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct DraftRow {
    pub id: String,
    pub user_id: String,
    pub content: Option<String>,
    pub media_paths: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub is_read: bool,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ConversationRow {
    pub peer_id: String,
    pub peer_username: String,
    pub last_message: String,
    pub last_message_at: String,
    pub unread_count: i64,
}

/// Exclusive lower bound for a newest-first page. Rows are ordered by
/// `(created_at, rowid)`, so `before_id` pages cleanly through rows that
/// share a timestamp; `before` alone cannot.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageCursor<'a> {
    /// Stored-format timestamp; only strictly older rows are returned.
    pub before: Option<&'a str>,
    /// Id of the last row already seen; only rows after it are returned.
    pub before_id: Option<&'a str>,
}
