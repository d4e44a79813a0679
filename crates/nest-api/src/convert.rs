//! Row-to-model conversion. Stored ids and timestamps are TEXT; a corrupt
//! value is logged and replaced with a default rather than failing the whole
//! response.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use nest_db::models::{CommentRow, ConversationRow, DraftRow, MessageRow, PostRow, TopicRow, UserRow};
use nest_types::models::{Comment, Conversation, Draft, Post, PrivateMessage, Topic, User};

/// Format SQLite's `strftime('%Y-%m-%d %H:%M:%f')` produces.
const DB_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S%.f";

pub fn parse_uuid(raw: &str, field: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", field, raw, e);
        Uuid::default()
    })
}

pub fn parse_timestamp(raw: &str, field: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, DB_TIMESTAMP).map(|naive| naive.and_utc()))
        .unwrap_or_else(|e| {
            warn!("Corrupt {} '{}': {}", field, raw, e);
            DateTime::default()
        })
}

/// Renders a client-supplied cursor in the stored format so it compares
/// correctly against `created_at` columns.
pub fn to_db_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

pub fn parse_media_paths(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!("Corrupt media_paths '{}': {}", raw, e);
        Vec::new()
    })
}

pub fn user(row: UserRow) -> User {
    User {
        id: parse_uuid(&row.id, "user id"),
        created_at: parse_timestamp(&row.created_at, "user created_at"),
        username: row.username,
        wallet_address: row.wallet_address,
        display_name: row.display_name,
        avatar: row.avatar,
        bio: row.bio,
    }
}

pub fn topic(row: TopicRow) -> Topic {
    Topic {
        id: row.id,
        name: row.name,
        display_name: row.display_name,
    }
}

pub fn post(row: PostRow) -> Post {
    Post {
        id: parse_uuid(&row.id, "post id"),
        author_id: parse_uuid(&row.user_id, "post author_id"),
        media_paths: parse_media_paths(&row.media_paths),
        created_at: parse_timestamp(&row.created_at, "post created_at"),
        author_username: row.author_username,
        topic_name: row.topic_name,
        topic_display_name: row.topic_display_name,
        content: row.content,
        like_count: row.like_count,
        comment_count: row.comment_count,
        share_count: row.share_count,
        liked: row.liked,
    }
}

pub fn comment(row: CommentRow) -> Comment {
    Comment {
        id: parse_uuid(&row.id, "comment id"),
        post_id: parse_uuid(&row.post_id, "comment post_id"),
        author_id: parse_uuid(&row.user_id, "comment author_id"),
        created_at: parse_timestamp(&row.created_at, "comment created_at"),
        author_username: row.author_username,
        content: row.content,
    }
}

pub fn draft(row: DraftRow) -> Draft {
    Draft {
        id: parse_uuid(&row.id, "draft id"),
        media_paths: parse_media_paths(&row.media_paths),
        created_at: parse_timestamp(&row.created_at, "draft created_at"),
        updated_at: parse_timestamp(&row.updated_at, "draft updated_at"),
        content: row.content,
    }
}

pub fn message(row: MessageRow) -> PrivateMessage {
    PrivateMessage {
        id: parse_uuid(&row.id, "message id"),
        sender_id: parse_uuid(&row.sender_id, "message sender_id"),
        receiver_id: parse_uuid(&row.receiver_id, "message receiver_id"),
        created_at: parse_timestamp(&row.created_at, "message created_at"),
        content: row.content,
        is_read: row.is_read,
    }
}

pub fn conversation(row: ConversationRow) -> Conversation {
    Conversation {
        peer_id: parse_uuid(&row.peer_id, "conversation peer_id"),
        last_message_at: parse_timestamp(&row.last_message_at, "conversation last_message_at"),
        peer_username: row.peer_username,
        last_message: row.last_message,
        unread_count: row.unread_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_sqlite_timestamps_with_and_without_millis() {
        let with_ms = parse_timestamp("2026-03-01 08:15:30.250", "t");
        assert_eq!((with_ms.year(), with_ms.hour(), with_ms.second()), (2026, 8, 30));
        assert_eq!(with_ms.timestamp_subsec_millis(), 250);

        let legacy = parse_timestamp("2026-03-01 08:15:30", "t");
        assert_eq!(legacy.timestamp_subsec_millis(), 0);
    }

    #[test]
    fn corrupt_values_fall_back_to_defaults() {
        assert_eq!(parse_uuid("not-a-uuid", "id"), Uuid::default());
        assert_eq!(parse_timestamp("yesterday", "t"), DateTime::<Utc>::default());
        assert!(parse_media_paths("{oops").is_empty());
    }

    #[test]
    fn cursor_matches_stored_format() {
        let ts = parse_timestamp("2026-03-01 08:15:30.250", "t");
        assert_eq!(to_db_timestamp(ts), "2026-03-01 08:15:30.250");
    }
}
