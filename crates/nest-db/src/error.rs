use rusqlite::ErrorCode;
use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Store failures, classified so callers never inspect SQLite messages.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A UNIQUE or PRIMARY KEY constraint rejected the write.
    #[error("uniqueness conflict: {0}")]
    Conflict(String),

    /// The live schema does not match what the queries expect.
    #[error("schema mismatch: {0}")]
    Schema(String),

    #[error("row not found")]
    NotFound,

    #[error("database lock poisoned")]
    LockPoisoned,

    #[error("column encoding failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlite(rusqlite::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        // Prepare-time failures come back as SqlInputError with the bundled build
        let (failure, message) = match &err {
            rusqlite::Error::SqliteFailure(failure, message) => (*failure, message.clone().unwrap_or_default()),
            rusqlite::Error::SqlInputError { error, msg, .. } => (*error, msg.clone()),
            _ => return Self::Sqlite(err),
        };

        if failure.code == ErrorCode::ConstraintViolation
            && matches!(
                failure.extended_code,
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            )
        {
            return Self::Conflict(message);
        }

        if failure.code == ErrorCode::Unknown
            && (message.starts_with("no such column") || message.starts_with("no such table"))
        {
            return Self::Schema(message);
        }

        Self::Sqlite(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE);")
            .unwrap();
        conn
    }

    #[test]
    fn unique_violation_is_conflict() {
        let conn = conn();
        conn.execute("INSERT INTO t (id, name) VALUES (1, 'a')", []).unwrap();

        let err: StoreError = conn
            .execute("INSERT INTO t (id, name) VALUES (2, 'a')", [])
            .unwrap_err()
            .into();
        assert!(err.is_conflict());

        let err: StoreError = conn
            .execute("INSERT INTO t (id, name) VALUES (1, 'b')", [])
            .unwrap_err()
            .into();
        assert!(err.is_conflict());
    }

    #[test]
    fn not_null_violation_is_not_conflict() {
        let conn = conn();
        let err: StoreError = conn
            .execute("INSERT INTO t (id, name) VALUES (1, NULL)", [])
            .unwrap_err()
            .into();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }

    #[test]
    fn missing_column_is_schema() {
        let conn = conn();
        let err: StoreError = conn
            .prepare("SELECT wallet_address FROM t")
            .map(|_| ())
            .unwrap_err()
            .into();
        assert!(matches!(err, StoreError::Schema(ref m) if m.contains("wallet_address")));
    }
}
