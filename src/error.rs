//! Unified error type for the social graph.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SocialGraphError {
    #[error("SQLite error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("config error: {0}")]
    Config(String),
}

impl SocialGraphError {
    /// Shorthand for a missing user.
    pub fn user_not_found(id: impl Into<i64>) -> Self {
        Self::NotFound {
            entity: "user",
            id: id.into(),
        }
    }

    /// Whether this error came from a uniqueness / check constraint.
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Self::ConstraintViolation(_) => true,
            Self::Database(e) => is_sqlite_constraint(e),
            _ => false,
        }
    }
}

/// Map SQLite constraint failures onto [`SocialGraphError::ConstraintViolation`],
/// passing every other error through unchanged.
pub fn classify(err: rusqlite::Error) -> SocialGraphError {
    if is_sqlite_constraint(&err) {
        SocialGraphError::ConstraintViolation(err.to_string())
    } else {
        SocialGraphError::Database(err)
    }
}

fn is_sqlite_constraint(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

pub type Result<T> = std::result::Result<T, SocialGraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_entity_and_id() {
        let err = SocialGraphError::user_not_found(42);
        assert_eq!(err.to_string(), "user 42 not found");
    }

    #[test]
    fn classify_leaves_non_constraint_errors_alone() {
        let err = classify(rusqlite::Error::QueryReturnedNoRows);
        assert!(matches!(err, SocialGraphError::Database(_)));
        assert!(!err.is_constraint_violation());
    }

    #[test]
    fn classify_detects_unique_violation() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (x INTEGER UNIQUE); INSERT INTO t VALUES (1);")
            .unwrap();
        let raw = conn.execute("INSERT INTO t VALUES (1)", []).unwrap_err();
        let err = classify(raw);
        assert!(matches!(err, SocialGraphError::ConstraintViolation(_)));
        assert!(err.is_constraint_violation());
    }
}
