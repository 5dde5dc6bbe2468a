use std::fmt;
use thiserror::Error;

/// Which database constraint rejected a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityKind {
    Unique,
    NotNull,
    ForeignKey,
    Check,
    Other,
}

impl IntegrityKind {
    /// Classifies a Postgres SQLSTATE. Only class 23 ("integrity constraint
    /// violation") codes map to a kind.
    pub fn from_sqlstate(code: &str) -> Option<Self> {
        match code {
            "23505" => Some(IntegrityKind::Unique),
            "23502" => Some(IntegrityKind::NotNull),
            "23503" => Some(IntegrityKind::ForeignKey),
            "23514" => Some(IntegrityKind::Check),
            c if c.starts_with("23") => Some(IntegrityKind::Other),
            _ => None,
        }
    }
}

impl fmt::Display for IntegrityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntegrityKind::Unique => "unique",
            IntegrityKind::NotNull => "not-null",
            IntegrityKind::ForeignKey => "foreign key",
            IntegrityKind::Check => "check",
            IntegrityKind::Other => "integrity",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid database connection configuration: {0}")]
    ConnectionConfigError(String),

    #[error("Database operation failed: {0}")]
    Sqlx(sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("{kind} constraint violated{}: {message}", constraint_suffix(.constraint))]
    Integrity {
        kind: IntegrityKind,
        constraint: Option<String>,
        message: String,
    },

    #[error("The requested data was not found in the database.")]
    NotFound,
}

fn constraint_suffix(constraint: &Option<String>) -> String {
    constraint.as_deref().map(|c| format!(" ({c})")).unwrap_or_default()
}

impl DbError {
    pub fn is_integrity(&self) -> bool {
        matches!(self, DbError::Integrity { .. })
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = err {
            return DbError::NotFound;
        }
        if let sqlx::Error::Database(db_err) = &err {
            if let Some(kind) = db_err.code().as_deref().and_then(IntegrityKind::from_sqlstate) {
                return DbError::Integrity {
                    kind,
                    constraint: db_err.constraint().map(str::to_string),
                    message: db_err.message().to_string(),
                };
            }
        }
        DbError::Sqlx(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_integrity_sqlstates() {
        assert_eq!(IntegrityKind::from_sqlstate("23505"), Some(IntegrityKind::Unique));
        assert_eq!(IntegrityKind::from_sqlstate("23502"), Some(IntegrityKind::NotNull));
        assert_eq!(IntegrityKind::from_sqlstate("23503"), Some(IntegrityKind::ForeignKey));
        assert_eq!(IntegrityKind::from_sqlstate("23514"), Some(IntegrityKind::Check));
        assert_eq!(IntegrityKind::from_sqlstate("23P01"), Some(IntegrityKind::Other));
        assert_eq!(IntegrityKind::from_sqlstate("42P01"), None);
        assert_eq!(IntegrityKind::from_sqlstate("22001"), None);
    }

    #[test]
    fn row_not_found_becomes_not_found() {
        assert!(matches!(DbError::from(sqlx::Error::RowNotFound), DbError::NotFound));
    }

    #[test]
    fn other_sqlx_errors_are_kept() {
        let err = DbError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, DbError::Sqlx(sqlx::Error::PoolTimedOut)));
        assert!(!err.is_integrity());
    }

    #[test]
    fn integrity_message_names_constraint() {
        let err = DbError::Integrity {
            kind: IntegrityKind::Unique,
            constraint: Some("users_username_key".into()),
            message: "duplicate key value".into(),
        };
        assert_eq!(
            err.to_string(),
            "unique constraint violated (users_username_key): duplicate key value"
        );
    }
}
