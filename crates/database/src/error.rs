use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to connect to the database after {attempts} attempts: {source}")]
    ConnectionFailed {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    #[error("Database query failed: {0}")]
    QueryError(#[from] sqlx::Error),

    #[error("The database is not available (offline mode).")]
    Offline,

    #[error("Invalid SQL identifier in configuration: '{0}'")]
    InvalidIdentifier(String),
}
