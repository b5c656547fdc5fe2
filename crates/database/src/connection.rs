use crate::error::DbError;
use crate::repository::DbRepository;
use configuration::DatabaseSettings;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use std::time::Duration;

/// How often and how patiently the initial pool creation is retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    /// Delay after the first failure; doubled after each further failure.
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_delay: Duration::from_secs(2),
        }
    }
}

/// Establishes a connection pool to the MySQL server.
///
/// Creating the pool opens one connection, so a successful return means the
/// server answered. Failures are retried per [`RetryPolicy::default`].
pub async fn connect(settings: &DatabaseSettings) -> Result<MySqlPool, DbError> {
    connect_with_policy(settings, RetryPolicy::default()).await
}

pub async fn connect_with_policy(
    settings: &DatabaseSettings,
    policy: RetryPolicy,
) -> Result<MySqlPool, DbError> {
    let options = MySqlConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.user)
        .password(&settings.password)
        .database(&settings.database)
        .charset("utf8mb4");

    let attempts = policy.attempts.max(1);
    let mut delay = policy.initial_delay;
    let mut attempt = 1;

    loop {
        tracing::info!(attempt, host = %settings.host, "Connecting to the database...");

        let result = MySqlPoolOptions::new()
            .max_connections(settings.pool_size)
            .acquire_timeout(settings.pool_timeout())
            .connect_with(options.clone())
            .await;

        match result {
            Ok(pool) => {
                tracing::info!("Database connection established.");
                return Ok(pool);
            }
            Err(e) if attempt < attempts => {
                tracing::error!(attempt, error = %e, "Database connection attempt failed.");
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(attempt, error = %e, "Database connection attempt failed.");
                return Err(DbError::ConnectionFailed { attempts, source: e });
            }
        }
    }
}

/// Connects, or falls back to an offline repository when the server is unreachable.
pub async fn connect_or_offline(settings: &DatabaseSettings) -> Result<DbRepository, DbError> {
    connect_or_offline_with_policy(settings, RetryPolicy::default()).await
}

pub async fn connect_or_offline_with_policy(
    settings: &DatabaseSettings,
    policy: RetryPolicy,
) -> Result<DbRepository, DbError> {
    match connect_with_policy(settings, policy).await {
        Ok(pool) => DbRepository::new(pool, &settings.schema),
        Err(e) => {
            tracing::error!(error = %e, "Database unavailable - running in offline mode.");
            DbRepository::offline(&settings.schema)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_settings() -> DatabaseSettings {
        DatabaseSettings {
            host: "127.0.0.1".to_string(),
            // Port 1 is reserved and refuses connections.
            port: 1,
            user: "user".to_string(),
            password: "password".to_string(),
            database: "funds_db".to_string(),
            schema: "DW_STAGING".to_string(),
            pool_size: 1,
            pool_timeout: 1,
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            initial_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn gives_up_after_all_attempts() {
        let err = connect_with_policy(&unreachable_settings(), fast_policy())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ConnectionFailed { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn falls_back_to_offline_repository() {
        let repo = connect_or_offline_with_policy(&unreachable_settings(), fast_policy())
            .await
            .unwrap();
        assert!(!repo.is_connected());
    }
}
