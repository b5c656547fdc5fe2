use crate::error::ConfigError;
use config::builder::DefaultState;
use config::ConfigBuilder;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    AnalyticsSettings, DatabaseSettings, EntraSettings, SecuritySettings, ServerSettings,
    Settings, UiSettings,
};

/// Default file name looked up when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "painel.toml";

/// Shortest accepted `security.secret_key`; the cookie signing key is derived from it.
pub const MIN_SECRET_KEY_LEN: usize = 32;

/// Environment variables that override file values, as `(variable, config key)`.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("DB_HOST", "database.host"),
    ("DB_PORT", "database.port"),
    ("DB_USER", "database.user"),
    ("DB_PASSWORD", "database.password"),
    ("DB_NAME", "database.database"),
    ("DB_SCHEMA", "database.schema"),
    ("DB_POOL_SIZE", "database.pool_size"),
    ("DB_POOL_TIMEOUT", "database.pool_timeout"),
    ("SECRET_KEY", "security.secret_key"),
    ("SESSION_TIMEOUT", "security.session_timeout"),
    ("MAX_LOGIN_ATTEMPTS", "security.max_login_attempts"),
    ("MICROSOFT_ENTRA_ENABLED", "entra.enabled"),
    ("AZURE_CLIENT_ID", "entra.client_id"),
    ("AZURE_CLIENT_SECRET", "entra.client_secret"),
    ("REDIRECT_URI", "entra.redirect_uri"),
    ("METADATA_URL", "entra.metadata_url"),
    ("AUTHORIZED_DOMAINS", "entra.authorized_domains"),
    ("COOKIE_SECRET", "entra.cookie_secret"),
    ("BIND_ADDR", "server.bind_addr"),
];

/// Loads the application configuration.
///
/// Values are layered: built-in defaults, then the TOML file (optional), then
/// the environment variables listed in `ENV_OVERRIDES`.
pub fn load_config(path: Option<&Path>) -> Result<Settings, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Same as [`load_config`] but with an injectable environment lookup.
pub fn load_config_with_env<F>(path: Option<&Path>, env: F) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let file_name = path
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

    let mut builder = with_defaults(config::Config::builder())?
        // A missing file is fine; defaults and the environment still apply.
        .add_source(config::File::with_name(&file_name).required(path.is_some()));

    for (variable, key) in ENV_OVERRIDES {
        builder = builder.set_override_option(*key, env(variable))?;
    }

    let mut settings = builder.build()?.try_deserialize::<Settings>()?;
    settings.entra = settings.entra.validated();
    validate(&settings)?;

    Ok(settings)
}

fn with_defaults(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(builder
        .set_default("server.bind_addr", "0.0.0.0:3000")?
        .set_default("server.log_dir", "logs")?
        .set_default("database.host", "localhost")?
        .set_default("database.port", 3306)?
        .set_default("database.user", "user")?
        .set_default("database.password", "password")?
        .set_default("database.database", "funds_db")?
        .set_default("database.schema", "DW_STAGING")?
        .set_default("database.pool_size", 5)?
        .set_default("database.pool_timeout", 30)?
        .set_default("security.secret_key", "painel-development-secret-key-change-me")?
        .set_default("security.session_timeout", 480)?
        .set_default("security.max_login_attempts", 5)?
        .set_default("analytics.liquidity_ratio_min", "0.8")?
        .set_default("analytics.liquidity_ratio_max", "1.5")?
        .set_default("analytics.concentration_threshold", "30.0")?
        .set_default("analytics.default_period_days", 45)?
        .set_default("analytics.cache_ttl", 1800)?
        .set_default("ui.refresh_interval", 300)?
        .set_default("ui.max_records_display", 10000)?
        .set_default("entra.enabled", false)?
        .set_default("entra.client_id", "")?
        .set_default("entra.client_secret", "")?
        .set_default("entra.redirect_uri", "")?
        .set_default("entra.metadata_url", "")?
        .set_default("entra.authorized_domains", "")?
        .set_default("entra.cookie_secret", "")?)
}

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    let analytics = &settings.analytics;
    if analytics.liquidity_ratio_min > analytics.liquidity_ratio_max {
        return Err(ConfigError::ValidationError(format!(
            "liquidity_ratio_min ({}) must not exceed liquidity_ratio_max ({})",
            analytics.liquidity_ratio_min, analytics.liquidity_ratio_max
        )));
    }
    if settings.database.pool_size == 0 {
        return Err(ConfigError::ValidationError(
            "database.pool_size must be greater than 0".to_string(),
        ));
    }
    if settings.security.secret_key.len() < MIN_SECRET_KEY_LEN {
        return Err(ConfigError::ValidationError(format!(
            "security.secret_key must be at least {MIN_SECRET_KEY_LEN} bytes"
        )));
    }
    if settings.ui.max_records_display == 0 {
        return Err(ConfigError::ValidationError(
            "ui.max_records_display must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_apply_without_file() {
        let settings = load_config_with_env(None, no_env).expect("defaults should load");
        assert_eq!(settings.database.port, 3306);
        assert_eq!(settings.database.pool_size, 5);
        assert_eq!(settings.security.session_timeout, 480);
        assert_eq!(settings.analytics.liquidity_ratio_min, dec!(0.8));
        assert_eq!(settings.analytics.liquidity_ratio_max, dec!(1.5));
        assert_eq!(settings.analytics.default_period_days, 45);
        assert_eq!(settings.ui.max_records_display, 10000);
        assert!(!settings.entra.is_enabled());
    }

    #[test]
    fn environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[database]\nhost = \"db.internal\"\nport = 3307\n\n[analytics]\nconcentration_threshold = 25.0"
        )
        .unwrap();

        let env: HashMap<&str, &str> = HashMap::from([("DB_HOST", "override.internal"), ("DB_POOL_SIZE", "9")]);
        let settings = load_config_with_env(Some(file.path()), |k| env.get(k).map(|v| v.to_string()))
            .expect("config should load");

        assert_eq!(settings.database.host, "override.internal");
        assert_eq!(settings.database.port, 3307);
        assert_eq!(settings.database.pool_size, 9);
        assert_eq!(settings.analytics.concentration_threshold, dec!(25));
    }

    #[test]
    fn incomplete_entra_config_is_disabled() {
        let env: HashMap<&str, &str> =
            HashMap::from([("MICROSOFT_ENTRA_ENABLED", "true"), ("AZURE_CLIENT_ID", "abc")]);
        let settings =
            load_config_with_env(None, |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert!(!settings.entra.is_enabled());
    }

    #[test]
    fn complete_entra_config_stays_enabled() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("MICROSOFT_ENTRA_ENABLED", "true"),
            ("AZURE_CLIENT_ID", "client"),
            ("AZURE_CLIENT_SECRET", "secret"),
            ("REDIRECT_URI", "https://painel.example/auth"),
            ("METADATA_URL", "https://login.example/.well-known/openid-configuration"),
            ("COOKIE_SECRET", "cookie"),
            ("AUTHORIZED_DOMAINS", "Example.com, corp.example.com"),
        ]);
        let settings =
            load_config_with_env(None, |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert!(settings.entra.is_enabled());
        assert_eq!(
            settings.entra.authorized_domains(),
            vec!["example.com".to_string(), "corp.example.com".to_string()]
        );
    }

    #[test]
    fn short_secret_key_is_rejected() {
        let result = load_config_with_env(None, |k| {
            (k == "SECRET_KEY").then(|| "too-short".to_string())
        });
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));

        let settings = load_config_with_env(None, no_env).unwrap();
        assert!(settings.security.secret_key.len() >= MIN_SECRET_KEY_LEN);
    }

    #[test]
    fn inverted_liquidity_band_is_rejected() {
        let env: HashMap<&str, &str> = HashMap::new();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[analytics]\nliquidity_ratio_min = 2.0\nliquidity_ratio_max = 1.0").unwrap();
        let result = load_config_with_env(Some(file.path()), |k| env.get(k).map(|v| v.to_string()));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
