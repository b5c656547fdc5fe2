use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub security: SecuritySettings,
    pub analytics: AnalyticsSettings,
    pub ui: UiSettings,
    pub entra: EntraSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Address the dashboard listens on, e.g. "0.0.0.0:3000".
    pub bind_addr: String,
    /// Directory for the rolling log files.
    pub log_dir: String,
}

/// Connection parameters for the MySQL server that hosts the ledger view.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Schema holding the `vw_extrato` view.
    pub schema: String,
    pub pool_size: u32,
    /// Seconds to wait for a pooled connection (and for the initial connect).
    pub pool_timeout: u64,
}

impl DatabaseSettings {
    pub fn pool_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_timeout)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecuritySettings {
    /// Signs the session cookie. At least 32 bytes.
    pub secret_key: String,
    /// Session lifetime in minutes.
    pub session_timeout: u64,
    /// Failed logins allowed before a username is locked out.
    pub max_login_attempts: u32,
}

impl SecuritySettings {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout * 60)
    }
}

/// Thresholds used by the analytics engine.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsSettings {
    /// Below this entries/exits ratio a fund is flagged as low liquidity.
    pub liquidity_ratio_min: Decimal,
    /// Above this ratio a fund is flagged as accumulating cash.
    pub liquidity_ratio_max: Decimal,
    /// Share of total volume (in %) above which concentration is high.
    pub concentration_threshold: Decimal,
    pub default_period_days: u32,
    /// Seconds an analysis result stays cached.
    pub cache_ttl: u64,
}

impl AnalyticsSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiSettings {
    /// Seconds between client-side refreshes.
    pub refresh_interval: u64,
    /// Row limit applied to the extract listing.
    pub max_records_display: u32,
}

/// Microsoft Entra ID (OAuth2) settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EntraSettings {
    pub enabled: bool,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub metadata_url: String,
    /// Comma-separated e-mail domains allowed to sign in. Empty allows all.
    pub authorized_domains: String,
    pub cookie_secret: String,
}

impl EntraSettings {
    pub fn authorized_domains(&self) -> Vec<String> {
        self.authorized_domains
            .split(',')
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .collect()
    }

    /// Names of the required fields that are empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("AZURE_CLIENT_ID", &self.client_id),
            ("AZURE_CLIENT_SECRET", &self.client_secret),
            ("REDIRECT_URI", &self.redirect_uri),
            ("METADATA_URL", &self.metadata_url),
            ("COOKIE_SECRET", &self.cookie_secret),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Disables Entra login when it is switched on but incompletely configured.
    pub fn validated(mut self) -> Self {
        if !self.enabled {
            return self;
        }
        let missing = self.missing_fields();
        if missing.is_empty() {
            tracing::info!("Microsoft Entra login configured.");
        } else {
            tracing::error!(?missing, "Microsoft Entra configuration incomplete; disabling it.");
            self.enabled = false;
        }
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}
