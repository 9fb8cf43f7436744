//! Application configuration.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Billing webhook configuration.
    #[serde(default)]
    pub billing: BillingConfig,
    /// Voting configuration.
    #[serde(default)]
    pub voting: VotingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Billing provider webhook configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Shared secret used to sign webhook payloads.
    #[serde(default)]
    pub webhook_secret: String,
    /// Maximum accepted age of a signed payload, in seconds.
    #[serde(default = "default_tolerance_secs")]
    pub tolerance_secs: i64,
    /// Provider price ID to plan name (`premium`, `unlimited`).
    #[serde(default)]
    pub price_plans: HashMap<String, String>,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            webhook_secret: String::new(),
            tolerance_secs: default_tolerance_secs(),
            price_plans: HashMap::new(),
        }
    }
}

/// Voting configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct VotingConfig {
    /// Salt mixed into voter fingerprints.
    #[serde(default = "default_fingerprint_salt")]
    pub fingerprint_salt: String,
    /// Name of the anonymous voter cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            fingerprint_salt: default_fingerprint_salt(),
            cookie_name: default_cookie_name(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_tolerance_secs() -> i64 {
    300
}

fn default_fingerprint_salt() -> String {
    "pollnow".to_string()
}

fn default_cookie_name() -> String {
    "pollnow_voter".to_string()
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `POLLNOW_ENV`)
    /// 4. Environment variables with `POLLNOW_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let env = std::env::var("POLLNOW_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("POLLNOW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("POLLNOW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let raw = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [server]
                url = "https://pollnow.example"

                [database]
                url = "postgres://localhost/pollnow"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let config: Config = raw.try_deserialize().unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.max_connections, 100);
        assert_eq!(config.billing.tolerance_secs, 300);
        assert!(config.billing.webhook_secret.is_empty());
        assert_eq!(config.voting.cookie_name, "pollnow_voter");
    }

    #[test]
    fn test_price_plan_map() {
        let raw = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [server]
                url = "https://pollnow.example"

                [database]
                url = "postgres://localhost/pollnow"

                [billing]
                webhook_secret = "whsec_test"
                price_plans = { price_premium = "premium", price_max = "unlimited" }
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let config: Config = raw.try_deserialize().unwrap();
        assert_eq!(config.billing.webhook_secret, "whsec_test");
        assert_eq!(
            config.billing.price_plans.get("price_max").map(String::as_str),
            Some("unlimited")
        );
    }
}
