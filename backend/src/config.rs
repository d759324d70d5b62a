//! Application configuration loaded from a TOML file.
//!
//! Every section has defaults so that a missing file still yields a runnable
//! development server (with email notifications disabled).
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::storage::connection::DATABASE_URL;

pub const CONFIG_PATH_ENV: &str = "BOOKBANK_CONFIG";
pub const DATABASE_URL_ENV: &str = "BOOKBANK_DATABASE_URL";
pub const PORT_ENV: &str = "BOOKBANK_PORT";

/// One year
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 366;
const DEFAULT_CONFIG_PATH: &str = "bookbank.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub email: EmailConfig,
    pub limits: TransactionLimits,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DATABASE_URL.to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// When false, notifications are only logged
    pub enabled: bool,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_server: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            username: String::new(),
            password: String::new(),
            from_email: String::new(),
        }
    }
}

/// Business limits applied by the transaction forms
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TransactionLimits {
    pub min_deposit: f64,
    pub min_withdraw: f64,
    pub max_withdraw: f64,
    /// Loan requests are refused once this many loans are approved
    pub max_approved_loans: i64,
}

impl Default for TransactionLimits {
    fn default() -> Self {
        Self {
            min_deposit: 100.0,
            min_withdraw: 500.0,
            max_withdraw: 20_000.0,
            max_approved_loans: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub session_ttl_hours: i64,
    pub password_hash_cost: u32,
    /// Adds the `Secure` attribute to the session cookie
    pub secure_cookies: bool,
    /// Users registering with one of these names become staff
    pub staff_usernames: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // Two weeks
            session_ttl_hours: 24 * 14,
            password_hash_cost: bcrypt::DEFAULT_COST,
            secure_cookies: false,
            staff_usernames: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content).context("Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => {
                info!("Loaded configuration from {:?}", path);
                config
            }
            Err(e) => {
                warn!("Failed to load config from {:?}: {:#}", path, e);
                info!("Using default configuration (email notifications disabled)");
                AppConfig::default()
            }
        }
    }

    /// Load the file named by `BOOKBANK_CONFIG` (or `bookbank.toml`) and apply
    /// environment overrides
    pub fn from_env() -> Self {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut config = Self::load_or_default(&path);
        config.apply_overrides(
            std::env::var(DATABASE_URL_ENV).ok(),
            std::env::var(PORT_ENV).ok(),
        );
        config
    }

    fn apply_overrides(&mut self, database_url: Option<String>, port: Option<String>) {
        if let Some(url) = database_url.filter(|u| !u.trim().is_empty()) {
            self.database.url = url;
        }
        if let Some(port) = port {
            match port.trim().parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!("Ignoring invalid {} value: {}", PORT_ENV, port),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let limits = &self.limits;
        if limits.min_deposit <= 0.0 {
            return Err(anyhow!("limits.min_deposit must be positive"));
        }
        if limits.min_withdraw <= 0.0 || limits.max_withdraw < limits.min_withdraw {
            return Err(anyhow!("limits.max_withdraw must be at least limits.min_withdraw (> 0)"));
        }
        if limits.max_approved_loans < 0 {
            return Err(anyhow!("limits.max_approved_loans cannot be negative"));
        }
        if self.auth.session_ttl_hours <= 0 || self.auth.session_ttl_hours > MAX_SESSION_TTL_HOURS {
            return Err(anyhow!(
                "auth.session_ttl_hours must be between 1 and {}",
                MAX_SESSION_TTL_HOURS
            ));
        }
        if self.email.enabled {
            if self.email.username.is_empty() {
                return Err(anyhow!("Email username is required"));
            }
            if self.email.password.is_empty() {
                return Err(anyhow!("Email password is required"));
            }
            if self.email.from_email.is_empty() {
                return Err(anyhow!("From email is required"));
            }
        }
        Ok(())
    }

    pub fn bind_address(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.server.host, self.server.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.limits, TransactionLimits::default());
        assert_eq!(config.limits.min_deposit, 100.0);
        assert_eq!(config.limits.max_approved_loans, 3);
        assert!(!config.email.enabled);
        assert_eq!(config.bind_address().unwrap().port(), 8000);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [server]
            port = 9090

            [limits]
            max_withdraw = 5000.0

            [auth]
            staff_usernames = ["librarian"]
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.limits.max_withdraw, 5000.0);
        assert_eq!(config.limits.min_withdraw, 500.0);
        assert_eq!(config.auth.staff_usernames, vec!["librarian".to_string()]);
    }

    #[test]
    fn test_enabled_email_requires_credentials() {
        let err = AppConfig::from_toml(
            r#"
            [email]
            enabled = true
            from_email = "bank@example.com"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("username"));
    }

    #[test]
    fn test_inconsistent_limits_are_rejected() {
        let result = AppConfig::from_toml(
            r#"
            [limits]
            min_withdraw = 1000.0
            max_withdraw = 10.0
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_session_ttl_is_bounded() {
        let huge = AppConfig::from_toml(
            r#"
            [auth]
            session_ttl_hours = 9223372036854775807
            "#,
        );
        assert!(huge.unwrap_err().to_string().contains("session_ttl_hours"));

        let zero = AppConfig::from_toml("[auth]\nsession_ttl_hours = 0");
        assert!(zero.is_err());

        let year = AppConfig::from_toml(&format!("[auth]\nsession_ttl_hours = {}", MAX_SESSION_TTL_HOURS));
        assert_eq!(year.unwrap().auth.session_ttl_hours, MAX_SESSION_TTL_HOURS);
    }

    #[test]
    fn test_environment_overrides() {
        let mut config = AppConfig::default();
        config.apply_overrides(Some("sqlite:other.db".to_string()), Some("7001".to_string()));
        assert_eq!(config.database.url, "sqlite:other.db");
        assert_eq!(config.server.port, 7001);

        config.apply_overrides(Some("  ".to_string()), Some("not-a-port".to_string()));
        assert_eq!(config.database.url, "sqlite:other.db");
        assert_eq!(config.server.port, 7001);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_or_default(Path::new("/definitely/not/here.toml"));
        assert_eq!(config.database.url, DATABASE_URL);
    }
}
