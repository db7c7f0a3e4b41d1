use config::{Config, ConfigError as BaseConfigError, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::{DEFAULT_BCRYPT_COST, MAX_BCRYPT_COST, MIN_BCRYPT_COST};

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct SecurityConfig {
    pub cookie_secure: bool,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub lifetime_hours: i64,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct UiConfig {
    pub brand_name: String,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub session: SessionConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Config(#[from] BaseConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Environment variables and the settings they override.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("SERVER_BIND_ADDR", "server.bind_addr"),
    ("SERVER_PORT", "server.port"),
    ("REQUEST_TIMEOUT_SECS", "server.request_timeout_secs"),
    ("DATABASE_URL", "database.url"),
    ("DATABASE_MAX_CONNECTIONS", "database.max_connections"),
    ("COOKIE_SECURE", "security.cookie_secure"),
    ("BCRYPT_COST", "security.bcrypt_cost"),
    ("SESSION_COOKIE_NAME", "session.cookie_name"),
    ("SESSION_LIFETIME_HOURS", "session.lifetime_hours"),
    ("UI_BRAND_NAME", "ui.brand_name"),
];

impl AppConfig {
    /// Built-in defaults, then an optional `config.*` file, then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::layered("config", |key| std::env::var(key).ok())
    }

    /// Layer `file` (format picked from its extension, skipped when absent) over the defaults,
    /// then apply whichever overrides `lookup` returns.
    pub fn layered<F>(file: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name(file).required(false));

        for (var, key) in ENV_OVERRIDES {
            if let Some(value) = lookup(var) {
                settings = settings.set_override(*key, value)?;
            }
        }

        let mut config: AppConfig = settings.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "REQUEST_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "DATABASE_MAX_CONNECTIONS must be at least 1".to_string(),
            ));
        }

        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.security.bcrypt_cost) {
            return Err(ConfigError::Validation(format!(
                "BCRYPT_COST must be between {MIN_BCRYPT_COST} and {MAX_BCRYPT_COST}"
            )));
        }

        if self.session.lifetime_hours < 1 {
            return Err(ConfigError::Validation(
                "SESSION_LIFETIME_HOURS must be at least 1".to_string(),
            ));
        }

        self.session.cookie_name = self.session.cookie_name.trim().to_string();
        if self.session.cookie_name.is_empty() {
            return Err(ConfigError::Validation(
                "SESSION_COOKIE_NAME cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_addr: "0.0.0.0".to_string(),
                port: 4000,
                request_timeout_secs: 10,
            },
            database: DatabaseConfig {
                url: "sqlite://snippetbox.db?mode=rwc".to_string(),
                max_connections: 10,
            },
            security: SecurityConfig {
                cookie_secure: true,
                bcrypt_cost: DEFAULT_BCRYPT_COST,
            },
            session: SessionConfig {
                cookie_name: "snippetbox_session".to_string(),
                lifetime_hours: 12,
            },
            ui: UiConfig {
                brand_name: "Snippetbox".to_string(),
            },
        }
    }
}
