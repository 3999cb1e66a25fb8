use std::str::FromStr;

use serde::Deserialize;

const DEV_JWT_SECRET: &str = "stockroom-dev-secret-change-me";

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Credentials of the administrator the seeder bootstraps.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        AdminConfig {
            name: "Admin User".to_string(),
            email: "admin@example.com".to_string(),
            password: "password".to_string(),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database connection URL (e.g. sqlite://stockroom.db, postgres://...)
    pub database_url: String,

    /// Token signing secret
    pub jwt_secret: String,

    /// Server host (default: 127.0.0.1)
    pub server_host: String,

    /// Server port (default: 3000)
    pub server_port: u16,

    /// Environment: development, production, test
    pub environment: String,

    pub log_format: LogFormat,

    pub admin: AdminConfig,

    /// Run the idempotent seeder when the server starts (default: true)
    pub seed_on_start: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: "sqlite://stockroom.db?mode=rwc".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            environment: "development".to_string(),
            log_format: LogFormat::Pretty,
            admin: AdminConfig::default(),
            seed_on_start: true,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"),
        Err(_) => default,
    }
}

impl Config {
    /// Load configuration from environment variables (with .env support).
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        // Load .env file if present (ignore errors if missing)
        let _ = dotenvy::dotenv();

        let defaults = Config::default();
        let config = Config {
            database_url: env_or("DATABASE_URL", &defaults.database_url),
            jwt_secret: env_or("JWT_SECRET", &defaults.jwt_secret),
            server_host: env_or("SERVER_HOST", &defaults.server_host),
            server_port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            environment: env_or("ENVIRONMENT", &defaults.environment),
            log_format: std::env::var("LOG_FORMAT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            admin: AdminConfig {
                name: env_or("ADMIN_NAME", &defaults.admin.name),
                email: env_or("ADMIN_EMAIL", &defaults.admin.email),
                password: env_or("ADMIN_PASSWORD", &defaults.admin.password),
            },
            seed_on_start: env_flag("SEED_ON_START", defaults.seed_on_start),
        };

        if config.jwt_secret.is_empty() {
            return Err("JWT_SECRET must not be empty".into());
        }

        Ok(config)
    }

    /// Configuration for tests: in-memory SQLite and no start-up seeding.
    pub fn for_tests() -> Self {
        Config {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "stockroom-test-secret".to_string(),
            environment: "test".to_string(),
            seed_on_start: false,
            ..Config::default()
        }
    }

    /// Check if running in development mode.
    pub fn is_dev(&self) -> bool {
        self.environment == "development"
    }

    /// Whether the signing secret is still the built-in development value.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    /// Get the full server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("compact".parse::<LogFormat>(), Ok(LogFormat::Compact));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.server_addr(), "127.0.0.1:3000");
        assert!(config.is_dev());
        assert!(config.uses_dev_secret());
        assert_eq!(config.admin.email, "admin@example.com");
    }

    #[test]
    fn test_config_uses_memory_db() {
        let config = Config::for_tests();
        assert!(config.database_url.contains("memory"));
        assert!(!config.seed_on_start);
        assert!(!config.uses_dev_secret());
    }
}
