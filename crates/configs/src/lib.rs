//! # configs
//!
//! Layered settings for the forum server. Later layers win:
//!
//! 1. built-in defaults
//! 2. `config/forum.toml` (optional)
//! 3. environment variables such as `FORUM__SERVER__PORT=8080` (a `.env`
//!    file is read first, if present)

use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

const CONFIG_FILE: &str = "config/forum";
const ENV_PREFIX: &str = "FORUM";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("database.url is required when database.backend is postgres")]
    MissingDatabaseUrl,

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub backend: DatabaseBackend,
    #[serde(deserialize_with = "secret")]
    pub url: SecretString,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl DatabaseSettings {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence when set
    pub filter: String,
    pub json: bool,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub log: LogSettings,
}

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

fn with_defaults(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
    builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 5000)?
        .set_default("database.backend", "memory")?
        .set_default("database.url", "")?
        .set_default("database.max_connections", 16)?
        .set_default("database.acquire_timeout_secs", 5)?
        .set_default("log.filter", "info,sqlx=warn")?
        .set_default("log.json", false)
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

impl Settings {
    /// Reads `.env`, the optional config file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env file is normal outside development.
        let _ = dotenvy::dotenv();
        let builder = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(env_source());
        Self::build(builder)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings: Settings = with_defaults(builder)?.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.backend == DatabaseBackend::Postgres
            && self.database.url.expose_secret().trim().is_empty()
        {
            return Err(ConfigError::MissingDatabaseUrl);
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid("database.max_connections must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use config::{FileFormat, Map};

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Environment {
        let vars: Map<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        env_source().source(Some(vars))
    }

    #[test]
    fn defaults_select_the_memory_backend() {
        let settings = Settings::build(Config::builder()).unwrap();
        assert_eq!(settings.database.backend, DatabaseBackend::Memory);
        assert_eq!(settings.server.addr(), "0.0.0.0:5000");
        assert!(!settings.log.json);
    }

    #[test]
    fn environment_overrides_file() {
        let toml = r#"
            [server]
            port = 7000
            [database]
            backend = "postgres"
            url = "postgres://forum@localhost/forum"
        "#;
        let builder = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .add_source(env(&[("FORUM__SERVER__PORT", "9000"), ("FORUM__LOG__JSON", "true")]));

        let settings = Settings::build(builder).unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.database.backend, DatabaseBackend::Postgres);
        assert_eq!(settings.database.url.expose_secret(), "postgres://forum@localhost/forum");
        assert!(settings.log.json);
    }

    #[test]
    fn postgres_without_url_is_rejected() {
        let builder = Config::builder().add_source(env(&[("FORUM__DATABASE__BACKEND", "postgres")]));
        assert!(matches!(Settings::build(builder), Err(ConfigError::MissingDatabaseUrl)));
    }

    #[test]
    fn database_url_is_redacted_in_debug_output() {
        let builder = Config::builder()
            .add_source(env(&[("FORUM__DATABASE__URL", "postgres://u:hunter2@db/forum")]));
        let settings = Settings::build(builder).unwrap();
        assert!(!format!("{settings:?}").contains("hunter2"));
    }
}
