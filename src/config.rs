//! Configuration manager.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::FromRef;
use serde::{Deserialize, Serialize};

use crate::AppState;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_NAME: &str = "accounts";
const DEFAULT_ADDRESS: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Instance name, also used as token issuer.
    pub name: String,
    /// Interface to bind.
    pub address: String,
    /// Port to listen on.
    pub port: u16,
    #[serde(skip_deserializing)]
    pub version: String,
    #[serde(skip)]
    path: PathBuf,
    /// Related to PostgreSQL configuration.
    /// Accounts are kept in memory when absent.
    #[serde(skip_serializing)]
    pub postgres: Option<Postgres>,
    /// Related to Argon2 configuration.
    #[serde(skip_serializing)]
    pub argon2: Argon2,
    /// Related to JsonWebToken configuration.
    #[serde(skip_serializing)]
    pub token: Token,
    /// Access policy for account routes.
    pub security: Security,
    #[serde(skip_serializing)]
    pub telemetry: Telemetry,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_owned(),
            address: DEFAULT_ADDRESS.to_owned(),
            port: DEFAULT_PORT,
            version: VERSION.to_owned(),
            path: PathBuf::from(DEFAULT_CONFIG_PATH),
            postgres: None,
            argon2: Argon2::default(),
            token: Token::default(),
            security: Security::default(),
            telemetry: Telemetry::default(),
        }
    }
}

/// PostgreSQL configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Postgres {
    /// Hostname:(?port) for PostgreSQL instance.
    pub address: String,
    /// Database name.
    pub database: Option<String>,
    /// Username credential to connect.
    pub username: Option<String>,
    /// Password credential to connect.
    pub password: Option<String>,
    /// Maximum pool connections.
    pub pool_size: Option<u32>,
}

/// Argon2 configuration.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Argon2 {
    /// Memory used while hashing, in KiB.
    pub memory_cost: u32,
    /// Iterations of hash.
    pub iterations: u32,
    /// Parallelism degree.
    pub parallelism: u32,
    /// Output hash length.
    pub hash_length: usize,
}

impl Default for Argon2 {
    fn default() -> Self {
        Self {
            memory_cost: 1024 * 64, // 64 MiB.
            iterations: 4,
            parallelism: 2,
            hash_length: 32,
        }
    }
}

/// Json Web Token configuration.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Token {
    /// HMAC secret. `TOKEN_SECRET` environment variable takes precedence.
    pub secret: Option<String>,
    /// Token audience.
    pub audience: Option<String>,
    /// Lifetime in seconds.
    pub expiration: u64,
}

impl Default for Token {
    fn default() -> Self {
        Self {
            secret: None,
            audience: None,
            expiration: 60 * 15,
        }
    }
}

/// Who may read `GET /accounts/{id}`.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessPolicy {
    /// A valid bearer token is required.
    #[default]
    Authenticated,
    /// Anyone.
    Public,
}

/// Route access configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Security {
    pub account_lookup: AccessPolicy,
}

/// Observability configuration.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Telemetry {
    /// OTLP gRPC collector for traces and logs.
    pub otlp_endpoint: Option<String>,
    /// Expose Prometheus metrics on `/metrics`.
    pub metrics: bool,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            metrics: true,
        }
    }
}

impl FromRef<AppState> for Arc<Configuration> {
    fn from_ref(state: &AppState) -> Arc<Configuration> {
        Arc::clone(&state.config)
    }
}

impl Configuration {
    /// Set the file to read on [`Configuration::read`].
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Reads the configuration file, then applies environment overrides.
    ///
    /// A missing or unreadable file falls back to defaults.
    pub fn read(self) -> Arc<Self> {
        let file_path = if self.path.is_file() {
            self.path.clone()
        } else {
            Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        };

        let config = match File::open(&file_path) {
            Ok(file) => match Self::parse(file) {
                Ok(config) => config,
                Err(err) => self.error(err),
            },
            Err(err) => self.error(err),
        };

        Arc::new(config.with_env())
    }

    /// Parse YAML configuration.
    pub fn parse(reader: impl std::io::Read) -> Result<Self, serde_yaml::Error> {
        let mut config: Configuration = serde_yaml::from_reader(reader)?;
        config.version = VERSION.to_owned();
        Ok(config)
    }

    fn with_env(mut self) -> Self {
        if let Some(port) =
            std::env::var("PORT").ok().and_then(|p| p.parse().ok())
        {
            self.port = port;
        }

        if let Ok(secret) = std::env::var("TOKEN_SECRET") {
            self.token.secret = Some(secret);
        }

        self
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, path = %self.path.display(), "configuration file not loaded, using defaults");
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
name: cultural
port: 9000
postgres:
  address: localhost:5432
  database: accounts
  pool_size: 4
argon2:
  memory_cost: 19456
  iterations: 2
  parallelism: 1
  hash_length: 32
token:
  secret: not-so-secret
  expiration: 60
security:
  account_lookup: public
"#;

    #[test]
    fn test_parse_yaml() {
        let config = Configuration::parse(YAML.as_bytes()).unwrap();

        assert_eq!(config.name, "cultural");
        assert_eq!(config.port, 9000);
        assert_eq!(config.address, DEFAULT_ADDRESS);
        assert_eq!(config.version, VERSION);
        assert_eq!(config.postgres.unwrap().pool_size, Some(4));
        assert_eq!(config.argon2.memory_cost, 19456);
        assert_eq!(config.token.secret.as_deref(), Some("not-so-secret"));
        assert_eq!(config.token.expiration, 60);
        assert_eq!(config.security.account_lookup, AccessPolicy::Public);
        assert!(config.telemetry.metrics);
    }

    #[test]
    fn test_defaults() {
        let config = Configuration::parse("{}".as_bytes()).unwrap();

        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.postgres.is_none());
        assert_eq!(config.argon2, Argon2::default());
        assert_eq!(config.token.expiration, 900);
        assert_eq!(
            config.security.account_lookup,
            AccessPolicy::Authenticated
        );
    }

    #[test]
    fn test_secrets_not_serialized() {
        let config = Configuration::parse(YAML.as_bytes()).unwrap();
        let json = serde_json::to_string(&config).unwrap();

        assert!(!json.contains("not-so-secret"));
        assert!(!json.contains("postgres"));
    }
}
