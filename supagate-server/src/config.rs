//! Configuration management for the Supagate server.
//!
//! Values are resolved with the following precedence (highest first):
//! 1. Environment variables
//! 2. Configuration file (`supagate.toml`, or the path in `SUPAGATE_CONFIG`)
//! 3. Default values

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use supagate_core::{GatewayError, Result};

/// Config file looked up in the working directory when `SUPAGATE_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "supagate.toml";

/// Server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Supabase connection settings
    #[serde(default)]
    pub supabase: SupabaseConfig,

    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Supabase connection settings
#[derive(Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    /// Base URL of the Supabase instance (Kong gateway)
    #[serde(default = "default_supabase_url")]
    pub url: String,

    /// Service-role key used to sign every backend call
    #[serde(default)]
    pub key: String,

    #[serde(default)]
    pub anon_key: String,

    #[serde(default)]
    pub jwt_secret: String,

    /// Loaded for completeness; no operation opens a direct Postgres connection
    #[serde(default)]
    pub pg_connection_string: String,
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: default_supabase_url(),
            key: String::new(),
            anon_key: String::new(),
            jwt_secret: String::new(),
            pg_connection_string: String::new(),
        }
    }
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("key", &redacted(&self.key))
            .field("anon_key", &redacted(&self.anon_key))
            .field("jwt_secret", &redacted(&self.jwt_secret))
            .field("pg_connection_string", &redacted(&self.pg_connection_string))
            .finish()
    }
}

fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() { "<unset>" } else { "<redacted>" }
}

fn default_supabase_url() -> String {
    "http://localhost:8000".to_string()
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Deployment environment label (`development`, `production`, ...)
    #[serde(default = "default_env")]
    pub env: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            env: default_env(),
        }
    }
}

impl ServerConfig {
    /// `host:port` for the TCP listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_env() -> String {
    "development".to_string()
}

impl GatewayConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            GatewayError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            GatewayError::config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Load configuration from the process environment and the optional config file
    pub fn load() -> Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load configuration, reading variables through `lookup`
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let explicit = lookup("SUPAGATE_CONFIG").filter(|path| !path.is_empty());
        let config_path = explicit
            .clone()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = if config_path.exists() {
            Self::from_file(&config_path)?
        } else if explicit.is_some() {
            return Err(GatewayError::config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        } else {
            Self::default()
        };

        config.apply_env(lookup);
        Ok(config)
    }

    /// Override values from environment variables; empty values are ignored
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(url) = var("SUPABASE_URL") {
            self.supabase.url = url;
        }
        if let Some(key) = var("SUPABASE_KEY") {
            self.supabase.key = key;
        }
        if let Some(anon_key) = var("SUPABASE_ANON_KEY") {
            self.supabase.anon_key = anon_key;
        }
        if let Some(jwt_secret) = var("SUPABASE_JWT_SECRET") {
            self.supabase.jwt_secret = jwt_secret;
        }
        if let Some(connection) = var("PG_CONNECTION_STRING") {
            self.supabase.pg_connection_string = connection;
        }

        if let Some(host) = var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("PORT") {
            match port.parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring unparseable PORT value: {}", port),
            }
        }
        if let Some(env) = var("APP_ENV") {
            self.server.env = env;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let url = &self.supabase.url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(GatewayError::config(format!(
                "Invalid Supabase URL: {}. Must start with http:// or https://",
                url
            )));
        }

        if self.server.port == 0 {
            return Err(GatewayError::config("Port must be greater than 0"));
        }

        if self.supabase.key.is_empty() {
            tracing::warn!("SUPABASE_KEY is not set; backend calls will be unauthenticated");
        }

        Ok(())
    }

    /// Load and validate configuration
    pub fn load_and_validate() -> Result<Self> {
        let config = Self::load()?;
        config.validate()?;
        Ok(config)
    }
}
