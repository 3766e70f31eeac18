//! Configuration management
//!
//! Configuration is loaded from a `config.yml` file and then overridden by
//! environment variables. Missing values are filled with defaults, so the
//! server starts with no configuration file at all.
//!
//! The legacy variables `PORT`, `MONGOLAB_URI` and `MONGOHQ_URL` are honored
//! so existing deployments keep working.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path} {message}")]
    ParseError { path: String, message: String },
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Session configuration
    #[serde(default)]
    pub session: SessionConfig,
    /// Static file configuration
    #[serde(default, rename = "static")]
    pub static_files: StaticConfig,
    /// Behaviors that differed between earlier server variants
    #[serde(default)]
    pub compat: CompatConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (for cookie-based auth)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/gitnaughty.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

impl DatabaseDriver {
    /// Infer the driver from a connection string's scheme.
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("mysql://") {
            DatabaseDriver::Mysql
        } else {
            DatabaseDriver::Sqlite
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Key used to sign session cookies
    #[serde(default = "default_session_secret")]
    pub secret: String,
    /// Session lifetime in seconds, counted from login
    #[serde(default = "default_session_ttl")]
    pub ttl_seconds: i64,
    /// Name of the session cookie
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// How often expired sessions are swept from the database
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: default_session_secret(),
            ttl_seconds: default_session_ttl(),
            cookie_name: default_cookie_name(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

/// Development signing key. A warning is logged when a server starts with it.
pub const DEFAULT_SESSION_SECRET: &str = "DirtyLittleBlogger";

/// Session lifetime in seconds, and the cookie's max-age
pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 60;

fn default_session_secret() -> String {
    DEFAULT_SESSION_SECRET.to_string()
}

fn default_session_ttl() -> i64 {
    DEFAULT_SESSION_TTL_SECONDS
}

fn default_cookie_name() -> String {
    "gitnaughty.sid".to_string()
}

fn default_sweep_interval() -> u64 {
    300
}

/// Static file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticConfig {
    /// Directory holding the client bundle (`views/index.html`, `views/profile.html`, assets)
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            public_dir: default_public_dir(),
        }
    }
}

fn default_public_dir() -> PathBuf {
    PathBuf::from("public")
}

/// What `POST /login` does with bad credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoginFailureMode {
    /// Redirect to `/` without telling the client anything
    #[default]
    Redirect,
    /// Respond 401 with a JSON error
    Reject,
}

/// Behaviors that earlier server variants disagreed on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatConfig {
    #[serde(default)]
    pub login_failure: LoginFailureMode,
    /// Embed author documents in `GET /api/posts`
    #[serde(default = "default_true")]
    pub populate_post_list: bool,
}

impl Default for CompatConfig {
    fn default() -> Self {
        Self {
            login_failure: LoginFailureMode::default(),
            populate_post_list: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: format_yaml_error(&e),
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Recognized variables:
    /// - GITNAUGHTY_SERVER_HOST, GITNAUGHTY_SERVER_PORT, PORT, GITNAUGHTY_SERVER_CORS_ORIGIN
    /// - GITNAUGHTY_DATABASE_DRIVER, GITNAUGHTY_DATABASE_URL, MONGOHQ_URL, MONGOLAB_URI
    /// - GITNAUGHTY_SESSION_SECRET, GITNAUGHTY_SESSION_TTL_SECONDS
    /// - GITNAUGHTY_PUBLIC_DIR
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        // Server configuration
        if let Ok(host) = std::env::var("GITNAUGHTY_SERVER_HOST") {
            self.server.host = host;
        }
        for key in ["GITNAUGHTY_SERVER_PORT", "PORT"] {
            if let Some(port) = std::env::var(key).ok().and_then(|p| p.parse::<u16>().ok()) {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("GITNAUGHTY_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        // Database configuration
        if let Ok(driver) = std::env::var("GITNAUGHTY_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        // Later keys win: MONGOLAB_URI || MONGOHQ_URL || GITNAUGHTY_DATABASE_URL
        for key in ["GITNAUGHTY_DATABASE_URL", "MONGOHQ_URL", "MONGOLAB_URI"] {
            if let Ok(url) = std::env::var(key) {
                if !url.is_empty() {
                    self.database.driver = DatabaseDriver::from_url(&url);
                    self.database.url = url;
                }
            }
        }

        // Session configuration
        if let Ok(secret) = std::env::var("GITNAUGHTY_SESSION_SECRET") {
            self.session.secret = secret;
        }
        if let Ok(ttl) = std::env::var("GITNAUGHTY_SESSION_TTL_SECONDS") {
            if let Ok(ttl) = ttl.parse::<i64>() {
                self.session.ttl_seconds = ttl;
            }
        }

        if let Ok(dir) = std::env::var("GITNAUGHTY_PUBLIC_DIR") {
            self.static_files.public_dir = PathBuf::from(dir);
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
