//! Server settings.
//!
//! Sources, later overriding earlier: built-in defaults, an optional TOML
//! file (`rehber.toml` unless a path is given), then `REHBER__SECTION__KEY`
//! environment variables.

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::net::SocketAddr;

pub const DEFAULT_CONFIG_FILE: &str = "rehber.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

impl Server {
    pub fn address(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    /// Directory uploaded images are written to.
    pub media_dir: String,
    /// URL prefix the media directory is served under.
    pub public_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Auth {
    pub session_ttl_minutes: i64,
}

impl Auth {
    pub fn session_ttl_ms(&self) -> i64 {
        self.session_ttl_minutes.saturating_mul(60 * 1000)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Logging {
    pub level: String,
    /// Absolute directory for rotating log files; stderr when unset.
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub database: Database,
    pub storage: Storage,
    pub auth: Auth,
    pub logging: Logging,
}

impl Settings {
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let file = path.unwrap_or(DEFAULT_CONFIG_FILE);
        Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.path", "rehber.sqlite3")?
            .set_default("storage.media_dir", "media")?
            .set_default("storage.public_base", "/media")?
            .set_default("auth.session_ttl_minutes", 12 * 60)?
            .set_default("logging.level", rehber_core::default_log_level())?
            .add_source(
                File::with_name(file)
                    .format(FileFormat::Toml)
                    .required(path.is_some()),
            )
            .add_source(
                Environment::with_prefix("REHBER")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}
