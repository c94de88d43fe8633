//! Server configuration from environment variables.
//!
//! Unset variables fall back to defaults; set-but-unparseable values are a
//! startup error rather than a silent fallback.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_ROOM_GRACE_SECS: u64 = 60;
const DEFAULT_CLIENT_BUFFER: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port the server binds.
    pub port: u16,
    /// How long an empty room survives before destruction.
    pub room_grace: Duration,
    /// Outbound event buffer per connection; broadcasts to a full buffer are
    /// dropped rather than blocking the mutating path.
    pub client_buffer: usize,
    /// Directory of static client files, served at `/` when set.
    pub static_dir: Option<PathBuf>,
    /// Starting index into the member color rotation.
    pub palette_start: usize,
}

impl ServerConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when a variable is set but fails to
    /// parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            port: env_parse("PORT")?.unwrap_or(defaults.port),
            room_grace: env_parse("ROOM_GRACE_SECS")?
                .map_or(defaults.room_grace, Duration::from_secs),
            client_buffer: env_parse("CLIENT_BUFFER")?.unwrap_or(defaults.client_buffer),
            static_dir: std::env::var("STATIC_DIR").ok().map(PathBuf::from),
            palette_start: env_parse("PALETTE_START")?.unwrap_or(defaults.palette_start),
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            room_grace: Duration::from_secs(DEFAULT_ROOM_GRACE_SECS),
            client_buffer: DEFAULT_CLIENT_BUFFER,
            static_dir: None,
            palette_start: 0,
        }
    }
}

fn env_parse<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(None),
    }
}
