//! Server configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use inkling_room::{RoomConfig, SweeperConfig};

pub const ENV_BIND: &str = "INKLING_BIND";
pub const ENV_UPLOADS_DIR: &str = "INKLING_UPLOADS_DIR";
pub const ENV_ASSET_PREFIX: &str = "INKLING_ASSET_PREFIX";
pub const ENV_SWEEP_PERIOD_SECS: &str = "INKLING_SWEEP_PERIOD_SECS";
pub const ENV_MAX_GAME_AGE_SECS: &str = "INKLING_MAX_GAME_AGE_SECS";

/// A configuration value that could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key}={value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything [`InklingServer`](crate::InklingServer) needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address of the WebSocket fan-out.
    pub bind: String,
    /// Root directory uploaded drawings are written under.
    pub uploads_dir: PathBuf,
    /// Prefix joined to a drawing's stored path to form its URL.
    pub asset_prefix: String,
    pub room: RoomConfig,
    pub sweeper: SweeperConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            uploads_dir: PathBuf::from("uploads"),
            asset_prefix: "/uploads".to_string(),
            room: RoomConfig::default(),
            sweeper: SweeperConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `INKLING_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(bind) = lookup(ENV_BIND) {
            config.bind = bind;
        }
        if let Some(dir) = lookup(ENV_UPLOADS_DIR) {
            config.uploads_dir = PathBuf::from(dir);
        }
        if let Some(prefix) = lookup(ENV_ASSET_PREFIX) {
            config.asset_prefix = prefix.trim_end_matches('/').to_string();
        }
        if let Some(secs) = parse_secs(&lookup, ENV_SWEEP_PERIOD_SECS)? {
            config.sweeper.period = secs;
        }
        if let Some(secs) = parse_secs(&lookup, ENV_MAX_GAME_AGE_SECS)? {
            config.sweeper.max_game_age = secs;
        }
        Ok(config)
    }
}

fn parse_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let secs = u64::from_str(raw.trim()).map_err(|e| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason: e.to_string(),
    })?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(Some(Duration::from_secs(secs)))
}
