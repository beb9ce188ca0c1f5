//! Relay configuration.
//!
//! Stored as TOML:
//! - Linux: `~/.config/seedshare/relay.toml`
//! - Windows: `%APPDATA%/seedshare/relay.toml`
//! - elsewhere: `/tmp/seedshare/relay.toml`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use seedshare_protocol::constants::{DEFAULT_ROOM, RELAY_DEFAULT_PORT};
use seedshare_protocol::{IceServer, IceTransportPolicy};
use seedshare_relay_server::{RelayConfig, ServerConfig};

/// Relay configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// TCP port to listen on (0 = auto-assign).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Room for `join` messages that name none.
    #[serde(default = "default_room")]
    pub default_room: String,

    /// Push `welcome {id}` to new connections.
    #[serde(default = "default_true")]
    pub send_welcome: bool,

    #[serde(default)]
    pub ice_transport_policy: IceTransportPolicy,

    /// STUN/TURN servers peers are expected to use. Informational.
    #[serde(default)]
    pub ice_servers: Vec<IceServer>,
}

fn default_port() -> u16 {
    RELAY_DEFAULT_PORT
}

fn default_room() -> String {
    DEFAULT_ROOM.into()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            default_room: default_room(),
            send_welcome: default_true(),
            ice_transport_policy: IceTransportPolicy::default(),
            ice_servers: Vec::new(),
        }
    }
}

impl Config {
    /// Loads `path` (or the platform default), creating a default file if missing.
    pub fn load(path: Option<PathBuf>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p,
            None => config_path(),
        };
        Self::load_from(&path)
    }

    fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            tracing::debug!(path = %path.display(), "configuration read");
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            tracing::info!(path = %path.display(), "default configuration written");
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        // May hold TURN credentials.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            port: self.port,
            relay: RelayConfig {
                default_room: self.default_room.clone(),
                send_welcome: self.send_welcome,
            },
        }
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("seedshare")
            .join("relay.toml")
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("seedshare").join("relay.toml")
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        PathBuf::from("/tmp/seedshare/relay.toml")
    }
}
