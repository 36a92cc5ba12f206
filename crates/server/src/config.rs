//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    ///
    /// A `TICK_RATE` environment variable overrides the configured
    /// tick rate.
    pub fn load() -> anyhow::Result<Self> {
        let path = Path::new("config.toml");
        let mut config: Self = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)?
        } else {
            info!("No config.toml found, creating default config");
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            default_config
        };

        if let Ok(rate) = std::env::var("TICK_RATE") {
            match rate.parse::<u32>() {
                Ok(rate) if rate > 0 => config.server.tick_rate = rate,
                _ => warn!("Ignoring invalid TICK_RATE value: {}", rate),
            }
        }

        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
        }
    }
}

/// Server networking and simulation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Simulation ticks per second.
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
    /// Maximum simultaneous connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Outbound frames buffered per connection before the client is
    /// considered stalled and dropped.
    #[serde(default = "default_send_buffer")]
    pub send_buffer: usize,
}

impl ServerConfig {
    /// Wall-clock duration of one simulation tick.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            tick_rate: default_tick_rate(),
            max_connections: default_max_connections(),
            send_buffer: default_send_buffer(),
        }
    }
}

fn default_bind() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    8765
}
fn default_tick_rate() -> u32 {
    24
}
fn default_max_connections() -> usize {
    100
}
fn default_send_buffer() -> usize {
    32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8765);
        assert_eq!(config.server.tick_rate, 24);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str("[server]\nport = 9000\n").unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.tick_rate, 24);
        assert_eq!(config.server.bind, "localhost");
    }

    #[test]
    fn test_tick_duration() {
        let mut config = ServerConfig::default();
        config.tick_rate = 50;
        assert_eq!(config.tick_duration(), Duration::from_millis(20));
    }
}
