//! Netplay configuration loaded from TOML.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub netplay: NetplayConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// Addresses, port and control mask of the netplay session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetplayConfig {
    /// Remote server the client connects to.
    #[serde(default = "default_server_name")]
    pub server_name: String,
    /// Local address the server listens on; empty means all interfaces.
    #[serde(default)]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Control mask: low byte server channels, high byte client channels.
    #[serde(default = "default_control")]
    pub control: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for NetplayConfig {
    fn default() -> Self {
        Self {
            server_name: default_server_name(),
            bind_address: String::new(),
            port: default_port(),
            control: default_control(),
            log_level: default_log_level(),
        }
    }
}

/// Network timeouts, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_connect_ms")]
    pub connect_ms: u64,
    #[serde(default = "default_handshake_ms")]
    pub handshake_ms: u64,
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    pub fn handshake(&self) -> Duration {
        Duration::from_millis(self.handshake_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: default_connect_ms(),
            handshake_ms: default_handshake_ms(),
        }
    }
}

fn default_server_name() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    6502
}

fn default_control() -> u16 {
    netplay_types::ControlMask::DEFAULT.0
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_connect_ms() -> u64 {
    5_000
}

fn default_handshake_ms() -> u64 {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("port = 6502"));
        assert!(toml_str.contains("server_name = \"127.0.0.1\""));
    }

    #[test]
    fn parse_example_config() {
        let toml_str = r#"
[netplay]
server_name = "c64.example.org"
bind_address = "0.0.0.0"
port = 6510
control = 799
log_level = "debug"

[timeouts]
connect_ms = 2500
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.netplay.server_name, "c64.example.org");
        assert_eq!(config.netplay.bind_address, "0.0.0.0");
        assert_eq!(config.netplay.port, 6510);
        assert_eq!(config.netplay.control, 0x031f);
        assert_eq!(config.timeouts.connect(), Duration::from_millis(2500));
        assert_eq!(config.timeouts.handshake(), Duration::from_secs(10));
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.netplay.port, 6502);
        assert!(config.netplay.bind_address.is_empty());
        assert_eq!(config.netplay.control, 0x031d);
    }
}
