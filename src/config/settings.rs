use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;

/// Top-level configuration settings for the gateway.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub gateway: GatewaySettings,
    pub heartbeat: HeartbeatSettings,
    pub logging: LoggingSettings,
}

/// Configuration settings for the server.
///
/// Defines the host and port the listener binds to. Port `0` asks the OS for
/// an ephemeral port; rebinds then reuse whatever port was assigned.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Namespaces served and restart behaviour.
#[derive(Debug, Deserialize, Clone)]
pub struct GatewaySettings {
    pub namespaces: Vec<String>,
    pub restart_event: String,
    pub restart_delay_ms: u64,
    pub rebind_attempts: u32,
    pub drain_grace_ms: u64,
    pub max_connections: usize,
}

impl GatewaySettings {
    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn drain_grace(&self) -> Duration {
        Duration::from_millis(self.drain_grace_ms)
    }
}

/// Server-driven ping/pong liveness check.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct HeartbeatSettings {
    pub ping_interval_ms: u64,
    pub ping_timeout_ms: u64,
}

impl HeartbeatSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    /// Silence longer than this closes the connection.
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms.saturating_add(self.ping_timeout_ms))
    }

    /// A zero interval cannot drive a ticker, and the deadline must fit in a `u64`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ping_interval_ms == 0 {
            return Err(ConfigError::Message(
                "heartbeat.ping_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self
            .ping_interval_ms
            .checked_add(self.ping_timeout_ms)
            .is_none()
        {
            return Err(ConfigError::Message(
                "heartbeat.ping_interval_ms + heartbeat.ping_timeout_ms overflows".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

impl Settings {
    /// Rejects settings the gateway cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.heartbeat.validate()
    }
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub gateway: Option<PartialGatewaySettings>,
    pub heartbeat: Option<PartialHeartbeatSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PartialGatewaySettings {
    pub namespaces: Option<Vec<String>>,
    pub restart_event: Option<String>,
    pub restart_delay_ms: Option<u64>,
    pub rebind_attempts: Option<u32>,
    pub drain_grace_ms: Option<u64>,
    pub max_connections: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialHeartbeatSettings {
    pub ping_interval_ms: Option<u64>,
    pub ping_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

impl PartialSettings {
    /// Fills every missing value from `default`.
    pub fn merge(self, default: Settings) -> Settings {
        let server = self.server;
        let gateway = self.gateway;
        let heartbeat = self.heartbeat;
        let logging = self.logging;

        Settings {
            server: ServerSettings {
                host: server
                    .as_ref()
                    .and_then(|s| s.host.clone())
                    .unwrap_or(default.server.host),
                port: server
                    .as_ref()
                    .and_then(|s| s.port)
                    .unwrap_or(default.server.port),
            },
            gateway: GatewaySettings {
                namespaces: gateway
                    .as_ref()
                    .and_then(|g| g.namespaces.clone())
                    .unwrap_or(default.gateway.namespaces),
                restart_event: gateway
                    .as_ref()
                    .and_then(|g| g.restart_event.clone())
                    .unwrap_or(default.gateway.restart_event),
                restart_delay_ms: gateway
                    .as_ref()
                    .and_then(|g| g.restart_delay_ms)
                    .unwrap_or(default.gateway.restart_delay_ms),
                rebind_attempts: gateway
                    .as_ref()
                    .and_then(|g| g.rebind_attempts)
                    .unwrap_or(default.gateway.rebind_attempts),
                drain_grace_ms: gateway
                    .as_ref()
                    .and_then(|g| g.drain_grace_ms)
                    .unwrap_or(default.gateway.drain_grace_ms),
                max_connections: gateway
                    .as_ref()
                    .and_then(|g| g.max_connections)
                    .unwrap_or(default.gateway.max_connections),
            },
            heartbeat: HeartbeatSettings {
                ping_interval_ms: heartbeat
                    .as_ref()
                    .and_then(|h| h.ping_interval_ms)
                    .unwrap_or(default.heartbeat.ping_interval_ms),
                ping_timeout_ms: heartbeat
                    .as_ref()
                    .and_then(|h| h.ping_timeout_ms)
                    .unwrap_or(default.heartbeat.ping_timeout_ms),
            },
            logging: LoggingSettings {
                level: logging
                    .and_then(|l| l.level)
                    .unwrap_or(default.logging.level),
            },
        }
    }
}

/// Provides default values for `Settings`.
///
/// Two namespaces sharing one handler set, a two second restart delay and the
/// usual 25s/20s ping cadence.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            gateway: GatewaySettings {
                namespaces: vec!["/".to_string(), "/admin".to_string()],
                restart_event: "restart_server".to_string(),
                restart_delay_ms: 2000,
                rebind_attempts: 5,
                drain_grace_ms: 250,
                max_connections: 1000,
            },
            heartbeat: HeartbeatSettings {
                ping_interval_ms: 25000,
                ping_timeout_ms: 20000,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}
