use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid {protocol} port: {value} (must be an integer between 0 and 65535)")]
    /// A `<proto>_PORT` override was not a valid port number.
    InvalidPort { protocol: Protocol, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
/// The invocation protocols a node can listen on.
pub enum Protocol {
    Coap,
    Http,
    Grpc,
}

impl Protocol {
    pub const ALL: [Protocol; 3] = [Protocol::Coap, Protocol::Http, Protocol::Grpc];

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Coap => "coap",
            Protocol::Http => "http",
            Protocol::Grpc => "grpc",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A node's persisted configuration file.
///
/// The file is optional; a missing or malformed file makes the caller fall
/// back to [NodeConfig::default].
pub struct NodeConfig {
    #[serde(rename = "ConfigPort")]
    /// The port of the management endpoint (control plane included).
    pub manager_port: u16,

    #[serde(rename = "RProxyConfigPort")]
    /// The port the invocation proxy takes configuration updates on.
    pub proxy_config_port: u16,

    #[serde(rename = "Ports")]
    pub ports: ProtocolPorts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// The default listen port per invocation protocol.
pub struct ProtocolPorts {
    pub coap: u16,
    pub http: u16,
    pub grpc: u16,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            manager_port: 8080,
            proxy_config_port: 8081,
            ports: ProtocolPorts {
                coap: 5683,
                http: 8000,
                grpc: 9000,
            },
        }
    }
}

impl NodeConfig {
    /// Loads the configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read(path)?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Loads the configuration file, falling back to the defaults if the file
    /// is absent or malformed.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(&path) {
            Ok(config) => {
                info!(path = %path.as_ref().display(), "Loaded node configuration.");
                config
            },
            Err(error) => {
                warn!(
                    path = %path.as_ref().display(),
                    error = %error,
                    "Could not load node configuration, using defaults."
                );
                Self::default()
            },
        }
    }

    /// The configured listen port per enabled protocol.
    pub fn protocol_ports(&self) -> BTreeMap<Protocol, u16> {
        BTreeMap::from([
            (Protocol::Coap, self.ports.coap),
            (Protocol::Http, self.ports.http),
            (Protocol::Grpc, self.ports.grpc),
        ])
    }
}

/// Applies `<proto>_PORT` process environment overrides to the port map.
///
/// See [apply_port_overrides_from] for the override semantics.
pub fn apply_port_overrides(ports: &mut BTreeMap<Protocol, u16>) -> Result<(), ConfigError> {
    apply_port_overrides_from(ports, |name| std::env::var(name).ok())
}

/// Applies per-protocol port overrides from the given lookup.
///
/// For each protocol the variable `<proto>_PORT` is consulted once, at
/// startup. An unset or empty value keeps the configured port; a negative
/// value disables the protocol entirely; a value above 65535 or a value that
/// is not an integer is rejected.
pub fn apply_port_overrides_from(
    ports: &mut BTreeMap<Protocol, u16>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    for protocol in Protocol::ALL {
        let raw = match lookup(&format!("{protocol}_PORT")) {
            Some(raw) if !raw.is_empty() => raw,
            _ => continue,
        };

        let value: i64 = raw.parse().map_err(|_| ConfigError::InvalidPort {
            protocol,
            value: raw.clone(),
        })?;

        if value < 0 {
            info!(protocol = %protocol, "Protocol disabled by port override.");
            ports.remove(&protocol);
            continue;
        }

        if value > u16::MAX as i64 {
            return Err(ConfigError::InvalidPort {
                protocol,
                value: raw,
            });
        }

        ports.insert(protocol, value as u16);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert_eq!(config.manager_port, 8080);
        assert_eq!(config.proxy_config_port, 8081);
        assert_eq!(
            config.protocol_ports(),
            BTreeMap::from([
                (Protocol::Coap, 5683),
                (Protocol::Http, 8000),
                (Protocol::Grpc, 9000),
            ])
        );
    }

    #[test]
    fn test_config_file_roundtrip() {
        let raw = r#"{
            "ConfigPort": 9090,
            "RProxyConfigPort": 9091,
            "Ports": { "coap": 1, "http": 2, "grpc": 3 }
        }"#;

        let config: NodeConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.manager_port, 9090);
        assert_eq!(config.ports.http, 2);
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let config = NodeConfig::load_or_default("/definitely/not/a/config.json");
        assert_eq!(config, NodeConfig::default());
    }

    #[test]
    fn test_port_override_replaces_port() {
        let mut ports = NodeConfig::default().protocol_ports();
        apply_port_overrides_from(&mut ports, lookup(&[("http_PORT", "8888")])).unwrap();
        assert_eq!(ports.get(&Protocol::Http), Some(&8888));
        assert_eq!(ports.get(&Protocol::Coap), Some(&5683));
    }

    #[test]
    fn test_negative_port_disables_protocol() {
        let mut ports = NodeConfig::default().protocol_ports();
        apply_port_overrides_from(&mut ports, lookup(&[("coap_PORT", "-1")])).unwrap();
        assert!(!ports.contains_key(&Protocol::Coap));
        assert_eq!(ports.len(), 2);
    }

    #[test]
    fn test_out_of_range_port_is_rejected() {
        let mut ports = NodeConfig::default().protocol_ports();
        let err =
            apply_port_overrides_from(&mut ports, lookup(&[("grpc_PORT", "70000")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidPort {
                protocol: Protocol::Grpc,
                ..
            }
        ));
    }

    #[test]
    fn test_non_numeric_port_is_rejected() {
        let mut ports = NodeConfig::default().protocol_ports();
        let err =
            apply_port_overrides_from(&mut ports, lookup(&[("http_PORT", "eight")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort { .. }));
    }

    #[test]
    fn test_empty_override_is_ignored() {
        let mut ports = NodeConfig::default().protocol_ports();
        apply_port_overrides_from(&mut ports, lookup(&[("http_PORT", "")])).unwrap();
        assert_eq!(ports.get(&Protocol::Http), Some(&8000));
    }
}
