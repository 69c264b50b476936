// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Node configuration.
//!
//! ```toml
//! [node]
//! mac = "02:00:00:00:00:01"
//! serial = 1
//! group = "239.255.22.240"
//! port = 17220
//!
//! [engine]
//! max_entities = 16
//! ```

use avdecc::{EngineConfig, MacAddr};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::Path;
use thiserror::Error;

/// Node errors.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    #[error("Engine configuration: {0}")]
    Engine(#[from] avdecc::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Identity and segment settings.
    #[serde(default)]
    pub node: NodeSection,

    /// Engine capacities and advertised identity.
    #[serde(default)]
    pub engine: EngineConfig,
}

/// `[node]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSection {
    /// Local MAC address (colon or dash separated).
    #[serde(default = "default_mac")]
    pub mac: String,

    /// Serial number folded into the entity GUID.
    #[serde(default = "default_serial")]
    pub serial: u16,

    /// Multicast group carrying the tunnelled segment.
    #[serde(default = "default_group")]
    pub group: Ipv4Addr,

    /// UDP port of the tunnel.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Periodic interval (ms).
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Advertise at startup.
    #[serde(default = "default_true")]
    pub announce: bool,

    /// Destination MAC given to every talker stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub talker_dest_mac: Option<String>,
}

fn default_mac() -> String {
    "02:00:00:00:00:01".to_string()
}

fn default_serial() -> u16 {
    1
}

fn default_group() -> Ipv4Addr {
    Ipv4Addr::new(239, 255, 22, 240)
}

fn default_port() -> u16 {
    17220
}

fn default_interval_ms() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            mac: default_mac(),
            serial: default_serial(),
            group: default_group(),
            port: default_port(),
            interval_ms: default_interval_ms(),
            announce: true,
            talker_dest_mac: None,
        }
    }
}

impl NodeSection {
    /// Parsed local MAC.
    pub fn mac_addr(&self) -> Result<MacAddr, NodeError> {
        parse_mac(&self.mac)
    }

    /// Parsed talker destination MAC, if set.
    pub fn talker_dest(&self) -> Result<Option<MacAddr>, NodeError> {
        self.talker_dest_mac.as_deref().map(parse_mac).transpose()
    }
}

fn parse_mac(s: &str) -> Result<MacAddr, NodeError> {
    s.parse()
        .map_err(|e| NodeError::Invalid(format!("bad MAC address '{}': {}", s, e)))
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), NodeError> {
        self.node.mac_addr()?;
        self.node.talker_dest()?;
        if !self.node.group.is_multicast() {
            return Err(NodeError::Invalid(format!(
                "group {} is not a multicast address",
                self.node.group
            )));
        }
        if self.node.interval_ms == 0 {
            return Err(NodeError::Invalid("interval_ms must be non-zero".into()));
        }
        self.engine.validate()?;
        Ok(())
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, NodeError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
