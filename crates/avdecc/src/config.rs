// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Engine configuration.
//!
//! Capacities and advertised identity, fixed at construction. Loadable
//! from TOML:
//!
//! ```toml
//! max_entities = 8
//! max_talkers = 2
//! max_listeners = 2
//! max_inflight_commands = 4
//! adp_valid_time = 10
//! vendor_id = 2267904
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed TOML or wrong field type.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Values out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Entity capability bits.
pub mod entity_caps {
    /// Firmware upgrade mode
    pub const EFU_MODE: u32 = 0x0000_0001;
    /// Address access supported
    pub const ADDRESS_ACCESS_SUPPORTED: u32 = 0x0000_0002;
    /// Gateway entity
    pub const GATEWAY_ENTITY: u32 = 0x0000_0004;
    /// Entity model supported
    pub const AEM_SUPPORTED: u32 = 0x0000_0008;
    /// Class A streams supported
    pub const CLASS_A_SUPPORTED: u32 = 0x0000_0100;
    /// Class B streams supported
    pub const CLASS_B_SUPPORTED: u32 = 0x0000_0200;
    /// gPTP supported
    pub const GPTP_SUPPORTED: u32 = 0x0000_0400;
}

/// Talker capability bits.
pub mod talker_caps {
    /// Talker implemented
    pub const IMPLEMENTED: u16 = 0x0001;
    /// Media clock source
    pub const MEDIA_CLOCK_SOURCE: u16 = 0x0800;
    /// Audio source
    pub const AUDIO_SOURCE: u16 = 0x4000;
}

/// Listener capability bits.
pub mod listener_caps {
    /// Listener implemented
    pub const IMPLEMENTED: u16 = 0x0001;
    /// Audio sink
    pub const AUDIO_SINK: u16 = 0x4000;
}

/// Controller capability bits.
pub mod controller_caps {
    /// Controller implemented
    pub const IMPLEMENTED: u32 = 0x0000_0001;
}

/// Largest value the 5-bit valid_time field carries.
pub const MAX_VALID_TIME: u8 = 31;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Remote entity table capacity.
    #[serde(default = "default_max_entities")]
    pub max_entities: usize,

    /// Talker stream sources.
    #[serde(default = "default_one")]
    pub max_talkers: u16,

    /// Listener stream sinks.
    #[serde(default = "default_one")]
    pub max_listeners: u16,

    /// Listener pairs per talker stream.
    #[serde(default = "default_listeners_per_talker")]
    pub max_listeners_per_talker: usize,

    /// Outstanding listener TX commands.
    #[serde(default = "default_max_inflight")]
    pub max_inflight_commands: usize,

    /// Advertised validity, in 2-second units.
    #[serde(default = "default_valid_time")]
    pub adp_valid_time: u8,

    /// Advertised vendor id.
    #[serde(default = "default_vendor_id")]
    pub vendor_id: u32,

    /// Advertised model id.
    #[serde(default = "default_model_id")]
    pub model_id: u32,

    /// Advertised entity capabilities.
    #[serde(default = "default_entity_capabilities")]
    pub entity_capabilities: u32,

    /// Advertised talker capabilities (sent as 0 without talkers).
    #[serde(default = "default_talker_capabilities")]
    pub talker_capabilities: u16,

    /// Advertised listener capabilities (sent as 0 without listeners).
    #[serde(default = "default_listener_capabilities")]
    pub listener_capabilities: u16,

    /// Advertised controller capabilities.
    #[serde(default = "default_controller_capabilities")]
    pub controller_capabilities: u32,

    /// Advertised boot id.
    #[serde(default)]
    pub boot_id: u32,

    /// CONNECT_TX_COMMAND response timeout (ms).
    #[serde(default = "default_connect_timeout")]
    pub connect_tx_timeout_ms: u64,

    /// DISCONNECT_TX_COMMAND response timeout (ms).
    #[serde(default = "default_disconnect_timeout")]
    pub disconnect_tx_timeout_ms: u64,
}

fn default_max_entities() -> usize {
    4
}

fn default_one() -> u16 {
    1
}

fn default_listeners_per_talker() -> usize {
    4
}

fn default_max_inflight() -> usize {
    2
}

fn default_valid_time() -> u8 {
    10
}

fn default_vendor_id() -> u32 {
    0x0022_9700
}

fn default_model_id() -> u32 {
    0x1234
}

fn default_entity_capabilities() -> u32 {
    entity_caps::EFU_MODE
        | entity_caps::ADDRESS_ACCESS_SUPPORTED
        | entity_caps::CLASS_A_SUPPORTED
        | entity_caps::GPTP_SUPPORTED
}

fn default_talker_capabilities() -> u16 {
    talker_caps::IMPLEMENTED | talker_caps::AUDIO_SOURCE | talker_caps::MEDIA_CLOCK_SOURCE
}

fn default_listener_capabilities() -> u16 {
    listener_caps::IMPLEMENTED | listener_caps::AUDIO_SINK
}

fn default_controller_capabilities() -> u32 {
    controller_caps::IMPLEMENTED
}

fn default_connect_timeout() -> u64 {
    2000
}

fn default_disconnect_timeout() -> u64 {
    200
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_entities: default_max_entities(),
            max_talkers: 1,
            max_listeners: 1,
            max_listeners_per_talker: default_listeners_per_talker(),
            max_inflight_commands: default_max_inflight(),
            adp_valid_time: default_valid_time(),
            vendor_id: default_vendor_id(),
            model_id: default_model_id(),
            entity_capabilities: default_entity_capabilities(),
            talker_capabilities: default_talker_capabilities(),
            listener_capabilities: default_listener_capabilities(),
            controller_capabilities: default_controller_capabilities(),
            boot_id: 0,
            connect_tx_timeout_ms: default_connect_timeout(),
            disconnect_tx_timeout_ms: default_disconnect_timeout(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entities == 0 {
            return Err(ConfigError::Invalid("max_entities must be at least 1".into()));
        }
        if self.max_listeners_per_talker == 0 {
            return Err(ConfigError::Invalid(
                "max_listeners_per_talker must be at least 1".into(),
            ));
        }
        if self.max_inflight_commands < usize::from(self.max_listeners) {
            return Err(ConfigError::Invalid(format!(
                "max_inflight_commands ({}) must be at least max_listeners ({})",
                self.max_inflight_commands, self.max_listeners
            )));
        }
        if self.adp_valid_time == 0 || self.adp_valid_time > MAX_VALID_TIME {
            return Err(ConfigError::Invalid(format!(
                "adp_valid_time must be 1..={} (got {})",
                MAX_VALID_TIME, self.adp_valid_time
            )));
        }
        if self.connect_tx_timeout_ms == 0 || self.disconnect_tx_timeout_ms == 0 {
            return Err(ConfigError::Invalid("TX command timeouts must be non-zero".into()));
        }
        Ok(())
    }

    /// Talker capabilities as advertised.
    pub fn advertised_talker_capabilities(&self) -> u16 {
        if self.max_talkers == 0 {
            0
        } else {
            self.talker_capabilities
        }
    }

    /// Listener capabilities as advertised.
    pub fn advertised_listener_capabilities(&self) -> u16 {
        if self.max_listeners == 0 {
            0
        } else {
            self.listener_capabilities
        }
    }
}
