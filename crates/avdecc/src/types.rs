// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Identifiers, addresses and protocol enumerations

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// 64-bit entity identifier
///
/// `Guid::ZERO` is the wildcard used by ENTITY_DISCOVER. It is never a
/// valid table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Guid(pub u64);

impl Guid {
    /// Wildcard / unset GUID
    pub const ZERO: Guid = Guid(0);

    /// Derive the local GUID from the interface MAC and a serial number.
    ///
    /// ```text
    /// 63..56  serial (low byte)
    /// 55..48  mac[5]
    /// 47..40  0
    /// 39..32  mac[4]
    /// 31..24  mac[3]
    /// 23..16  mac[2]
    /// 15..8   mac[1]
    ///  7..0   mac[0]
    /// ```
    pub const fn from_mac(mac: MacAddr, serial: u16) -> Self {
        let m = mac.0;
        Guid(
            ((serial as u64 & 0xff) << 56)
                | ((m[5] as u64) << 48)
                | ((m[4] as u64) << 32)
                | ((m[3] as u64) << 24)
                | ((m[2] as u64) << 16)
                | ((m[1] as u64) << 8)
                | (m[0] as u64),
        )
    }

    /// True for the wildcard value
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Network byte order
    pub const fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// From network byte order
    pub const fn from_be_bytes(bytes: [u8; 8]) -> Self {
        Guid(u64::from_be_bytes(bytes))
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

impl From<u64> for Guid {
    fn from(v: u64) -> Self {
        Guid(v)
    }
}

/// 48-bit Ethernet address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// All-zero address
    pub const ZERO: MacAddr = MacAddr([0; 6]);

    /// 1722.1 protocol multicast address used for SDP and SCM
    pub const AVDECC_MULTICAST: MacAddr = MacAddr([0x01, 0x50, 0x43, 0xff, 0x00, 0x00]);

    /// Create from raw octets
    pub const fn new(octets: [u8; 6]) -> Self {
        MacAddr(octets)
    }

    /// Raw octets
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Address as a big-endian 48-bit integer
    pub const fn to_u64(&self) -> u64 {
        let m = self.0;
        ((m[0] as u64) << 40)
            | ((m[1] as u64) << 32)
            | ((m[2] as u64) << 24)
            | ((m[3] as u64) << 16)
            | ((m[4] as u64) << 8)
            | (m[5] as u64)
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut octets = [0u8; 6];
        let mut parts = s.split([':', '-']);
        for octet in &mut octets {
            let part = parts
                .next()
                .ok_or(Error::InvalidParameter("MAC address needs 6 octets"))?;
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| Error::InvalidParameter("MAC octet is not hex"))?;
        }
        if parts.next().is_some() {
            return Err(Error::InvalidParameter("MAC address has more than 6 octets"));
        }
        Ok(MacAddr(octets))
    }
}

/// 1722.1 control subtypes (7-bit field, `cd` = 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Subtype {
    /// Simple Discovery Protocol
    Sdp,
    /// Control message class (stub)
    Sec,
    /// Stream Connection Management
    Scm,
}

impl Subtype {
    /// Wire value of the SDP subtype
    pub const SDP: u8 = 0x7a;
    /// Wire value of the SEC subtype
    pub const SEC: u8 = 0x7b;
    /// Wire value of the SCM subtype
    pub const SCM: u8 = 0x7c;

    /// Wire value
    pub const fn to_u8(self) -> u8 {
        match self {
            Subtype::Sdp => Self::SDP,
            Subtype::Sec => Self::SEC,
            Subtype::Scm => Self::SCM,
        }
    }

    /// Parse a 7-bit subtype
    pub fn from_u8(v: u8) -> Result<Self> {
        match v {
            Self::SDP => Ok(Subtype::Sdp),
            Self::SEC => Ok(Subtype::Sec),
            Self::SCM => Ok(Subtype::Scm),
            other => Err(Error::UnknownSubtype(other)),
        }
    }
}

/// SDP message types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SdpMessageType {
    /// Entity announces itself
    EntityAvailable = 0,
    /// Entity leaves the segment
    EntityDeparting = 1,
    /// Request for announcements
    EntityDiscover = 2,
}

impl SdpMessageType {
    /// Parse a 4-bit message type
    pub fn from_u8(v: u8) -> Result<Self> {
        match v {
            0 => Ok(Self::EntityAvailable),
            1 => Ok(Self::EntityDeparting),
            2 => Ok(Self::EntityDiscover),
            value => Err(Error::UnknownMessageType {
                subtype: Subtype::SDP,
                value,
            }),
        }
    }
}

/// SCM message types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScmMessageType {
    /// Listener -> talker: start sending to me
    ConnectTxCommand = 0,
    /// Talker -> listener
    ConnectTxResponse = 1,
    /// Listener -> talker: stop
    DisconnectTxCommand = 2,
    /// Talker -> listener
    DisconnectTxResponse = 3,
    /// Query talker stream state
    GetTxStateCommand = 4,
    /// Talker stream state
    GetTxStateResponse = 5,
    /// Controller -> listener: connect
    ConnectRxCommand = 6,
    /// Listener -> controller
    ConnectRxResponse = 7,
    /// Controller -> listener: disconnect
    DisconnectRxCommand = 8,
    /// Listener -> controller
    DisconnectRxResponse = 9,
    /// Query listener stream state
    GetRxStateCommand = 10,
    /// Listener stream state
    GetRxStateResponse = 11,
    /// Query one talker connection
    GetTxConnectionCommand = 12,
    /// Talker connection entry
    GetTxConnectionResponse = 13,
}

impl ScmMessageType {
    /// Parse a 4-bit message type
    pub fn from_u8(v: u8) -> Result<Self> {
        Ok(match v {
            0 => Self::ConnectTxCommand,
            1 => Self::ConnectTxResponse,
            2 => Self::DisconnectTxCommand,
            3 => Self::DisconnectTxResponse,
            4 => Self::GetTxStateCommand,
            5 => Self::GetTxStateResponse,
            6 => Self::ConnectRxCommand,
            7 => Self::ConnectRxResponse,
            8 => Self::DisconnectRxCommand,
            9 => Self::DisconnectRxResponse,
            10 => Self::GetRxStateCommand,
            11 => Self::GetRxStateResponse,
            12 => Self::GetTxConnectionCommand,
            13 => Self::GetTxConnectionResponse,
            value => {
                return Err(Error::UnknownMessageType {
                    subtype: Subtype::SCM,
                    value,
                })
            }
        })
    }

    /// Messages addressed to the talker side
    pub const fn is_talker_bound(self) -> bool {
        matches!(
            self,
            Self::ConnectTxCommand
                | Self::DisconnectTxCommand
                | Self::GetTxStateCommand
                | Self::GetTxConnectionCommand
        )
    }

    /// Messages addressed to the listener side
    pub const fn is_listener_bound(self) -> bool {
        matches!(
            self,
            Self::ConnectTxResponse
                | Self::DisconnectTxResponse
                | Self::ConnectRxCommand
                | Self::DisconnectRxCommand
                | Self::GetRxStateCommand
        )
    }
}

/// SCM status field (5 bits)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum StatusCode {
    /// Command succeeded
    #[default]
    Success,
    /// Listener unique id out of range
    ListenerUnknownId,
    /// Talker unique id out of range
    TalkerUnknownId,
    /// Talker could not allocate a destination MAC
    TalkerDestMacFail,
    /// Talker has no stream index
    TalkerNoStreamIndex,
    /// Talker has no bandwidth
    TalkerNoBandwidth,
    /// Talker already has its maximum number of listeners
    TalkerExclusive,
    /// Talker did not answer the listener in time
    ListenerTalkerTimeout,
    /// Listener sink already connected
    ListenerExclusive,
    /// Entity cannot service the request in its current state
    StateUnavailable,
    /// Listener sink not connected
    NotConnected,
    /// No connection at the requested index
    NoSuchConnection,
    /// Listener could not reach the talker
    CouldNotSendMessage,
    /// Default set
    DefaultSet,
    /// Default unset
    DefaultUnset,
    /// Command not supported
    NotSupported,
    /// Any other 5-bit value
    Other(u8),
}

impl StatusCode {
    /// Wire value
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::ListenerUnknownId => 1,
            Self::TalkerUnknownId => 2,
            Self::TalkerDestMacFail => 3,
            Self::TalkerNoStreamIndex => 4,
            Self::TalkerNoBandwidth => 5,
            Self::TalkerExclusive => 6,
            Self::ListenerTalkerTimeout => 7,
            Self::ListenerExclusive => 8,
            Self::StateUnavailable => 9,
            Self::NotConnected => 10,
            Self::NoSuchConnection => 11,
            Self::CouldNotSendMessage => 12,
            Self::DefaultSet => 13,
            Self::DefaultUnset => 14,
            Self::NotSupported => 31,
            Self::Other(v) => v & 0x1f,
        }
    }

    /// Parse a 5-bit status
    pub const fn from_u8(v: u8) -> Self {
        match v & 0x1f {
            0 => Self::Success,
            1 => Self::ListenerUnknownId,
            2 => Self::TalkerUnknownId,
            3 => Self::TalkerDestMacFail,
            4 => Self::TalkerNoStreamIndex,
            5 => Self::TalkerNoBandwidth,
            6 => Self::TalkerExclusive,
            7 => Self::ListenerTalkerTimeout,
            8 => Self::ListenerExclusive,
            9 => Self::StateUnavailable,
            10 => Self::NotConnected,
            11 => Self::NoSuchConnection,
            12 => Self::CouldNotSendMessage,
            13 => Self::DefaultSet,
            14 => Self::DefaultUnset,
            31 => Self::NotSupported,
            other => Self::Other(other),
        }
    }

    /// True for `Success`
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<u8> for StatusCode {
    fn from(v: u8) -> Self {
        Self::from_u8(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guid_from_mac() {
        let mac = MacAddr::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
        let guid = Guid::from_mac(mac, 0x42);
        assert_eq!(guid, Guid(0x4201_0000_0000_0002));
    }

    #[test]
    fn test_guid_serial_low_byte_only() {
        let mac = MacAddr::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
        assert_eq!(Guid::from_mac(mac, 0x1142), Guid::from_mac(mac, 0x0042));
        assert_eq!(Guid::from_mac(mac, 0).0 >> 56, 0);
    }

    #[test]
    fn test_guid_display() {
        assert_eq!(Guid(0x1234).to_string(), "0x0000000000001234");
    }

    #[test]
    fn test_mac_parse_and_display() {
        let mac: MacAddr = "02:00:00:00:00:01".parse().unwrap();
        assert_eq!(mac.octets(), [2, 0, 0, 0, 0, 1]);
        assert_eq!(mac.to_string(), "02:00:00:00:00:01");
        assert_eq!(mac.to_u64(), 0x0200_0000_0001);

        let dashed: MacAddr = "02-00-00-00-00-01".parse().unwrap();
        assert_eq!(dashed, mac);
    }

    #[test]
    fn test_mac_parse_invalid() {
        assert!("02:00:00".parse::<MacAddr>().is_err());
        assert!("02:00:00:00:00:01:03".parse::<MacAddr>().is_err());
        assert!("zz:00:00:00:00:01".parse::<MacAddr>().is_err());
    }

    #[test]
    fn test_subtype_values() {
        assert_eq!(Subtype::from_u8(0x7a), Ok(Subtype::Sdp));
        assert_eq!(Subtype::from_u8(0x7c), Ok(Subtype::Scm));
        assert_eq!(Subtype::from_u8(0x00), Err(Error::UnknownSubtype(0)));
    }

    #[test]
    fn test_scm_message_routing() {
        for v in 0..14u8 {
            let mt = ScmMessageType::from_u8(v).unwrap();
            // Responses toward controllers and TX state replies go nowhere locally
            assert!(!(mt.is_talker_bound() && mt.is_listener_bound()));
        }
        assert!(ScmMessageType::ConnectTxCommand.is_talker_bound());
        assert!(ScmMessageType::ConnectTxResponse.is_listener_bound());
        assert!(!ScmMessageType::ConnectRxResponse.is_listener_bound());
        assert!(ScmMessageType::from_u8(14).is_err());
    }

    #[test]
    fn test_status_code_values() {
        assert_eq!(StatusCode::from_u8(2), StatusCode::TalkerUnknownId);
        assert_eq!(StatusCode::ListenerExclusive.to_u8(), 8);
        assert_eq!(StatusCode::NotSupported.to_u8(), 31);
        assert_eq!(StatusCode::from_u8(20), StatusCode::Other(20));
        assert_eq!(StatusCode::Other(20).to_u8(), 20);
        assert!(StatusCode::default().is_success());
    }
}
