// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ethernet and 1722.1 common headers

use crate::error::{Error, Result};
use crate::types::MacAddr;

/// IEEE 1722 EtherType
pub const AVTP_ETHERTYPE: u16 = 0x22f0;

/// 802.1Q tag protocol identifier
pub const VLAN_TPID: u16 = 0x8100;

/// Ethernet II header, optionally 802.1Q tagged
///
/// ```text
/// 0...5:  Destination MAC
/// 6..11:  Source MAC
/// 12..13: EtherType (or TPID 0x8100)
/// [14..15: TCI, 16..17: EtherType]   tagged only
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    /// Destination address
    pub dest: MacAddr,
    /// Source address
    pub src: MacAddr,
    /// 802.1Q tag control information, if tagged
    pub vlan_tci: Option<u16>,
    /// Payload EtherType
    pub ethertype: u16,
}

impl EthernetHeader {
    /// Untagged header size
    pub const SIZE: usize = 14;

    /// Tagged header size
    pub const TAGGED_SIZE: usize = 18;

    /// Untagged 1722 header
    pub const fn avtp(dest: MacAddr, src: MacAddr) -> Self {
        Self {
            dest,
            src,
            vlan_tci: None,
            ethertype: AVTP_ETHERTYPE,
        }
    }

    /// Encoded size of this header
    pub const fn len(&self) -> usize {
        if self.vlan_tci.is_some() {
            Self::TAGGED_SIZE
        } else {
            Self::SIZE
        }
    }

    /// Encode header, returning bytes written
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize> {
        let len = self.len();
        if buf.len() < len {
            return Err(Error::BufferTooSmall);
        }

        buf[0..6].copy_from_slice(&self.dest.0);
        buf[6..12].copy_from_slice(&self.src.0);
        match self.vlan_tci {
            Some(tci) => {
                buf[12..14].copy_from_slice(&VLAN_TPID.to_be_bytes());
                buf[14..16].copy_from_slice(&tci.to_be_bytes());
                buf[16..18].copy_from_slice(&self.ethertype.to_be_bytes());
            }
            None => buf[12..14].copy_from_slice(&self.ethertype.to_be_bytes()),
        }

        Ok(len)
    }

    /// Decode header, stripping a VLAN tag when present
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(Error::Truncated {
                needed: Self::SIZE,
                got: buf.len(),
            });
        }

        let mut dest = [0u8; 6];
        dest.copy_from_slice(&buf[0..6]);
        let mut src = [0u8; 6];
        src.copy_from_slice(&buf[6..12]);

        let outer = u16::from_be_bytes([buf[12], buf[13]]);
        let (vlan_tci, ethertype) = if outer == VLAN_TPID {
            if buf.len() < Self::TAGGED_SIZE {
                return Err(Error::Truncated {
                    needed: Self::TAGGED_SIZE,
                    got: buf.len(),
                });
            }
            (
                Some(u16::from_be_bytes([buf[14], buf[15]])),
                u16::from_be_bytes([buf[16], buf[17]]),
            )
        } else {
            (None, outer)
        };

        Ok(Self {
            dest: MacAddr(dest),
            src: MacAddr(src),
            vlan_tci,
            ethertype,
        })
    }
}

/// 1722.1 common control header (12 bytes)
///
/// ```text
/// byte 0:    cd(1) | subtype(7)
/// byte 1:    sv(1) | version(3) | message_type(4)
/// byte 2..3: valid_time/status(5) | control_data_length(11)
/// byte 4..11: entity GUID (SDP) / stream id (SCM)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommonHeader {
    /// Control/data flag, 1 for 1722.1
    pub cd: bool,
    /// 7-bit subtype
    pub subtype: u8,
    /// Stream id valid
    pub sv: bool,
    /// 3-bit version
    pub version: u8,
    /// 4-bit message type
    pub message_type: u8,
    /// 5-bit valid_time (SDP) or status (SCM)
    pub status: u8,
    /// 11-bit control data length
    pub data_length: u16,
    /// Entity GUID or stream id
    pub id: u64,
}

impl CommonHeader {
    /// Size of the common header in bytes
    pub const SIZE: usize = 12;

    /// Encode header to bytes
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.len() < Self::SIZE {
            return Err(Error::BufferTooSmall);
        }

        buf[0] = (u8::from(self.cd) << 7) | (self.subtype & 0x7f);
        buf[1] = (u8::from(self.sv) << 7) | ((self.version & 0x07) << 4) | (self.message_type & 0x0f);
        let word = ((self.status as u16 & 0x1f) << 11) | (self.data_length & 0x07ff);
        buf[2..4].copy_from_slice(&word.to_be_bytes());
        buf[4..12].copy_from_slice(&self.id.to_be_bytes());

        Ok(Self::SIZE)
    }

    /// Decode header from bytes
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(Error::Truncated {
                needed: Self::SIZE,
                got: buf.len(),
            });
        }

        let word = u16::from_be_bytes([buf[2], buf[3]]);
        let mut id = [0u8; 8];
        id.copy_from_slice(&buf[4..12]);

        Ok(Self {
            cd: buf[0] & 0x80 != 0,
            subtype: buf[0] & 0x7f,
            sv: buf[1] & 0x80 != 0,
            version: (buf[1] >> 4) & 0x07,
            message_type: buf[1] & 0x0f,
            status: (word >> 11) as u8,
            data_length: word & 0x07ff,
            id: u64::from_be_bytes(id),
        })
    }
}
