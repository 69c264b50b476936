// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Frame codec
//!
//! Explicit encode/decode between byte slices and typed PDUs. Nothing is
//! overlaid on network buffers; every multi-byte field is big-endian.
//!
//! ```text
//! +----------------+-----------------+--------------------+
//! | Ethernet (14/18)| Common hdr (12) | SDP / SCM body (40)|
//! +----------------+-----------------+--------------------+
//! ```

pub mod header;
pub mod scm;
pub mod sdp;

pub use header::{CommonHeader, EthernetHeader, AVTP_ETHERTYPE, VLAN_TPID};
pub use scm::ScmPdu;
pub use sdp::SdpPdu;

use crate::error::{Error, Result};
use crate::types::{Guid, MacAddr, Subtype};

/// Size of the fixed SDP/SCM body following the common header
pub const BODY_SIZE: usize = 40;

/// Size of an untagged outbound frame
pub const FRAME_SIZE: usize = EthernetHeader::SIZE + CommonHeader::SIZE + BODY_SIZE;

/// SEC (control message class) PDU
///
/// Only the common header is interpreted; the command set is not handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecPdu {
    /// Raw 4-bit message type
    pub message_type: u8,
    /// Target entity
    pub target: Guid,
}

/// Typed 1722.1 payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pdu {
    /// Discovery
    Sdp(SdpPdu),
    /// Connection management
    Scm(ScmPdu),
    /// Control message class
    Sec(SecPdu),
}

impl Pdu {
    /// Subtype of this PDU
    pub const fn subtype(&self) -> Subtype {
        match self {
            Pdu::Sdp(_) => Subtype::Sdp,
            Pdu::Scm(_) => Subtype::Scm,
            Pdu::Sec(_) => Subtype::Sec,
        }
    }

    fn encode(&self, buf: &mut [u8]) -> Result<usize> {
        match self {
            Pdu::Sdp(pdu) => pdu.encode(buf),
            Pdu::Scm(pdu) => pdu.encode(buf),
            Pdu::Sec(pdu) => {
                let header = CommonHeader {
                    cd: true,
                    subtype: Subtype::SEC,
                    message_type: pdu.message_type,
                    data_length: 0,
                    id: pdu.target.0,
                    ..CommonHeader::default()
                };
                header.encode(buf)
            }
        }
    }
}

/// Complete 1722.1 Ethernet frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Ethernet addressing (VLAN tag stripped on decode)
    pub ethernet: EthernetHeader,
    /// Payload
    pub pdu: Pdu,
}

impl Frame {
    /// Frame addressed to the 1722.1 multicast group
    pub const fn multicast(src: MacAddr, pdu: Pdu) -> Self {
        Self {
            ethernet: EthernetHeader::avtp(MacAddr::AVDECC_MULTICAST, src),
            pdu,
        }
    }

    /// Encode into `buf`, returning the frame length
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize> {
        let off = self.ethernet.encode(buf)?;
        let len = self.pdu.encode(&mut buf[off..])?;
        Ok(off + len)
    }

    /// Decode an inbound frame
    ///
    /// Fails for anything that is not a 1722.1 control PDU this engine
    /// understands. Callers treat every error as "not ours".
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let ethernet = EthernetHeader::decode(buf)?;
        if ethernet.ethertype != AVTP_ETHERTYPE {
            return Err(Error::WrongEtherType(ethernet.ethertype));
        }

        let payload = &buf[ethernet.len()..];
        let header = CommonHeader::decode(payload)?;
        if !header.cd {
            return Err(Error::NotControlData);
        }

        let body = &payload[CommonHeader::SIZE..];
        let pdu = match Subtype::from_u8(header.subtype)? {
            Subtype::Sdp => Pdu::Sdp(SdpPdu::decode_body(&header, body)?),
            Subtype::Scm => Pdu::Scm(ScmPdu::decode_body(&header, body)?),
            Subtype::Sec => Pdu::Sec(SecPdu {
                message_type: header.message_type,
                target: Guid(header.id),
            }),
        };

        Ok(Self { ethernet, pdu })
    }
}
