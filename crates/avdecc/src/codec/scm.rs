// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SCM (connection management) PDU

use super::header::CommonHeader;
use super::BODY_SIZE;
use crate::error::{Error, Result};
use crate::types::{Guid, MacAddr, ScmMessageType, StatusCode, Subtype};

/// SCM command or response
///
/// One record type serves both directions: responses echo the command with
/// `message_type` and `status` rewritten.
///
/// ```text
/// 0...7:  controller_guid
/// 8..15:  listener_guid
/// 16..23: talker_guid
/// 24..25: talker_unique_id
/// 26..27: listener_unique_id
/// 28..29: connection_count
/// 30..31: sequence_id
/// 32..33: flags
/// 34..39: stream_dest_mac
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScmPdu {
    /// Command or response kind
    pub message_type: ScmMessageType,
    /// Status (responses)
    pub status: StatusCode,
    /// Stream id (carried in the common header)
    pub stream_id: u64,
    /// Controller that started the exchange
    pub controller_guid: Guid,
    /// Listener entity
    pub listener_guid: Guid,
    /// Talker entity
    pub talker_guid: Guid,
    /// Talker stream source index
    pub talker_unique_id: u16,
    /// Listener stream sink index
    pub listener_unique_id: u16,
    /// Connection count, or connection index for GET_TX_CONNECTION
    pub connection_count: u16,
    /// Command/response correlation id
    pub sequence_id: u16,
    /// Flags
    pub flags: u16,
    /// Stream destination MAC
    pub stream_dest_mac: MacAddr,
}

impl ScmPdu {
    /// Encoded size (header + body)
    pub const SIZE: usize = CommonHeader::SIZE + BODY_SIZE;

    /// A command with every other field zeroed
    pub const fn command(message_type: ScmMessageType) -> Self {
        Self {
            message_type,
            status: StatusCode::Success,
            stream_id: 0,
            controller_guid: Guid::ZERO,
            listener_guid: Guid::ZERO,
            talker_guid: Guid::ZERO,
            talker_unique_id: 0,
            listener_unique_id: 0,
            connection_count: 0,
            sequence_id: 0,
            flags: 0,
            stream_dest_mac: MacAddr::ZERO,
        }
    }

    /// Copy of this record rewritten as `message_type` with `status`
    pub fn reply(&self, message_type: ScmMessageType, status: StatusCode) -> Self {
        let mut out = *self;
        out.message_type = message_type;
        out.status = status;
        out
    }

    /// Encode header and body
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.len() < Self::SIZE {
            return Err(Error::BufferTooSmall);
        }

        let header = CommonHeader {
            cd: true,
            subtype: Subtype::SCM,
            sv: false,
            version: 0,
            message_type: self.message_type as u8,
            status: self.status.to_u8(),
            data_length: BODY_SIZE as u16,
            id: self.stream_id,
        };
        let off = header.encode(buf)?;

        let body = &mut buf[off..off + BODY_SIZE];
        body[0..8].copy_from_slice(&self.controller_guid.to_be_bytes());
        body[8..16].copy_from_slice(&self.listener_guid.to_be_bytes());
        body[16..24].copy_from_slice(&self.talker_guid.to_be_bytes());
        body[24..26].copy_from_slice(&self.talker_unique_id.to_be_bytes());
        body[26..28].copy_from_slice(&self.listener_unique_id.to_be_bytes());
        body[28..30].copy_from_slice(&self.connection_count.to_be_bytes());
        body[30..32].copy_from_slice(&self.sequence_id.to_be_bytes());
        body[32..34].copy_from_slice(&self.flags.to_be_bytes());
        body[34..40].copy_from_slice(&self.stream_dest_mac.0);

        Ok(Self::SIZE)
    }

    /// Decode from an already parsed header and the bytes following it
    pub fn decode_body(header: &CommonHeader, body: &[u8]) -> Result<Self> {
        if body.len() < BODY_SIZE {
            return Err(Error::Truncated {
                needed: BODY_SIZE,
                got: body.len(),
            });
        }

        let guid = |i: usize| {
            let mut b = [0u8; 8];
            b.copy_from_slice(&body[i..i + 8]);
            Guid::from_be_bytes(b)
        };
        let be16 = |i: usize| u16::from_be_bytes([body[i], body[i + 1]]);
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&body[34..40]);

        Ok(Self {
            message_type: ScmMessageType::from_u8(header.message_type)?,
            status: StatusCode::from_u8(header.status),
            stream_id: header.id,
            controller_guid: guid(0),
            listener_guid: guid(8),
            talker_guid: guid(16),
            talker_unique_id: be16(24),
            listener_unique_id: be16(26),
            connection_count: be16(28),
            sequence_id: be16(30),
            flags: be16(32),
            stream_dest_mac: MacAddr(mac),
        })
    }

    /// Decode header and body
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let header = CommonHeader::decode(buf)?;
        if header.subtype != Subtype::SCM {
            return Err(Error::UnknownSubtype(header.subtype));
        }
        Self::decode_body(&header, &buf[CommonHeader::SIZE..])
    }
}
