// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SDP (discovery) PDU

use super::header::CommonHeader;
use super::BODY_SIZE;
use crate::error::{Error, Result};
use crate::types::{Guid, SdpMessageType, Subtype};

/// SDP PDU: common header plus 40-byte entity description
///
/// ```text
/// 0...3:  vendor_id
/// 4...7:  model_id
/// 8..11:  entity_capabilities
/// 12..13: talker_stream_sources
/// 14..15: talker_capabilities
/// 16..17: listener_stream_sinks
/// 18..19: listener_capabilities
/// 20..23: controller_capabilities
/// 24..27: boot_id
/// 28..39: reserved
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdpPdu {
    /// AVAILABLE / DEPARTING / DISCOVER
    pub message_type: SdpMessageType,
    /// Validity in 2-second units (AVAILABLE only)
    pub valid_time: u8,
    /// Announcing entity, or discover target
    pub entity_guid: Guid,
    /// Vendor id
    pub vendor_id: u32,
    /// Model id
    pub model_id: u32,
    /// Entity capability bits
    pub entity_capabilities: u32,
    /// Number of talker stream sources
    pub talker_stream_sources: u16,
    /// Talker capability bits
    pub talker_capabilities: u16,
    /// Number of listener stream sinks
    pub listener_stream_sinks: u16,
    /// Listener capability bits
    pub listener_capabilities: u16,
    /// Controller capability bits
    pub controller_capabilities: u32,
    /// Boot id
    pub boot_id: u32,
}

impl SdpPdu {
    /// Encoded size (header + body)
    pub const SIZE: usize = CommonHeader::SIZE + BODY_SIZE;

    /// ENTITY_DISCOVER for `target` (zero = everyone), capability block zeroed
    pub const fn discover(target: Guid) -> Self {
        Self {
            message_type: SdpMessageType::EntityDiscover,
            valid_time: 0,
            entity_guid: target,
            vendor_id: 0,
            model_id: 0,
            entity_capabilities: 0,
            talker_stream_sources: 0,
            talker_capabilities: 0,
            listener_stream_sinks: 0,
            listener_capabilities: 0,
            controller_capabilities: 0,
            boot_id: 0,
        }
    }

    /// Encode header and body
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.len() < Self::SIZE {
            return Err(Error::BufferTooSmall);
        }

        let valid_time = match self.message_type {
            SdpMessageType::EntityAvailable => self.valid_time,
            _ => 0,
        };
        let header = CommonHeader {
            cd: true,
            subtype: Subtype::SDP,
            sv: false,
            version: 0,
            message_type: self.message_type as u8,
            status: valid_time,
            data_length: BODY_SIZE as u16,
            id: self.entity_guid.0,
        };
        let off = header.encode(buf)?;

        let body = &mut buf[off..off + BODY_SIZE];
        body[0..4].copy_from_slice(&self.vendor_id.to_be_bytes());
        body[4..8].copy_from_slice(&self.model_id.to_be_bytes());
        body[8..12].copy_from_slice(&self.entity_capabilities.to_be_bytes());
        body[12..14].copy_from_slice(&self.talker_stream_sources.to_be_bytes());
        body[14..16].copy_from_slice(&self.talker_capabilities.to_be_bytes());
        body[16..18].copy_from_slice(&self.listener_stream_sinks.to_be_bytes());
        body[18..20].copy_from_slice(&self.listener_capabilities.to_be_bytes());
        body[20..24].copy_from_slice(&self.controller_capabilities.to_be_bytes());
        body[24..28].copy_from_slice(&self.boot_id.to_be_bytes());
        body[28..40].fill(0);

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

        let be32 = |i: usize| u32::from_be_bytes([body[i], body[i + 1], body[i + 2], body[i + 3]]);
        let be16 = |i: usize| u16::from_be_bytes([body[i], body[i + 1]]);

        Ok(Self {
            message_type: SdpMessageType::from_u8(header.message_type)?,
            valid_time: header.status,
            entity_guid: Guid(header.id),
            vendor_id: be32(0),
            model_id: be32(4),
            entity_capabilities: be32(8),
            talker_stream_sources: be16(12),
            talker_capabilities: be16(14),
            listener_stream_sinks: be16(16),
            listener_capabilities: be16(18),
            controller_capabilities: be32(20),
            boot_id: be32(24),
        })
    }

    /// Decode header and body
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let header = CommonHeader::decode(buf)?;
        if header.subtype != Subtype::SDP {
            return Err(Error::UnknownSubtype(header.subtype));
        }
        Self::decode_body(&header, &buf[CommonHeader::SIZE..])
    }
}
