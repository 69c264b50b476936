// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Layer-2 segment tunnelled over UDP multicast
//!
//! Every datagram is one complete Ethernet frame. All nodes joined to the
//! same group and port see each other's frames, including nodes on the
//! same host (multicast loopback is on).

use avdecc::{MacAddr, MacChannel};
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};

/// Largest tagged Ethernet frame
const MAX_FRAME: usize = 1522;

/// UDP multicast socket standing in for a raw Ethernet interface
pub struct UdpTunnel {
    socket: UdpSocket,
    dest: SocketAddrV4,
    local_mac: MacAddr,
    buf: [u8; MAX_FRAME],
}

impl UdpTunnel {
    /// Bind `port`, join `group` and switch to non-blocking receive
    pub fn open(group: Ipv4Addr, port: u16, local_mac: MacAddr) -> io::Result<Self> {
        let socket2 = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket2.set_reuse_address(true)?;

        let bind_addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
        socket2.bind(&bind_addr.into())?;

        let socket: UdpSocket = socket2.into();
        socket.join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)?;
        socket.set_multicast_loop_v4(true)?;
        socket.set_multicast_ttl_v4(1)?;
        socket.set_nonblocking(true)?;

        tracing::debug!("[tunnel] joined {}:{} as {}", group, port, local_mac);

        Ok(Self {
            socket,
            dest: SocketAddrV4::new(group, port),
            local_mac,
            buf: [0u8; MAX_FRAME],
        })
    }

    /// Next frame sent by another node, or `None` when nothing is queued
    pub fn recv(&mut self) -> io::Result<Option<&[u8]>> {
        loop {
            let len = match self.socket.recv_from(&mut self.buf) {
                Ok((len, _)) => len,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if !is_own_frame(&self.buf[..len], self.local_mac) {
                return Ok(Some(&self.buf[..len]));
            }
        }
    }
}

impl MacChannel for UdpTunnel {
    fn transmit(&mut self, frame: &[u8]) -> avdecc::Result<()> {
        self.socket.send_to(frame, self.dest)?;
        Ok(())
    }
}

/// True if `frame`'s source address is `mac`
pub fn is_own_frame(frame: &[u8], mac: MacAddr) -> bool {
    frame.len() >= 12 && frame[6..12] == mac.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_frame_filter() {
        let mac = MacAddr([2, 0, 0, 0, 0, 1]);
        let mut frame = [0u8; 66];
        frame[6..12].copy_from_slice(&mac.0);
        assert!(is_own_frame(&frame, mac));
        assert!(!is_own_frame(&frame, MacAddr([2, 0, 0, 0, 0, 2])));
        assert!(!is_own_frame(&frame[..8], mac));
    }
}
