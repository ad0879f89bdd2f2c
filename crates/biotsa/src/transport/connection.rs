// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Connection state and the send/receive paths (spec §4.F).

use std::io::{Read, Write};
use std::net::{IpAddr, Ipv6Addr, SocketAddr, TcpStream};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::frame::{FrameFlags, FrameHeader};
use socket2::Socket;

/// Negative-one sentinel: inherit the socket's existing timeout rather than
/// setting one explicitly (spec §4.F "Timeout negative-one on allocation
/// means inherit").
pub const TIMEOUT_INHERIT: i64 = -1;

/// A connection's mutable buffer/socket state (spec §4.F "State").
pub struct Connection {
    pub buffer: Vec<u8>,
    pub addr: SocketAddr,
    pub timeout_seconds: i64,
    stream: TcpStream,
}

impl Connection {
    pub fn new(stream: TcpStream, addr: SocketAddr, timeout_seconds: i64) -> Result<Self> {
        if timeout_seconds != TIMEOUT_INHERIT {
            stream
                .set_read_timeout(Some(Duration::from_secs(timeout_seconds.max(0) as u64)))
                .map_err(Error::SocketFailure)?;
        }
        // Frames are already length-prefixed and sent whole, so Nagle's
        // algorithm only adds latency here; disable it via socket2 since
        // std::net has no portable accessor for TCP_NODELAY pre-1.9. The
        // Socket wraps a dup'd fd, so dropping it doesn't touch `stream`.
        let dup = Socket::from(stream.try_clone().map_err(Error::SocketFailure)?);
        dup.set_nodelay(true).map_err(Error::SocketFailure)?;
        Ok(Self { buffer: Vec::new(), addr: canonicalize(addr), timeout_seconds, stream })
    }

    /// Send path (spec §4.F): write header + body, optionally close
    /// afterward. `body` is sent as-is; see [`Connection::send_encrypted`]
    /// for the AES-ECB path.
    pub fn send(&mut self, id: [u8; 4], frame_type: u8, version: u8, mut flags: FrameFlags, body: &[u8], close_after: bool) -> Result<()> {
        if close_after {
            flags = flags.with(FrameFlags::CLOSE_AFTER_SEND);
        }
        let header = FrameHeader { id, frame_type, version, flags, total_bytes: body.len() as i64 };
        self.stream.write_all(&header.encode()).map_err(map_write_err)?;
        self.stream.write_all(body).map_err(map_write_err)?;
        if close_after {
            let _ = self.stream.shutdown(std::net::Shutdown::Both);
        }
        Ok(())
    }

    /// Send path with the body AES-ECB-encrypted in place before the write
    /// (spec §4.F "optionally AES-ECB-encrypt body in place").
    #[cfg(feature = "crypto")]
    pub fn send_encrypted(&mut self, id: [u8; 4], frame_type: u8, version: u8, flags: FrameFlags, body: &[u8], key: &[u8; 16], close_after: bool) -> Result<()> {
        let mut padded = body.to_vec();
        crate::crypto::pad_to_block(&mut padded);
        crate::crypto::encrypt_in_place(key, &mut padded);
        self.send(id, frame_type, version, flags.with(FrameFlags::ENCRYPTED), &padded, close_after)
    }

    /// Receive path (spec §4.F): read exactly 16 bytes, validate the ID if
    /// supplied, reallocate the body buffer if the declared size exceeds
    /// capacity, then read until `total_bytes` is satisfied or the peer
    /// closes.
    pub fn receive(&mut self, expected_id: Option<&[u8; 4]>) -> Result<(FrameHeader, Vec<u8>)> {
        let mut header_buf = [0u8; crate::config::TRANSMISSION_HEADER_BYTES];
        self.stream.read_exact(&mut header_buf).map_err(map_read_err)?;
        let header = FrameHeader::decode(&header_buf);
        header.check_id(expected_id)?;

        let total = header.total_bytes.max(0) as usize;
        if self.buffer.capacity() < total {
            self.buffer.reserve(total - self.buffer.len());
        }
        self.buffer.clear();
        self.buffer.resize(total, 0);

        let mut read = 0;
        while read < total {
            let n = self.stream.read(&mut self.buffer[read..]).map_err(map_read_err)?;
            if n == 0 {
                return Err(Error::SocketClosed);
            }
            read += n;
        }
        Ok((header, self.buffer.clone()))
    }
}

fn map_write_err(e: std::io::Error) -> Error {
    log::debug!("transport write failed: {e}");
    match e.kind() {
        std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::ConnectionReset => Error::SocketClosed,
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => Error::Timeout,
        _ => Error::SocketFailure(e),
    }
}

fn map_read_err(e: std::io::Error) -> Error {
    log::debug!("transport read failed: {e}");
    match e.kind() {
        std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::ConnectionReset => Error::SocketClosed,
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => Error::Timeout,
        _ => Error::SocketFailure(e),
    }
}

/// Strip the `::ffff:` IPv4-mapped IPv6 prefix from an endpoint address
/// (spec §4.F "Endpoint address canonicalisation").
pub fn canonicalize(addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        IpAddr::V6(v6) => match to_mapped_ipv4(&v6) {
            Some(v4) => SocketAddr::new(IpAddr::V4(v4), addr.port()),
            None => addr,
        },
        IpAddr::V4(_) => addr,
    }
}

fn to_mapped_ipv4(v6: &Ipv6Addr) -> Option<std::net::Ipv4Addr> {
    let segments = v6.segments();
    if segments[0..5] == [0, 0, 0, 0, 0] && segments[5] == 0xffff {
        Some(std::net::Ipv4Addr::new(
            (segments[6] >> 8) as u8,
            (segments[6] & 0xff) as u8,
            (segments[7] >> 8) as u8,
            (segments[7] & 0xff) as u8,
        ))
    } else {
        None
    }
}
