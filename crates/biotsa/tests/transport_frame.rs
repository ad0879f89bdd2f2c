// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport frame codec and `Connection` send/receive, over a real
//! loopback socket. Requires `--features transport` (and `crypto` for the
//! encrypted-send test).

#![cfg(feature = "transport")]

use biotsa::transport::{encode_frame, pad_id, Connection, FrameFlags, FrameHeader, TIMEOUT_INHERIT};
use std::net::{TcpListener, TcpStream};

#[test]
fn encode_frame_then_decode_header_roundtrips() {
    let body = b"sample payload bytes";
    let framed = encode_frame(pad_id("HD01"), 3, 1, FrameFlags::empty(), body);

    let header_bytes: [u8; 16] = framed[..16].try_into().unwrap();
    let header = FrameHeader::decode(&header_bytes);
    assert_eq!(header.id, pad_id("HD01"));
    assert_eq!(header.total_bytes as usize, body.len());
    assert_eq!(&framed[16..], body);
}

#[test]
fn connection_send_receive_roundtrips_over_loopback() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let client = std::thread::spawn(move || {
        let stream = TcpStream::connect(addr).unwrap();
        let mut conn = Connection::new(stream, addr, TIMEOUT_INHERIT).unwrap();
        conn.send(pad_id("BIO1"), 9, 1, FrameFlags::empty(), b"matrix window payload", true).unwrap();
    });

    let (stream, peer) = listener.accept().unwrap();
    let mut server = Connection::new(stream, peer, TIMEOUT_INHERIT).unwrap();
    let (header, body) = server.receive(Some(&pad_id("BIO1"))).unwrap();
    client.join().unwrap();

    assert_eq!(header.frame_type, 9);
    assert_eq!(&body, b"matrix window payload");
}

#[cfg(feature = "crypto")]
#[test]
fn encrypted_send_is_recovered_after_decrypting_the_body() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let key = [0x11u8; 16];

    let client = std::thread::spawn(move || {
        let stream = TcpStream::connect(addr).unwrap();
        let mut conn = Connection::new(stream, addr, TIMEOUT_INHERIT).unwrap();
        conn.send_encrypted(pad_id("BIO1"), 1, 1, FrameFlags::empty(), b"secret segment bytes", &key, true).unwrap();
    });

    let (stream, peer) = listener.accept().unwrap();
    let mut server = Connection::new(stream, peer, TIMEOUT_INHERIT).unwrap();
    let (header, mut body) = server.receive(Some(&pad_id("BIO1"))).unwrap();
    client.join().unwrap();

    assert!(header.flags.contains(FrameFlags::ENCRYPTED));
    biotsa::crypto::decrypt_in_place(&key, &mut body);
    assert!(body.starts_with(b"secret segment bytes"));
}
