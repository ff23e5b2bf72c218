#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use etherparse::PacketBuilder;
use wsshark_core::{Linktype, Opcode, RawPacket, encode_frame, encode_pcapng};

pub const CLIENT: ([u8; 4], u16) = ([10, 0, 0, 2], 50123);
pub const SERVER: ([u8; 4], u16) = ([10, 0, 0, 1], 8080);
pub const MASK: [u8; 4] = [0xa1, 0xb2, 0xc3, 0xd4];

pub const UPGRADE_REQUEST: &[u8] = b"GET /socket HTTP/1.1\r\n\
Host: 10.0.0.1:8080\r\n\
Upgrade: websocket\r\n\
Connection: Upgrade\r\n\
Sec-WebSocket-Key: x3JJHMbDL1EzLkh9GBhXDw==\r\n\
Sec-WebSocket-Version: 13\r\n\r\n";

pub const SWITCHING_PROTOCOLS: &[u8] = b"HTTP/1.1 101 Switching Protocols\r\n\
Upgrade: websocket\r\n\
Connection: Upgrade\r\n\
Sec-WebSocket-Accept: HSmrc0sMlYUkAGmm5OPpG2HaGWk=\r\n\r\n";

pub fn ethernet_tcp(ts_us: u64, from: ([u8; 4], u16), to: ([u8; 4], u16), payload: &[u8]) -> RawPacket {
    let builder = PacketBuilder::ethernet2([2, 0, 0, 0, 0, 2], [2, 0, 0, 0, 0, 1])
        .ipv4(from.0, to.0, 64)
        .tcp(from.1, to.1, 1000, 65535);
    let mut data = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut data, payload).unwrap();
    RawPacket::new(ts_us, Linktype::ETHERNET, data)
}

/// GET, 101, masked "hi", server "hello", masked Close 1000.
pub fn closed_session(start_us: u64) -> Vec<RawPacket> {
    vec![
        ethernet_tcp(start_us, CLIENT, SERVER, UPGRADE_REQUEST),
        ethernet_tcp(start_us + 1_000, SERVER, CLIENT, SWITCHING_PROTOCOLS),
        ethernet_tcp(
            start_us + 2_000,
            CLIENT,
            SERVER,
            &encode_frame(true, Opcode::Text, Some(MASK), b"hi"),
        ),
        ethernet_tcp(
            start_us + 3_000,
            SERVER,
            CLIENT,
            &encode_frame(true, Opcode::Text, None, b"hello"),
        ),
        ethernet_tcp(
            start_us + 4_000,
            CLIENT,
            SERVER,
            &encode_frame(true, Opcode::Close, Some(MASK), &[0x03, 0xe8]),
        ),
    ]
}

pub fn write_capture(dir: &Path, name: &str, packets: &[RawPacket]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, encode_pcapng(Linktype::ETHERNET, 65535, packets).unwrap()).unwrap();
    path
}
