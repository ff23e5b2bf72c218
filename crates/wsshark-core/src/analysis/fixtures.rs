//! Frame builders shared by the analysis unit tests.

use std::net::{IpAddr, SocketAddr};

use etherparse::PacketBuilder;
use pcap_parser::Linktype;

use crate::source::RawPacket;

pub(crate) fn client() -> SocketAddr {
    "192.168.1.10:50000".parse().unwrap()
}

pub(crate) fn server() -> SocketAddr {
    "192.168.1.20:80".parse().unwrap()
}

pub(crate) fn tcp_packet(ts_us: u64, src: SocketAddr, dst: SocketAddr, payload: &[u8]) -> RawPacket {
    let (IpAddr::V4(src_ip), IpAddr::V4(dst_ip)) = (src.ip(), dst.ip()) else {
        panic!("fixtures only build IPv4 frames");
    };
    let builder = PacketBuilder::ethernet2([2, 0, 0, 0, 0, 1], [2, 0, 0, 0, 0, 2])
        .ipv4(src_ip.octets(), dst_ip.octets(), 64)
        .tcp(src.port(), dst.port(), 1, 64240);
    let mut data = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut data, payload).unwrap();
    RawPacket::new(ts_us, Linktype::ETHERNET, data)
}

pub(crate) fn to_server(ts_us: u64, payload: &[u8]) -> RawPacket {
    tcp_packet(ts_us, client(), server(), payload)
}

pub(crate) fn to_client(ts_us: u64, payload: &[u8]) -> RawPacket {
    tcp_packet(ts_us, server(), client(), payload)
}

pub(crate) const UPGRADE_REQUEST: &[u8] = b"GET /chat HTTP/1.1\r\n\
Host: server.example.com\r\n\
Upgrade: websocket\r\n\
Connection: Upgrade\r\n\
Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
Sec-WebSocket-Version: 13\r\n\r\n";

pub(crate) const SWITCHING_PROTOCOLS: &[u8] = b"HTTP/1.1 101 Switching Protocols\r\n\
Upgrade: websocket\r\n\
Connection: Upgrade\r\n\
Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\r\n";
