use std::net::{IpAddr, SocketAddr};

use etherparse::{NetSlice, SlicedPacket, TransportSlice};
use pcap_parser::Linktype;

use crate::protocols::http::HttpMessage;

use super::error::TcpError;

/// TCP segment carried by a captured frame, with its HTTP interpretation.
#[derive(Debug, Clone)]
pub struct TcpSegment<'a> {
    pub src: SocketAddr,
    pub dst: SocketAddr,
    pub payload: &'a [u8],
    pub http: HttpMessage,
}

/// Parse a TCP segment from a link-layer frame.
///
/// Returns `Ok(None)` when the frame is well formed but not TCP (or the link
/// type is not one we slice).
pub fn parse_tcp_segment(
    linktype: Linktype,
    data: &[u8],
) -> Result<Option<TcpSegment<'_>>, TcpError> {
    let sliced = match linktype {
        Linktype::ETHERNET => {
            SlicedPacket::from_ethernet(data).map_err(|e| TcpError::Slice(e.to_string()))?
        }
        Linktype::RAW => SlicedPacket::from_ip(data).map_err(|e| TcpError::Slice(e.to_string()))?,
        _ => return Ok(None),
    };

    let net = sliced.net.ok_or(TcpError::MissingNetworkLayer)?;
    let tcp = match sliced.transport {
        Some(TransportSlice::Tcp(tcp)) => tcp,
        _ => return Ok(None),
    };

    let (src_ip, dst_ip) = match net {
        NetSlice::Ipv4(ref ipv4) => (
            IpAddr::V4(ipv4.header().source_addr()),
            IpAddr::V4(ipv4.header().destination_addr()),
        ),
        NetSlice::Ipv6(ref ipv6) => (
            IpAddr::V6(ipv6.header().source_addr()),
            IpAddr::V6(ipv6.header().destination_addr()),
        ),
    };

    let payload = tcp.payload();
    Ok(Some(TcpSegment {
        src: SocketAddr::new(src_ip, tcp.source_port()),
        dst: SocketAddr::new(dst_ip, tcp.destination_port()),
        payload,
        http: HttpMessage::from_payload(payload),
    }))
}
