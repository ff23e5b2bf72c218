use tracing::trace;

use crate::source::RawPacket;

use super::tcp::{TcpSegment, parse_tcp_segment};

/// A captured packet as handed to analyzers: the raw frame plus its TCP view.
///
/// The hub parses each frame once per dispatch cycle; every analyzer borrows
/// the same view and none may keep it past the call without copying `raw`.
#[derive(Debug, Clone)]
pub struct Packet<'a> {
    pub raw: &'a RawPacket,
    /// `None` when the frame has no valid IP/TCP headers.
    pub tcp: Option<TcpSegment<'a>>,
}

impl<'a> Packet<'a> {
    pub fn parse(raw: &'a RawPacket) -> Self {
        let tcp = match parse_tcp_segment(raw.linktype, &raw.data) {
            Ok(tcp) => tcp,
            Err(err) => {
                trace!(error = %err, len = raw.data.len(), "frame without TCP view");
                None
            }
        };
        Self { raw, tcp }
    }
}
