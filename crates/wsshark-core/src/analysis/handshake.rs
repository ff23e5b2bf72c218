//! Recognition of WebSocket opening handshakes.

use std::fmt;

use tracing::{debug, info};

use crate::protocols::http::HttpRequest;

use super::flows::FlowKey;
use super::hub::{Analyzer, AnalyzerError, Distributor};
use super::packet::Packet;
use super::session::{SessionEnv, SessionTracker};

const HOST: &str = "Host";
const UPGRADE: &str = "Upgrade";
const CONNECTION: &str = "Connection";
const WEBSOCKET_KEY: &str = "Sec-WebSocket-Key";
const WEBSOCKET_VERSION: &str = "Sec-WebSocket-Version";

/// Header values of a recognized upgrade request, copied verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeInfo {
    pub host: String,
    pub upgrade: String,
    pub connection: String,
    pub key: String,
    pub version: String,
}

impl fmt::Display for HandshakeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "host={} upgrade={} connection={} key={} version={}",
            self.host, self.upgrade, self.connection, self.key, self.version
        )
    }
}

/// Classify `request` as a WebSocket upgrade.
///
/// Only presence matters: a `GET` carrying all five handshake headers
/// matches, whatever their values.
pub fn inspect(request: &HttpRequest) -> Option<HandshakeInfo> {
    if !request.is_get() {
        return None;
    }
    Some(HandshakeInfo {
        host: request.header(HOST)?.to_string(),
        upgrade: request.header(UPGRADE)?.to_string(),
        connection: request.header(CONNECTION)?.to_string(),
        key: request.header(WEBSOCKET_KEY)?.to_string(),
        version: request.header(WEBSOCKET_VERSION)?.to_string(),
    })
}

/// Long-lived analyzer that spawns one [`SessionTracker`] per new handshake.
pub struct HandshakeDetector {
    env: SessionEnv,
}

impl HandshakeDetector {
    pub fn new(env: SessionEnv) -> Self {
        Self { env }
    }
}

impl Analyzer for HandshakeDetector {
    fn name(&self) -> &'static str {
        "handshake-detector"
    }

    fn handle_packet(
        &mut self,
        packet: &Packet<'_>,
        hub: &mut dyn Distributor,
    ) -> Result<(), AnalyzerError> {
        let Some(segment) = packet.tcp.as_ref() else {
            return Ok(());
        };
        let Some(info) = segment.http.as_request().and_then(inspect) else {
            return Ok(());
        };

        let flow = FlowKey::new(segment.src, segment.dst);
        if self.env.journal.borrow().is_tracking(&flow) {
            debug!(%flow, "upgrade request on a flow already tracked");
            return Ok(());
        }
        info!(
            %flow,
            host = %info.host,
            key = %info.key,
            version = %info.version,
            "websocket handshake request"
        );

        let id = hub.allocate_id();
        let mut tracker = SessionTracker::new(id, flow, packet.raw.ts_us, self.env.clone());
        // The request itself is the tracker's first packet.
        let result = tracker.handle_packet(packet, hub);
        hub.register(id, Box::new(tracker));
        result
    }
}
