use tracing::debug;

use crate::protocols::http::HttpMessage;

use super::hub::{Analyzer, AnalyzerError, Distributor};
use super::packet::Packet;

/// Logs one line per TCP packet. Enabled with `SnifferConfig::log_traffic`.
#[derive(Debug, Default)]
pub struct TrafficLogger {
    seen: u64,
}

impl TrafficLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self) -> u64 {
        self.seen
    }
}

impl Analyzer for TrafficLogger {
    fn name(&self) -> &'static str {
        "traffic-logger"
    }

    fn handle_packet(
        &mut self,
        packet: &Packet<'_>,
        _hub: &mut dyn Distributor,
    ) -> Result<(), AnalyzerError> {
        let Some(segment) = packet.tcp.as_ref() else {
            return Ok(());
        };
        self.seen += 1;
        let http = match &segment.http {
            HttpMessage::Request(request) => format!("{} {}", request.method, request.target),
            HttpMessage::Response(response) => {
                format!("{} {}", response.status_code, response.reason)
            }
            HttpMessage::Invalid => String::new(),
        };
        debug!(
            ts = packet.raw.ts_seconds(),
            len = packet.raw.orig_len,
            src = %segment.src,
            dst = %segment.dst,
            payload = segment.payload.len(),
            %http,
            "tcp packet"
        );
        Ok(())
    }
}
