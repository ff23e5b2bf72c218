//! Per-flow WebSocket session tracking.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use pcap_parser::Linktype;
use tracing::{debug, info, trace, warn};

use crate::SessionSummary;
use crate::archive::{ArchiveWriter, archive_name};
use crate::protocols::http::HttpMessage;
use crate::protocols::websocket::{CloseInfo, Opcode, decode_frame, parse_close_payload};
use crate::source::RawPacket;

use super::flows::{Direction, FlowKey, format_endpoint};
use super::handshake::inspect;
use super::hub::{Analyzer, AnalyzerError, AnalyzerId, Distributor};
use super::journal::SessionJournal;
use super::packet::Packet;
use super::tcp::TcpSegment;
use super::ts_to_rfc3339;

/// Collaborators shared by the detector and every tracker it spawns.
#[derive(Clone)]
pub struct SessionEnv {
    pub archive: Rc<dyn ArchiveWriter>,
    pub journal: Rc<RefCell<SessionJournal>>,
    /// Maximum frame size recorded in archives.
    pub snaplen: u32,
}

impl SessionEnv {
    pub fn new(archive: Rc<dyn ArchiveWriter>, snaplen: u32) -> Self {
        Self::with_journal(archive, snaplen, SessionJournal::new())
    }

    pub fn with_journal(
        archive: Rc<dyn ArchiveWriter>,
        snaplen: u32,
        journal: SessionJournal,
    ) -> Self {
        Self {
            archive,
            journal: Rc::new(RefCell::new(journal)),
            snaplen,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingUpgradeRequest,
    AwaitingUpgradeConfirmation,
    Streaming,
    Closed,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::AwaitingUpgradeRequest => "awaiting_upgrade_request",
            SessionState::AwaitingUpgradeConfirmation => "awaiting_upgrade_confirmation",
            SessionState::Streaming => "streaming",
            SessionState::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct FrameCounters {
    frames: u64,
    text_messages: u64,
    anomalies: u64,
}

/// Follows one TCP flow from the upgrade request to the Close frame.
///
/// Every packet of the flow is kept, in arrival order, until the session
/// closes; the copies are then handed to the archive writer in one call.
pub struct SessionTracker {
    id: AnalyzerId,
    flow: FlowKey,
    state: SessionState,
    started_us: u64,
    request_seen: bool,
    /// Set between the trigger and the next matched packet, the only one
    /// that counts as a retransmitted request.
    expect_repeat: bool,
    packets: Vec<RawPacket>,
    packets_seen: u64,
    counters: FrameCounters,
    close_info: Option<CloseInfo>,
    refused_status: Option<u16>,
    archive: Option<String>,
    recorded: bool,
    env: SessionEnv,
}

impl SessionTracker {
    /// `id` must be the id this tracker will be registered under; it is used
    /// to deregister on close.
    pub fn new(id: AnalyzerId, flow: FlowKey, started_us: u64, env: SessionEnv) -> Self {
        env.journal.borrow_mut().open(flow);
        info!(%flow, tracker = %id, "tracking flow");
        Self {
            id,
            flow,
            state: SessionState::AwaitingUpgradeRequest,
            started_us,
            request_seen: false,
            expect_repeat: false,
            packets: Vec::new(),
            packets_seen: 0,
            counters: FrameCounters::default(),
            close_info: None,
            refused_status: None,
            archive: None,
            recorded: false,
            env,
        }
    }

    pub fn id(&self) -> AnalyzerId {
        self.id
    }

    pub fn flow(&self) -> FlowKey {
        self.flow
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Packets retained for the archive (empty once archived).
    pub fn packets(&self) -> &[RawPacket] {
        &self.packets
    }

    fn transition(&mut self, next: SessionState) {
        info!(flow = %self.flow, from = %self.state, to = %next, "session state changed");
        self.state = next;
    }

    fn on_handshake(
        &mut self,
        segment: &TcpSegment<'_>,
        direction: Direction,
        hub: &mut dyn Distributor,
    ) -> Result<(), AnalyzerError> {
        let expect_repeat = std::mem::take(&mut self.expect_repeat);
        match &segment.http {
            HttpMessage::Request(request) if inspect(request).is_some() => {
                if !self.request_seen {
                    self.request_seen = true;
                    self.expect_repeat = true;
                } else if expect_repeat && self.state == SessionState::AwaitingUpgradeRequest {
                    debug!(flow = %self.flow, "repeated upgrade request");
                    self.transition(SessionState::AwaitingUpgradeConfirmation);
                } else {
                    trace!(flow = %self.flow, "late upgrade request ignored");
                }
                Ok(())
            }
            HttpMessage::Response(response) if direction == Direction::ToClient => {
                if response.is_switching_protocols() {
                    info!(flow = %self.flow, "websocket handshake confirmed");
                    self.transition(SessionState::Streaming);
                    Ok(())
                } else {
                    warn!(
                        flow = %self.flow,
                        status = response.status_code,
                        reason = %response.reason,
                        "websocket upgrade refused"
                    );
                    self.refused_status = Some(response.status_code);
                    self.close(hub)
                }
            }
            _ => {
                trace!(flow = %self.flow, %direction, len = segment.payload.len(), "packet during handshake");
                Ok(())
            }
        }
    }

    fn on_stream(
        &mut self,
        segment: &TcpSegment<'_>,
        direction: Direction,
        hub: &mut dyn Distributor,
    ) -> Result<(), AnalyzerError> {
        let payload = segment.payload;
        if payload.len() < 2 {
            debug!(flow = %self.flow, %direction, len = payload.len(), "keep-alive");
            return Ok(());
        }

        let frame = match decode_frame(payload) {
            Ok(frame) => frame,
            Err(err) => {
                self.counters.anomalies += 1;
                warn!(flow = %self.flow, %direction, len = payload.len(), error = %err, "invalid websocket frame");
                return Ok(());
            }
        };
        self.counters.frames += 1;
        debug!(
            flow = %self.flow,
            %direction,
            fin = frame.is_final,
            masked = frame.masked,
            opcode = %frame.opcode,
            len = frame.payload_length,
            "websocket frame"
        );

        match frame.opcode {
            Opcode::Text => match String::from_utf8(frame.unmask()) {
                Ok(text) => {
                    self.counters.text_messages += 1;
                    info!(flow = %self.flow, %direction, %text, "text payload");
                }
                Err(err) => {
                    self.counters.anomalies += 1;
                    warn!(flow = %self.flow, %direction, error = %err, "text payload is not UTF-8");
                }
            },
            Opcode::Close => {
                let close = parse_close_payload(&frame.unmask());
                info!(
                    flow = %self.flow,
                    %direction,
                    code = ?close.code,
                    reason = %close.reason,
                    "close frame"
                );
                self.close_info = Some(close);
                return self.close(hub);
            }
            _ => {}
        }
        Ok(())
    }

    /// Enter `Closed`: leave the hub, then archive what was captured.
    fn close(&mut self, hub: &mut dyn Distributor) -> Result<(), AnalyzerError> {
        self.transition(SessionState::Closed);
        hub.deregister(self.id);
        self.env.journal.borrow_mut().release(&self.flow);

        let linktype = self
            .packets
            .first()
            .map_or(Linktype::ETHERNET, |packet| packet.linktype);
        let first_ts = self.packets.first().map_or(self.started_us, |p| p.ts_us);
        let name = archive_name(&self.flow, first_ts);
        let outcome = match self
            .env
            .archive
            .write_archive(&name, linktype, self.env.snaplen, &self.packets)
        {
            Ok(path) => {
                info!(flow = %self.flow, path = %path.display(), packets = self.packets.len(), "session archived");
                self.archive = Some(path.display().to_string());
                Ok(())
            }
            Err(source) => Err(AnalyzerError::Archive {
                flow: self.flow,
                source,
            }),
        };
        self.record();
        self.packets = Vec::new();
        outcome
    }

    fn record(&mut self) {
        if self.recorded {
            return;
        }
        self.recorded = true;
        let summary = self.summary();
        self.env.journal.borrow_mut().record(self.started_us, summary);
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            client: format_endpoint(self.flow.client.ip(), self.flow.client.port()),
            server: format_endpoint(self.flow.server.ip(), self.flow.server.port()),
            state: self.state.as_str().to_string(),
            started_at: ts_to_rfc3339(self.started_us),
            packets: self.packets_seen,
            frames: self.counters.frames,
            text_messages: self.counters.text_messages,
            anomalies: self.counters.anomalies,
            close_code: self.close_info.as_ref().and_then(|info| info.code),
            close_reason: self.close_info.as_ref().map(|info| info.reason.clone()),
            refused_status: self.refused_status,
            archive: self.archive.clone(),
        }
    }
}

impl Analyzer for SessionTracker {
    fn name(&self) -> &'static str {
        "session-tracker"
    }

    fn handle_packet(
        &mut self,
        packet: &Packet<'_>,
        hub: &mut dyn Distributor,
    ) -> Result<(), AnalyzerError> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        let Some(segment) = packet.tcp.as_ref() else {
            return Ok(());
        };
        let Some(direction) = self.flow.direction(segment.src, segment.dst) else {
            return Ok(());
        };
        self.packets.push(packet.raw.clone());
        self.packets_seen += 1;

        match self.state {
            SessionState::AwaitingUpgradeRequest | SessionState::AwaitingUpgradeConfirmation => {
                self.on_handshake(segment, direction, hub)
            }
            SessionState::Streaming => self.on_stream(segment, direction, hub),
            SessionState::Closed => Ok(()),
        }
    }

    fn finish(&mut self) {
        if self.state != SessionState::Closed {
            info!(flow = %self.flow, state = %self.state, packets = self.packets_seen, "session left open");
            self.record();
        }
    }
}
