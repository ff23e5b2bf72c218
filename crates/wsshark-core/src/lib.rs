//! wsshark core library for passive WebSocket session reconstruction.
//!
//! Packet sources (a replayed capture, or a live interface with the `live`
//! feature) feed the analysis layer. A dispatch hub hands every packet to a
//! handshake detector and to one tracker per recognized session; trackers
//! decode WebSocket frames with the protocol decoders (layout/reader/parser)
//! and archive their flow as pcapng when the session closes. The result is a
//! deterministic, serializable report.
//!
//! Invariants:
//! - Decoders are pure and never panic on arbitrary input.
//! - A packet is delivered to exactly the analyzers registered when it was
//!   pulled; registration changes apply between packets.
//! - Sessions in the report are ordered by start time, then endpoints.
//!
//! Version française (résumé):
//! Cette crate reconstruit passivement les sessions WebSocket : sources ->
//! hub de distribution -> détecteur de handshake et suivi par flux ->
//! décodage des trames -> archive pcapng et rapport déterministe.
//!
//! # Examples
//! ```no_run
//! use std::path::Path;
//!
//! use wsshark_core::{SnifferConfig, analyze_pcap_file};
//!
//! let report = analyze_pcap_file(Path::new("capture.pcapng"), &SnifferConfig::default())?;
//! println!("sessions: {}", report.sessions.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::{Deserialize, Serialize};

pub mod analysis;
pub mod archive;
pub mod protocols;
pub mod source;

pub use analysis::{
    AnalysisError, DEFAULT_ARCHIVE_DIR, DEFAULT_SNAPLEN, SnifferConfig, analyze_pcap_file,
    analyze_source,
};
pub use archive::{ArchiveError, ArchiveWriter, PcapngArchiveWriter, encode_pcapng};
pub use pcap_parser::Linktype;
pub use protocols::websocket::{Opcode, decode_frame, encode_frame};
#[cfg(feature = "live")]
pub use source::{LiveSource, list_interfaces};
pub use source::{MemorySource, PacketSource, PcapFileSource, RawPacket, SourceError};

/// Current report schema version.
pub const REPORT_VERSION: u32 = 1;
/// Default timestamp used when no capture time is available.
pub const DEFAULT_GENERATED_AT: &str = "1970-01-01T00:00:00Z";

/// Result of one analysis run.
///
/// # Examples
/// ```
/// use wsshark_core::make_stub_report;
///
/// let report = make_stub_report("capture.pcapng", 123);
/// assert_eq!(report.report_version, wsshark_core::REPORT_VERSION);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Report schema version (not the binary version).
    pub report_version: u32,
    /// Tool identification metadata.
    pub tool: ToolInfo,
    /// RFC3339 timestamp of the last captured packet.
    pub generated_at: String,

    /// Input capture metadata.
    pub input: InputInfo,

    /// Optional capture summary (may be empty when unavailable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_summary: Option<CaptureSummary>,
    /// Analyzer failures (archive writes) logged during dispatch.
    #[serde(default)]
    pub analyzer_errors: u64,
    /// One entry per tracked session, in stable order.
    pub sessions: Vec<SessionSummary>,
}

/// Tool metadata embedded in reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name (e.g., "wsshark").
    pub name: String,
    /// Tool version (semver).
    pub version: String,
}

/// Input metadata embedded in reports.
///
/// # Examples
/// ```
/// use wsshark_core::InputInfo;
///
/// let input = InputInfo {
///     path: "capture.pcapng".to_string(),
///     bytes: 1024,
/// };
/// assert_eq!(input.bytes, 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputInfo {
    /// Input path (or interface) as provided to the analyzer.
    pub path: String,
    /// Input size in bytes, 0 for live captures.
    pub bytes: u64,
}

/// Basic capture summary (timestamps may be absent).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSummary {
    /// Total packet count observed in the capture.
    pub packets_total: u64,
    /// Packets carrying a TCP segment.
    pub tcp_packets: u64,
    /// RFC3339 timestamp of the first packet (if known).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_start: Option<String>,
    /// RFC3339 timestamp of the last packet (if known).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_end: Option<String>,
}

/// Outcome of one tracked WebSocket session.
///
/// # Examples
/// ```
/// use wsshark_core::SessionSummary;
///
/// let session = SessionSummary {
///     client: "10.0.0.2:50000".to_string(),
///     server: "10.0.0.1:80".to_string(),
///     state: "streaming".to_string(),
///     ..SessionSummary::default()
/// };
/// assert!(session.archive.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Endpoint that sent the upgrade request.
    pub client: String,
    pub server: String,
    /// Last state reached (`closed` unless the input ended first).
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    /// Packets matched to the flow, including non-frame payloads.
    pub packets: u64,
    pub frames: u64,
    pub text_messages: u64,
    /// Invalid frames and non-UTF-8 text payloads.
    pub anomalies: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_reason: Option<String>,
    /// Status of a non-101 response to the upgrade request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refused_status: Option<u16>,
    /// Path of the written archive, absent for open sessions or failed writes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<String>,
}

/// Build a stub report with base fields filled and no sessions.
///
/// # Examples
/// ```
/// use wsshark_core::make_stub_report;
///
/// let report = make_stub_report("capture.pcapng", 123);
/// assert_eq!(report.report_version, wsshark_core::REPORT_VERSION);
/// assert!(report.sessions.is_empty());
/// ```
pub fn make_stub_report(input_path: &str, input_bytes: u64) -> Report {
    Report {
        report_version: REPORT_VERSION,
        tool: ToolInfo {
            name: "wsshark".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        generated_at: DEFAULT_GENERATED_AT.to_string(),
        input: InputInfo {
            path: input_path.to_string(),
            bytes: input_bytes,
        },
        capture_summary: None,
        analyzer_errors: 0,
        sessions: vec![],
    }
}
