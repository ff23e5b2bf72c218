//! Session reconstruction pipeline.
//!
//! A [`DispatchHub`] pulls packets from a source and fans each one out to the
//! long-lived [`HandshakeDetector`] and to every live [`SessionTracker`].
//! Trackers are spawned by the detector and remove themselves on close, so
//! membership changes while packets are flowing; the hub defers those
//! changes to cycle boundaries.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::info;

use crate::archive::{ArchiveWriter, PcapngArchiveWriter};
use crate::source::{PacketSource, PcapFileSource, SourceError};
use crate::{CaptureSummary, DEFAULT_GENERATED_AT, InputInfo, Report, make_stub_report};

mod flows;
mod handshake;
mod hub;
mod journal;
mod packet;
mod session;
mod tcp;
mod traffic;

#[cfg(test)]
mod fixtures;

pub use flows::{Direction, FlowKey, format_endpoint};
pub use handshake::{HandshakeDetector, HandshakeInfo, inspect};
pub use hub::{Analyzer, AnalyzerError, AnalyzerId, DispatchHub, DispatchStats, Distributor};
pub use journal::SessionJournal;
pub use packet::Packet;
pub use session::{SessionEnv, SessionState, SessionTracker};
pub use tcp::{TcpError, TcpSegment, parse_tcp_segment};
pub use traffic::TrafficLogger;

/// Snapshot length recorded in archives when none is configured.
pub const DEFAULT_SNAPLEN: u32 = 65536;
pub const DEFAULT_ARCHIVE_DIR: &str = "archives";

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

/// Settings for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnifferConfig {
    /// Directory receiving one `.pcapng` archive per closed session.
    pub archive_dir: PathBuf,
    /// Maximum frame size written to archives.
    pub snaplen: u32,
    /// Add a [`TrafficLogger`] to the hub.
    pub log_traffic: bool,
    /// Keep finished session summaries for the report. Off for live
    /// captures, which never reach the end of input.
    pub retain_sessions: bool,
}

impl Default for SnifferConfig {
    fn default() -> Self {
        Self {
            archive_dir: PathBuf::from(DEFAULT_ARCHIVE_DIR),
            snaplen: DEFAULT_SNAPLEN,
            log_traffic: false,
            retain_sessions: true,
        }
    }
}

pub fn analyze_pcap_file(path: &Path, config: &SnifferConfig) -> Result<Report, AnalysisError> {
    let source = PcapFileSource::open(path)?;
    let input = InputInfo {
        path: path.display().to_string(),
        bytes: path.metadata()?.len(),
    };
    let archive: Rc<dyn ArchiveWriter> = Rc::new(PcapngArchiveWriter::new(&config.archive_dir));
    analyze_source(input, source, config, archive)
}

/// Run the full pipeline over `source` until it is exhausted.
///
/// Sessions still open at the end are reported with their last state and are
/// not archived.
pub fn analyze_source<S: PacketSource>(
    input: InputInfo,
    source: S,
    config: &SnifferConfig,
    archive: Rc<dyn ArchiveWriter>,
) -> Result<Report, AnalysisError> {
    let journal = if config.retain_sessions {
        SessionJournal::new()
    } else {
        SessionJournal::discarding()
    };
    let env = SessionEnv::with_journal(archive, config.snaplen, journal);
    let mut hub = DispatchHub::new(source);
    hub.add(Box::new(HandshakeDetector::new(env.clone())));
    if config.log_traffic {
        hub.add(Box::new(TrafficLogger::new()));
    }

    info!(input = %input.path, "analysis started");
    let stats = hub.run()?;
    drop(hub);
    let journal = env.journal.take();
    let finished = journal.finished();
    let sessions = journal.into_sessions();
    info!(
        packets = stats.packets,
        sessions = finished,
        analyzer_errors = stats.analyzer_errors,
        "analysis finished"
    );

    let mut report = make_stub_report(&input.path, input.bytes);
    report.capture_summary = Some(CaptureSummary {
        packets_total: stats.packets,
        tcp_packets: stats.tcp_packets,
        time_start: stats.first_ts_us.and_then(ts_to_rfc3339),
        time_end: stats.last_ts_us.and_then(ts_to_rfc3339),
    });
    report.generated_at = report
        .capture_summary
        .as_ref()
        .and_then(|summary| summary.time_end.clone().or(summary.time_start.clone()))
        .unwrap_or_else(|| DEFAULT_GENERATED_AT.to_string());
    report.analyzer_errors = stats.analyzer_errors;
    report.sessions = sessions;
    Ok(report)
}

pub(crate) fn ts_to_rfc3339(ts_us: u64) -> Option<String> {
    let nanos = i128::from(ts_us) * 1_000;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::{SnifferConfig, analyze_source, ts_to_rfc3339};
    use crate::InputInfo;
    use crate::analysis::fixtures::{self, SWITCHING_PROTOCOLS, UPGRADE_REQUEST};
    use crate::analysis::session::tests::RecordingArchive;
    use crate::archive::ArchiveWriter;
    use crate::protocols::websocket::{Opcode, encode_frame};
    use crate::source::MemorySource;

    fn input() -> InputInfo {
        InputInfo {
            path: "memory".to_string(),
            bytes: 0,
        }
    }

    #[test]
    fn rfc3339_from_micros() {
        assert_eq!(
            ts_to_rfc3339(1_700_000_000_000_000).as_deref(),
            Some("2023-11-14T22:13:20Z")
        );
    }

    #[test]
    fn report_lists_closed_and_open_sessions() {
        let other = "192.168.1.11:40000".parse().unwrap();
        let source: MemorySource = vec![
            fixtures::tcp_packet(5_000_000, other, fixtures::server(), UPGRADE_REQUEST),
            fixtures::to_server(1_000_000, UPGRADE_REQUEST),
            fixtures::to_client(6_000_000, SWITCHING_PROTOCOLS),
            fixtures::to_server(
                7_000_000,
                &encode_frame(true, Opcode::Close, Some([1, 2, 3, 4]), &[0x03, 0xe8]),
            ),
        ]
        .into_iter()
        .collect();
        let recorder = RecordingArchive::new();
        let archive: Rc<dyn ArchiveWriter> = recorder.clone();
        let config = SnifferConfig {
            log_traffic: true,
            ..SnifferConfig::default()
        };

        let report = analyze_source(input(), source, &config, archive).unwrap();

        let summary = report.capture_summary.as_ref().unwrap();
        assert_eq!(summary.packets_total, 4);
        assert_eq!(summary.tcp_packets, 4);
        assert_eq!(report.generated_at, "1970-01-01T00:00:07Z");
        assert_eq!(report.analyzer_errors, 0);

        assert_eq!(report.sessions.len(), 2);
        assert_eq!(report.sessions[0].client, "192.168.1.10:50000");
        assert_eq!(report.sessions[0].state, "closed");
        assert_eq!(report.sessions[0].close_code, Some(1000));
        assert_eq!(report.sessions[1].client, "192.168.1.11:40000");
        assert_eq!(report.sessions[1].state, "awaiting_upgrade_request");
        assert_eq!(report.sessions[1].archive, None);
        assert_eq!(recorder.calls.borrow().len(), 1);
    }

    #[test]
    fn sessions_not_retained_are_still_archived() {
        let source: MemorySource = vec![
            fixtures::to_server(1, UPGRADE_REQUEST),
            fixtures::to_client(2, SWITCHING_PROTOCOLS),
            fixtures::to_server(3, &encode_frame(true, Opcode::Close, None, &[])),
        ]
        .into_iter()
        .collect();
        let recorder = RecordingArchive::new();
        let archive: Rc<dyn ArchiveWriter> = recorder.clone();
        let config = SnifferConfig {
            retain_sessions: false,
            ..SnifferConfig::default()
        };

        let report = analyze_source(input(), source, &config, archive).unwrap();

        assert!(report.sessions.is_empty());
        assert_eq!(recorder.calls.borrow().len(), 1);
    }

    #[test]
    fn empty_source_yields_empty_report() {
        let archive: Rc<dyn ArchiveWriter> = RecordingArchive::new();
        let report = analyze_source(
            input(),
            MemorySource::new(),
            &SnifferConfig::default(),
            archive,
        )
        .unwrap();
        assert!(report.sessions.is_empty());
        assert_eq!(report.generated_at, crate::DEFAULT_GENERATED_AT);
    }
}
