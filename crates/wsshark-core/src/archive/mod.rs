//! Session archives.
//!
//! A closed session hands its packets to an [`ArchiveWriter`]. Archive names
//! are derived only from the flow endpoints and the first packet time, so
//! replaying the same capture produces the same file names.

pub mod error;
pub mod layout;
pub mod pcapng;

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use pcap_parser::Linktype;
use time::OffsetDateTime;

use crate::analysis::FlowKey;
use crate::source::RawPacket;

pub use error::ArchiveError;
pub use pcapng::{PcapngArchiveWriter, encode_pcapng};

/// Capture-file sink for completed sessions.
pub trait ArchiveWriter {
    /// Store `packets` (in order) under `name` and return where they went.
    fn write_archive(
        &self,
        name: &str,
        linktype: Linktype,
        snaplen: u32,
        packets: &[RawPacket],
    ) -> Result<PathBuf, ArchiveError>;
}

/// `websock__{clientIp}_{clientPort}__{serverIp}_{serverPort}__{timestamp}`.
///
/// IPv6 colons become `-` so the name is usable as a file name everywhere.
pub fn archive_name(flow: &FlowKey, first_ts_us: u64) -> String {
    format!(
        "{}__{}__{}__{}",
        layout::ARCHIVE_PREFIX,
        endpoint_component(flow.client),
        endpoint_component(flow.server),
        format_archive_timestamp(first_ts_us)
    )
}

fn endpoint_component(addr: SocketAddr) -> String {
    let ip = match addr.ip() {
        IpAddr::V4(ip) => ip.to_string(),
        IpAddr::V6(ip) => ip.to_string().replace(':', "-"),
    };
    format!("{}_{}", ip, addr.port())
}

/// UTC `YYYYMMDDTHHMMSS.ffffffZ`; raw microseconds if out of calendar range.
pub fn format_archive_timestamp(ts_us: u64) -> String {
    let nanos = ts_us as i128 * 1_000;
    match OffsetDateTime::from_unix_timestamp_nanos(nanos) {
        Ok(dt) => format!(
            "{:04}{:02}{:02}T{:02}{:02}{:02}.{:06}Z",
            dt.year(),
            u8::from(dt.month()),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second(),
            dt.microsecond()
        ),
        Err(_) => ts_us.to_string(),
    }
}
