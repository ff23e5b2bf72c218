mod memory;
mod pcap;
#[cfg(feature = "live")]
mod live;

pub use self::memory::MemorySource;
pub use self::pcap::PcapFileSource;
#[cfg(feature = "live")]
pub use self::live::{LiveSource, list_interfaces};

use pcap_parser::Linktype;
use thiserror::Error;

/// One captured link-layer frame, as delivered by a [`PacketSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    /// Capture time in microseconds since the Unix epoch.
    pub ts_us: u64,
    /// Length of the frame on the wire (may exceed `data.len()`).
    pub orig_len: u32,
    pub linktype: Linktype,
    pub data: Vec<u8>,
}

impl RawPacket {
    /// Build a packet whose original length equals the captured length.
    pub fn new(ts_us: u64, linktype: Linktype, data: Vec<u8>) -> Self {
        let orig_len = u32::try_from(data.len()).unwrap_or(u32::MAX);
        Self {
            ts_us,
            orig_len,
            linktype,
            data,
        }
    }

    pub fn ts_seconds(&self) -> f64 {
        self.ts_us as f64 * 1e-6
    }
}

/// Ordered producer of captured packets.
///
/// `next_packet` blocks until a packet is available. `Ok(None)` means the
/// source is exhausted (end of a replayed capture); a live source never
/// returns it.
pub trait PacketSource {
    fn next_packet(&mut self) -> Result<Option<RawPacket>, SourceError>;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PCAP parse error: {0}")]
    Pcap(String),
    #[error("live capture error: {0}")]
    Capture(String),
}

impl From<self::pcap::error::PcapSourceError> for SourceError {
    fn from(value: self::pcap::error::PcapSourceError) -> Self {
        match value {
            self::pcap::error::PcapSourceError::Io(err) => SourceError::Io(err),
            self::pcap::error::PcapSourceError::Truncated { context } => {
                SourceError::Pcap(format!("{context}: capture truncated inside a block"))
            }
            self::pcap::error::PcapSourceError::Pcap { context, message } => {
                SourceError::Pcap(format!("{context}: {message}"))
            }
        }
    }
}
