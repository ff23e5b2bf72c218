use std::io::{Read, Seek, SeekFrom};

use super::error::PcapSourceError;
use super::layout;
use pcap_parser::Linktype;

/// Read the magic bytes and rewind the reader to the start.
///
/// # Errors
/// Returns `PcapSourceError` when the reader cannot be read or rewound.
pub fn read_magic_and_rewind<R: Read + Seek>(reader: &mut R) -> Result<[u8; 4], PcapSourceError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    reader.seek(SeekFrom::Start(0))?;
    Ok(magic)
}

/// Check whether the magic bytes match PCAPNG.
pub fn is_pcapng_magic(magic: &[u8; 4]) -> bool {
    magic == &layout::PCAPNG_MAGIC
}

/// Resolve the linktype for a given interface id, defaulting to Ethernet.
///
/// # Examples
/// This helper is part of an internal module, so the example is marked as
/// text example.
/// ```text
/// use pcap_parser::Linktype;
///
/// let linktypes = [Linktype::RAW];
/// assert_eq!(linktype_for_interface(&linktypes, 0), Linktype::RAW);
/// assert_eq!(linktype_for_interface(&linktypes, 1), Linktype::ETHERNET);
/// ```
pub fn linktype_for_interface(linktypes: &[Linktype], if_id: u32) -> Linktype {
    linktypes
        .get(if_id as usize)
        .copied()
        .unwrap_or(Linktype::ETHERNET)
}

/// Strip block padding: packet blocks may carry more bytes than were captured.
pub fn captured_bytes(data: &[u8], caplen: u32) -> &[u8] {
    data.get(..caplen as usize).unwrap_or(data)
}

/// Convert a PCAPNG high/low timestamp (microsecond resolution) to microseconds.
pub fn pcapng_ts_to_micros(ts_high: u32, ts_low: u32) -> u64 {
    ((ts_high as u64) << 32) | (ts_low as u64)
}

/// Convert a legacy PCAP seconds/microseconds pair to microseconds.
pub fn legacy_ts_to_micros(ts_sec: u32, ts_usec: u32) -> u64 {
    (ts_sec as u64) * 1_000_000 + ts_usec as u64
}
