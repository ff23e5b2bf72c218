//! PCAP/PCAPNG replay source.
//!
//! Replays a capture file as an ordered packet stream. File I/O and block
//! parsing live here; the analysis pipeline only sees [`RawPacket`]s.
//!
//! [`RawPacket`]: crate::source::RawPacket

pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

pub use parser::PcapFileSource;
