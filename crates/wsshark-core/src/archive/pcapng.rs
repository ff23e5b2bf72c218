use std::fs;
use std::path::{Path, PathBuf};

use pcap_parser::Linktype;

use crate::source::RawPacket;

use super::ArchiveWriter;
use super::error::ArchiveError;
use super::layout;

/// Writes each archive as a standalone pcapng file in one directory.
#[derive(Debug, Clone)]
pub struct PcapngArchiveWriter {
    dir: PathBuf,
}

impl PcapngArchiveWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArchiveWriter for PcapngArchiveWriter {
    fn write_archive(
        &self,
        name: &str,
        linktype: Linktype,
        snaplen: u32,
        packets: &[RawPacket],
    ) -> Result<PathBuf, ArchiveError> {
        let bytes = encode_pcapng(linktype, snaplen, packets)?;
        let path = self
            .dir
            .join(format!("{name}.{}", layout::ARCHIVE_EXTENSION));
        fs::create_dir_all(&self.dir).map_err(|source| ArchiveError::Io {
            path: self.dir.clone(),
            source,
        })?;
        fs::write(&path, bytes).map_err(|source| ArchiveError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

/// Serialize `packets` as a single-section, single-interface pcapng capture.
///
/// Frames longer than `snaplen` are cut to `snaplen` bytes; their original
/// length is preserved in the packet block.
pub fn encode_pcapng(
    linktype: Linktype,
    snaplen: u32,
    packets: &[RawPacket],
) -> Result<Vec<u8>, ArchiveError> {
    let mut output = Vec::new();
    output.extend_from_slice(&block(
        layout::BLOCK_SECTION_HEADER,
        &section_header_body(),
    ));
    output.extend_from_slice(&block(
        layout::BLOCK_INTERFACE_DESCRIPTION,
        &interface_desc_body(linktype, snaplen)?,
    ));
    for packet in packets {
        output.extend_from_slice(&block(
            layout::BLOCK_ENHANCED_PACKET,
            &enhanced_packet_body(packet, snaplen)?,
        ));
    }
    Ok(output)
}

fn block(block_type: u32, body: &[u8]) -> Vec<u8> {
    let total_len = (layout::BLOCK_OVERHEAD + body.len()) as u32;
    let mut block = Vec::with_capacity(total_len as usize);
    block.extend_from_slice(&block_type.to_be_bytes());
    block.extend_from_slice(&total_len.to_be_bytes());
    block.extend_from_slice(body);
    block.extend_from_slice(&total_len.to_be_bytes());
    block
}

fn section_header_body() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&layout::BYTE_ORDER_MAGIC.to_be_bytes());
    body.extend_from_slice(&layout::VERSION_MAJOR.to_be_bytes());
    body.extend_from_slice(&layout::VERSION_MINOR.to_be_bytes());
    body.extend_from_slice(&layout::SECTION_LENGTH_UNSPECIFIED.to_be_bytes());
    body
}

fn interface_desc_body(linktype: Linktype, snaplen: u32) -> Result<Vec<u8>, ArchiveError> {
    let linktype_code =
        u16::try_from(linktype.0).map_err(|_| ArchiveError::UnsupportedLinktype(linktype.0))?;
    let mut body = Vec::new();
    body.extend_from_slice(&linktype_code.to_be_bytes());
    body.extend_from_slice(&0u16.to_be_bytes());
    body.extend_from_slice(&snaplen.to_be_bytes());
    Ok(body)
}

fn enhanced_packet_body(packet: &RawPacket, snaplen: u32) -> Result<Vec<u8>, ArchiveError> {
    let data_len = u32::try_from(packet.data.len()).map_err(|_| ArchiveError::PacketTooLarge {
        len: packet.data.len(),
    })?;
    let cap_len = data_len.min(snaplen);
    let data = &packet.data[..cap_len as usize];
    let orig_len = packet.orig_len.max(data_len);
    let ts_high = (packet.ts_us >> 32) as u32;
    let ts_low = (packet.ts_us & 0xFFFF_FFFF) as u32;

    let mut body = Vec::with_capacity(20 + data.len() + layout::BLOCK_ALIGNMENT);
    body.extend_from_slice(&0u32.to_be_bytes());
    body.extend_from_slice(&ts_high.to_be_bytes());
    body.extend_from_slice(&ts_low.to_be_bytes());
    body.extend_from_slice(&cap_len.to_be_bytes());
    body.extend_from_slice(&orig_len.to_be_bytes());
    body.extend_from_slice(data);
    let pad_len = (layout::BLOCK_ALIGNMENT - (data.len() % layout::BLOCK_ALIGNMENT))
        % layout::BLOCK_ALIGNMENT;
    body.resize(body.len() + pad_len, 0);
    Ok(body)
}
