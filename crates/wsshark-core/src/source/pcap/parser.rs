use std::fs::File;
use std::path::Path;

use pcap_parser::{
    Block, LegacyPcapReader, Linktype, PcapBlockOwned, PcapNGReader, traits::PcapReaderIterator,
};

use crate::source::{PacketSource, RawPacket, SourceError};

use super::error::PcapSourceError;
use super::layout;
use super::reader::{
    captured_bytes, is_pcapng_magic, legacy_ts_to_micros, linktype_for_interface,
    pcapng_ts_to_micros, read_magic_and_rewind,
};

/// [`PacketSource`] replaying a `.pcap` or `.pcapng` file in file order.
pub struct PcapFileSource {
    inner: PcapReader,
}

enum PcapReader {
    Legacy {
        reader: LegacyPcapReader<File>,
        linktype: Option<Linktype>,
    },
    Ng {
        reader: PcapNGReader<File>,
        linktypes: Vec<Linktype>,
    },
}

impl PcapFileSource {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(SourceError::from)?;
        let inner = create_reader(file).map_err(SourceError::from)?;
        Ok(Self { inner })
    }
}

impl PacketSource for PcapFileSource {
    fn next_packet(&mut self) -> Result<Option<RawPacket>, SourceError> {
        next_packet(&mut self.inner).map_err(SourceError::from)
    }
}

fn create_reader(file: File) -> Result<PcapReader, PcapSourceError> {
    let mut file = file;
    let magic = read_magic_and_rewind(&mut file)?;

    if is_pcapng_magic(&magic) {
        let reader = PcapNGReader::new(layout::PCAP_READER_BUFFER_SIZE, file).map_err(|e| {
            PcapSourceError::Pcap {
                context: "pcapng reader init",
                message: e.to_string(),
            }
        })?;
        Ok(PcapReader::Ng {
            reader,
            linktypes: Vec::new(),
        })
    } else {
        let reader = LegacyPcapReader::new(layout::PCAP_READER_BUFFER_SIZE, file).map_err(|e| {
            PcapSourceError::Pcap {
                context: "pcap reader init",
                message: e.to_string(),
            }
        })?;
        Ok(PcapReader::Legacy {
            reader,
            linktype: None,
        })
    }
}

fn next_packet(reader: &mut PcapReader) -> Result<Option<RawPacket>, PcapSourceError> {
    loop {
        match reader {
            PcapReader::Legacy { reader, linktype } => match reader.next() {
                Ok((offset, block)) => {
                    let packet = match block {
                        PcapBlockOwned::LegacyHeader(header) => {
                            *linktype = Some(header.network);
                            None
                        }
                        PcapBlockOwned::Legacy(packet) => Some(RawPacket {
                            ts_us: legacy_ts_to_micros(packet.ts_sec, packet.ts_usec),
                            orig_len: packet.origlen,
                            linktype: linktype.unwrap_or(Linktype::ETHERNET),
                            data: captured_bytes(packet.data, packet.caplen).to_vec(),
                        }),
                        _ => None,
                    };
                    reader.consume(offset);
                    if packet.is_some() {
                        return Ok(packet);
                    }
                }
                Err(pcap_parser::PcapError::Eof) => return Ok(None),
                Err(pcap_parser::PcapError::UnexpectedEof) => {
                    return Err(PcapSourceError::Truncated {
                        context: "pcap reader next",
                    });
                }
                Err(pcap_parser::PcapError::Incomplete(_)) => {
                    reader.refill().map_err(|e| PcapSourceError::Pcap {
                        context: "pcap reader refill",
                        message: e.to_string(),
                    })?;
                }
                Err(e) => {
                    return Err(PcapSourceError::Pcap {
                        context: "pcap reader next",
                        message: e.to_string(),
                    });
                }
            },
            PcapReader::Ng { reader, linktypes } => match reader.next() {
                Ok((offset, block)) => {
                    let packet = match block {
                        PcapBlockOwned::NG(Block::SectionHeader(_)) => {
                            // Interface ids restart with every section.
                            linktypes.clear();
                            None
                        }
                        PcapBlockOwned::NG(Block::InterfaceDescription(intf)) => {
                            linktypes.push(intf.linktype);
                            None
                        }
                        PcapBlockOwned::NG(Block::EnhancedPacket(packet)) => Some(RawPacket {
                            ts_us: pcapng_ts_to_micros(packet.ts_high, packet.ts_low),
                            orig_len: packet.origlen,
                            linktype: linktype_for_interface(linktypes, packet.if_id),
                            data: captured_bytes(packet.data, packet.caplen).to_vec(),
                        }),
                        _ => None,
                    };
                    reader.consume(offset);
                    if packet.is_some() {
                        return Ok(packet);
                    }
                }
                Err(pcap_parser::PcapError::Eof) => return Ok(None),
                Err(pcap_parser::PcapError::UnexpectedEof) => {
                    return Err(PcapSourceError::Truncated {
                        context: "pcapng reader next",
                    });
                }
                Err(pcap_parser::PcapError::Incomplete(_)) => {
                    reader.refill().map_err(|e| PcapSourceError::Pcap {
                        context: "pcapng reader refill",
                        message: e.to_string(),
                    })?;
                }
                Err(e) => {
                    return Err(PcapSourceError::Pcap {
                        context: "pcapng reader next",
                        message: e.to_string(),
                    });
                }
            },
        }
    }
}
