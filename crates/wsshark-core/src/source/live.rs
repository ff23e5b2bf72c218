//! Live capture source backed by libpcap.
//!
//! Only compiled with the `live` feature. The interface is opened in
//! promiscuous mode with a kernel-side `ip and tcp` filter, so everything the
//! pipeline sees is already IP/TCP traffic.

use ::pcap::{Active, Capture, Device};
use pcap_parser::Linktype;

use super::{PacketSource, RawPacket, SourceError};

const CAPTURE_FILTER: &str = "ip and tcp";
const READ_TIMEOUT_MS: i32 = 100;

pub struct LiveSource {
    cap: Capture<Active>,
    linktype: Linktype,
}

impl LiveSource {
    /// Open `interface` for capture, keeping at most `snaplen` bytes per frame.
    pub fn open(interface: &str, snaplen: u32) -> Result<Self, SourceError> {
        let snaplen = i32::try_from(snaplen).unwrap_or(i32::MAX);
        let mut cap = Capture::from_device(interface)
            .and_then(|cap| {
                cap.promisc(true)
                    .snaplen(snaplen)
                    .timeout(READ_TIMEOUT_MS)
                    .open()
            })
            .map_err(capture_error)?;
        cap.filter(CAPTURE_FILTER, true).map_err(capture_error)?;
        let linktype = Linktype(cap.get_datalink().0);
        Ok(Self { cap, linktype })
    }
}

impl PacketSource for LiveSource {
    fn next_packet(&mut self) -> Result<Option<RawPacket>, SourceError> {
        loop {
            match self.cap.next_packet() {
                Ok(packet) => {
                    let ts = packet.header.ts;
                    let ts_us = (ts.tv_sec as u64)
                        .saturating_mul(1_000_000)
                        .saturating_add(ts.tv_usec as u64);
                    return Ok(Some(RawPacket {
                        ts_us,
                        orig_len: packet.header.len,
                        linktype: self.linktype,
                        data: packet.data.to_vec(),
                    }));
                }
                Err(::pcap::Error::TimeoutExpired) => continue,
                Err(err) => return Err(capture_error(err)),
            }
        }
    }
}

/// Names and descriptions of the interfaces libpcap can open.
pub fn list_interfaces() -> Result<Vec<(String, Option<String>)>, SourceError> {
    let devices = Device::list().map_err(capture_error)?;
    Ok(devices
        .into_iter()
        .map(|device| (device.name, device.desc))
        .collect())
}

fn capture_error(err: ::pcap::Error) -> SourceError {
    SourceError::Capture(err.to_string())
}
