use std::collections::VecDeque;

use super::{PacketSource, RawPacket, SourceError};

/// Packet source backed by an in-memory queue.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    packets: VecDeque<RawPacket>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, packet: RawPacket) {
        self.packets.push_back(packet);
    }

    pub fn remaining(&self) -> usize {
        self.packets.len()
    }
}

impl FromIterator<RawPacket> for MemorySource {
    fn from_iter<I: IntoIterator<Item = RawPacket>>(iter: I) -> Self {
        Self {
            packets: iter.into_iter().collect(),
        }
    }
}

impl PacketSource for MemorySource {
    fn next_packet(&mut self) -> Result<Option<RawPacket>, SourceError> {
        Ok(self.packets.pop_front())
    }
}
