//! Packet fan-out to a changing set of analyzers.
//!
//! Analyzers never touch the hub's analyzer list directly. During a dispatch
//! they get a [`Distributor`] handle that only queues membership changes;
//! the queue is applied between cycles, so the set of analyzers that sees a
//! packet is fixed when the packet is pulled.

use std::collections::HashSet;
use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};

use crate::archive::ArchiveError;
use crate::source::{PacketSource, SourceError};

use super::flows::FlowKey;
use super::packet::Packet;

/// Handle identifying a registered analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnalyzerId(pub(crate) u64);

impl fmt::Display for AnalyzerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("archiving session {flow} failed: {source}")]
    Archive {
        flow: FlowKey,
        #[source]
        source: ArchiveError,
    },
}

/// Something that consumes every dispatched packet.
///
/// Packets are shared with the other analyzers of the same cycle and must be
/// treated as read-only.
pub trait Analyzer {
    fn name(&self) -> &'static str;

    fn handle_packet(
        &mut self,
        packet: &Packet<'_>,
        hub: &mut dyn Distributor,
    ) -> Result<(), AnalyzerError>;

    /// Called once when the packet source is exhausted.
    fn finish(&mut self) {}
}

/// Membership operations available to analyzers while they handle a packet.
///
/// Changes take effect before the next packet is dispatched, never during
/// the current one.
pub trait Distributor {
    /// Reserve an id for an analyzer that will be registered later, so it can
    /// refer to itself before the hub owns it.
    fn allocate_id(&mut self) -> AnalyzerId;

    fn register(&mut self, id: AnalyzerId, analyzer: Box<dyn Analyzer>);

    /// Ids are never reused, so this also cancels a registration of `id`
    /// queued in the same cycle, whichever of the two was queued first.
    fn deregister(&mut self, id: AnalyzerId);
}

enum Change {
    Register(AnalyzerId, Box<dyn Analyzer>),
    Deregister(AnalyzerId),
}

#[derive(Default)]
struct Membership {
    next_id: u64,
    pending: Vec<Change>,
}

impl Distributor for Membership {
    fn allocate_id(&mut self) -> AnalyzerId {
        let id = AnalyzerId(self.next_id);
        self.next_id += 1;
        id
    }

    fn register(&mut self, id: AnalyzerId, analyzer: Box<dyn Analyzer>) {
        self.pending.push(Change::Register(id, analyzer));
    }

    fn deregister(&mut self, id: AnalyzerId) {
        self.pending.push(Change::Deregister(id));
    }
}

/// Counters kept across dispatch cycles.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub packets: u64,
    pub tcp_packets: u64,
    pub analyzer_errors: u64,
    pub first_ts_us: Option<u64>,
    pub last_ts_us: Option<u64>,
}

impl DispatchStats {
    fn observe(&mut self, ts_us: u64, is_tcp: bool) {
        self.packets += 1;
        if is_tcp {
            self.tcp_packets += 1;
        }
        self.first_ts_us = Some(self.first_ts_us.map_or(ts_us, |first| first.min(ts_us)));
        self.last_ts_us = Some(self.last_ts_us.map_or(ts_us, |last| last.max(ts_us)));
    }
}

/// Pulls packets from a source and delivers each one to every analyzer.
pub struct DispatchHub<S> {
    source: S,
    analyzers: Vec<(AnalyzerId, Box<dyn Analyzer>)>,
    membership: Membership,
    stats: DispatchStats,
}

impl<S: PacketSource> DispatchHub<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            analyzers: Vec::new(),
            membership: Membership::default(),
            stats: DispatchStats::default(),
        }
    }

    /// Queue `analyzer` for registration and return its id.
    pub fn add(&mut self, analyzer: Box<dyn Analyzer>) -> AnalyzerId {
        let id = self.membership.allocate_id();
        self.membership.register(id, analyzer);
        id
    }

    /// Pull one packet (blocking) and hand it to every active analyzer.
    ///
    /// Returns `Ok(false)` once the source is exhausted. Analyzer failures are
    /// logged and counted; they never stop the dispatch.
    pub fn dispatch_next(&mut self) -> Result<bool, SourceError> {
        self.apply_pending();
        let Some(raw) = self.source.next_packet()? else {
            return Ok(false);
        };
        let packet = Packet::parse(&raw);
        self.stats.observe(raw.ts_us, packet.tcp.is_some());

        for (id, analyzer) in self.analyzers.iter_mut() {
            if let Err(err) = analyzer.handle_packet(&packet, &mut self.membership) {
                self.stats.analyzer_errors += 1;
                warn!(analyzer = analyzer.name(), id = %id, error = %err, "analyzer failed");
            }
        }
        self.apply_pending();
        Ok(true)
    }

    /// Dispatch until the source is exhausted, then finish every analyzer.
    pub fn run(&mut self) -> Result<DispatchStats, SourceError> {
        while self.dispatch_next()? {}
        self.finish();
        Ok(self.stats)
    }

    pub fn finish(&mut self) {
        self.apply_pending();
        for (_, analyzer) in self.analyzers.iter_mut() {
            analyzer.finish();
        }
    }

    pub fn is_registered(&self, id: AnalyzerId) -> bool {
        self.analyzers.iter().any(|(existing, _)| *existing == id)
    }

    /// Number of analyzers that will receive the next packet.
    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    fn apply_pending(&mut self) {
        let changes = std::mem::take(&mut self.membership.pending);
        let removed: HashSet<AnalyzerId> = changes
            .iter()
            .filter_map(|change| match change {
                Change::Deregister(id) => Some(*id),
                Change::Register(..) => None,
            })
            .collect();
        for change in changes {
            match change {
                Change::Register(id, analyzer) if removed.contains(&id) => {
                    debug!(analyzer = analyzer.name(), id = %id, "analyzer closed before it was registered");
                }
                Change::Register(id, analyzer) => {
                    debug!(analyzer = analyzer.name(), id = %id, "analyzer registered");
                    self.analyzers.push((id, analyzer));
                }
                Change::Deregister(id) => {
                    self.analyzers.retain(|(existing, _)| *existing != id);
                    debug!(id = %id, "analyzer deregistered");
                }
            }
        }
    }
}
