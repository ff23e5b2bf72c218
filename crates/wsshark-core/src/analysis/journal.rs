use std::collections::HashSet;

use crate::SessionSummary;

use super::flows::FlowKey;

/// Shared record of tracked flows and finished sessions.
///
/// The handshake detector consults `active` so one connection is never
/// tracked twice; trackers move themselves out of it when they close.
/// A journal built with [`SessionJournal::discarding`] keeps only the count
/// of finished sessions, for sources that never end.
#[derive(Debug)]
pub struct SessionJournal {
    active: HashSet<FlowKey>,
    sessions: Vec<(u64, SessionSummary)>,
    retain: bool,
    finished: u64,
}

impl Default for SessionJournal {
    fn default() -> Self {
        Self {
            active: HashSet::new(),
            sessions: Vec::new(),
            retain: true,
            finished: 0,
        }
    }
}

impl SessionJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn discarding() -> Self {
        Self {
            retain: false,
            ..Self::default()
        }
    }

    /// Sessions recorded so far, retained or not.
    pub fn finished(&self) -> u64 {
        self.finished
    }

    pub fn is_tracking(&self, flow: &FlowKey) -> bool {
        self.active.contains(flow)
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub(crate) fn open(&mut self, flow: FlowKey) {
        self.active.insert(flow);
    }

    pub(crate) fn release(&mut self, flow: &FlowKey) {
        self.active.remove(flow);
    }

    pub(crate) fn record(&mut self, started_us: u64, summary: SessionSummary) {
        self.finished += 1;
        if self.retain {
            self.sessions.push((started_us, summary));
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Recorded sessions ordered by start time, then endpoints.
    pub fn into_sessions(mut self) -> Vec<SessionSummary> {
        self.sessions.sort_by(|(a_ts, a), (b_ts, b)| {
            a_ts.cmp(b_ts)
                .then_with(|| a.client.cmp(&b.client))
                .then_with(|| a.server.cmp(&b.server))
        });
        self.sessions.into_iter().map(|(_, summary)| summary).collect()
    }
}
