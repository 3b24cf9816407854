//! Plan session with stale-result supersession
//!
//! Extractions may overlap (a file is re-saved while the previous version is
//! still being read). Each run takes a [`Ticket`] before starting; only the
//! newest ticket may publish its result, older ones are discarded.

use crate::core::aggregator;
use crate::core::formula::InclusionTable;
use crate::types::{DischargeOrder, MixerPlan, RationRow};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tracing::debug;

/// Sequence number handed out by [`PlanSession::begin`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Ticket(u64);

impl Ticket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// A newer run started after this ticket; the result was dropped
    Superseded,
}

/// Everything a plan is derived from, plus the derived plan
#[derive(Debug, Clone, Serialize)]
pub struct PlanSnapshot {
    pub ticket: Ticket,
    pub source: String,
    pub rows: Vec<RationRow>,
    pub inclusion: InclusionTable,
    pub order: DischargeOrder,
    pub plan: MixerPlan,
    pub messages: Vec<String>,
}

impl PlanSnapshot {
    /// Derive the plan again from the stored inputs
    pub fn replan(&mut self) {
        self.plan = aggregator::plan(&self.rows, &self.inclusion, &self.order);
    }
}

/// Latest committed plan, shared between request handlers or watch events
#[derive(Debug, Default)]
pub struct PlanSession {
    issued: AtomicU64,
    latest: RwLock<Option<PlanSnapshot>>,
}

impl PlanSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a run; invalidates every earlier ticket
    pub fn begin(&self) -> Ticket {
        Ticket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// True when no newer run has started since `ticket`
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.issued.load(Ordering::SeqCst) == ticket.0
    }

    /// Publish a finished run unless it has been superseded
    pub fn commit(&self, ticket: Ticket, mut snapshot: PlanSnapshot) -> CommitOutcome {
        let Ok(mut latest) = self.latest.write() else {
            return CommitOutcome::Superseded;
        };
        // checked under the lock so a newer commit cannot be overwritten
        if !self.is_current(ticket) {
            debug!(ticket = ticket.0, "discarding superseded plan");
            return CommitOutcome::Superseded;
        }
        snapshot.ticket = ticket;
        *latest = Some(snapshot);
        CommitOutcome::Committed
    }

    pub fn latest(&self) -> Option<PlanSnapshot> {
        self.latest.read().ok().and_then(|guard| guard.clone())
    }

    /// Replace a mixer's discharge hint and re-derive the plan
    ///
    /// Returns the new plan, or None when nothing has been committed yet.
    pub fn reorder(&self, mixer: u32, pens: Vec<String>) -> Option<MixerPlan> {
        let mut latest = self.latest.write().ok()?;
        let snapshot = latest.as_mut()?;
        snapshot.order.set(mixer, pens);
        snapshot.replan();
        Some(snapshot.plan.clone())
    }

    /// Move one pen within a mixer's discharge hint and re-derive the plan
    ///
    /// None when nothing is committed, the mixer has no hint, or an index is
    /// out of range.
    pub fn move_pen(&self, mixer: u32, from: usize, to: usize) -> Option<MixerPlan> {
        let mut latest = self.latest.write().ok()?;
        let snapshot = latest.as_mut()?;
        if !snapshot.order.move_pen(mixer, from, to) {
            return None;
        }
        snapshot.replan();
        Some(snapshot.plan.clone())
    }
}
