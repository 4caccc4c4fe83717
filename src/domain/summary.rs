//! Batch aggregation. `SummaryBuilder` collects per-recipient outcomes; the
//! finished `DispatchSummary` is read-only.

use super::entities::{OutcomeKind, RecipientOutcome};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Aggregate over one batch of deliveries.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchSummary {
    succeeded: usize,
    rejected: usize,
    transient_failures: usize,
    skipped_no_phone: usize,
    outcomes: Vec<RecipientOutcome>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl DispatchSummary {
    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn transient_failures(&self) -> usize {
        self.transient_failures
    }

    pub fn skipped_no_phone(&self) -> usize {
        self.skipped_no_phone
    }

    pub fn count(&self, kind: OutcomeKind) -> usize {
        match kind {
            OutcomeKind::Success => self.succeeded,
            OutcomeKind::Rejected => self.rejected,
            OutcomeKind::TransientFailure => self.transient_failures,
            OutcomeKind::SkippedNoPhone => self.skipped_no_phone,
        }
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn outcomes(&self) -> &[RecipientOutcome] {
        &self.outcomes
    }

    pub fn outcome_for(&self, user_id: &str) -> Option<&RecipientOutcome> {
        self.outcomes.iter().find(|o| o.user_id == user_id)
    }

    /// True when every recipient was delivered.
    pub fn is_complete(&self) -> bool {
        self.succeeded == self.outcomes.len()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }
}

/// Incremental builder owned by the orchestrator for the duration of one call.
#[derive(Debug)]
pub struct SummaryBuilder {
    outcomes: Vec<RecipientOutcome>,
    started_at: DateTime<Utc>,
}

impl SummaryBuilder {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            outcomes: Vec::with_capacity(capacity),
            started_at: Utc::now(),
        }
    }

    pub fn record(&mut self, outcome: RecipientOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn finish(self) -> DispatchSummary {
        let mut summary = DispatchSummary {
            succeeded: 0,
            rejected: 0,
            transient_failures: 0,
            skipped_no_phone: 0,
            outcomes: Vec::new(),
            started_at: self.started_at,
            finished_at: Utc::now(),
        };
        for entry in &self.outcomes {
            match entry.outcome.kind() {
                OutcomeKind::Success => summary.succeeded += 1,
                OutcomeKind::Rejected => summary.rejected += 1,
                OutcomeKind::TransientFailure => summary.transient_failures += 1,
                OutcomeKind::SkippedNoPhone => summary.skipped_no_phone += 1,
            }
        }
        summary.outcomes = self.outcomes;
        summary
    }
}

impl Default for SummaryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
