//! Reports produced by index maintenance

use duodraft_domain::{RoundId, TeacherId};

/// Outcome of a full index rebuild for one teacher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildReport {
    /// Teacher whose index was rebuilt
    pub teacher_id: TeacherId,

    /// Rounds replayed from the ledger, under any teacher
    pub rounds_replayed: usize,

    /// Students whose records were reset and rebuilt
    pub students_reset: usize,
}

/// Counters for incremental catch-up runs
///
/// A single `catch_up` returns a fresh report; the reconcile worker folds
/// them together with [`ReconcileReport::absorb`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Catch-up runs completed
    pub cycles: usize,

    /// Unindexed rounds merged
    pub rounds_merged: usize,

    /// Rounds whose merge failed and remain unindexed
    pub failed: Vec<RoundId>,
}

impl ReconcileReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful merge
    pub fn record_merged(&mut self) {
        self.rounds_merged += 1;
    }

    /// Record a merge that failed
    pub fn record_failure(&mut self, round_id: RoundId) {
        self.failed.push(round_id);
    }

    /// Fold another run into this one
    pub fn absorb(&mut self, other: ReconcileReport) {
        self.cycles += other.cycles;
        self.rounds_merged += other.rounds_merged;
        self.failed.extend(other.failed);
    }

    /// Whether the index was fully caught up
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Reset all counters
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Human-readable summary
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Reconcile Summary".to_string(),
            "=================".to_string(),
            format!("Catch-up cycles: {}", self.cycles),
            format!("Rounds merged: {}", self.rounds_merged),
            format!("Rounds still unindexed: {}", self.failed.len()),
        ];
        for id in &self.failed {
            lines.push(format!("  {}", id));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorb_accumulates() {
        let mut total = ReconcileReport::new();

        let mut run = ReconcileReport::new();
        run.cycles = 1;
        run.record_merged();
        run.record_merged();
        total.absorb(run);

        let mut run = ReconcileReport::new();
        run.cycles = 1;
        run.record_failure(RoundId::from_value(7));
        total.absorb(run);

        assert_eq!(total.cycles, 2);
        assert_eq!(total.rounds_merged, 2);
        assert!(!total.is_clean());
        assert!(total.summary().contains("Rounds still unindexed: 1"));

        total.reset();
        assert_eq!(total, ReconcileReport::default());
    }
}
