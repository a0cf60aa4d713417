//! Due-set management for a practice session.

use chrono::{DateTime, Utc};

use crate::types::SubconceptProgress;

/// Progress rows due at `now`, most overdue first.
///
/// Ties on `due` are ordered by subconcept slug so the result is stable.
pub fn get_due_subconcepts(
    all_progress: &[SubconceptProgress],
    now: DateTime<Utc>,
) -> Vec<SubconceptProgress> {
    let mut due: Vec<SubconceptProgress> = all_progress
        .iter()
        .filter(|p| p.is_due(now))
        .cloned()
        .collect();
    due.sort_by(|a, b| {
        a.card
            .due
            .cmp(&b.card.due)
            .then_with(|| a.subconcept_slug.cmp(&b.subconcept_slug))
    });
    due
}

/// In-memory due list for one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DueSet {
    items: Vec<SubconceptProgress>,
}

impl DueSet {
    pub fn compute(all_progress: &[SubconceptProgress], now: DateTime<Utc>) -> Self {
        let items = get_due_subconcepts(all_progress, now);
        tracing::debug!(due = items.len(), total = all_progress.len(), "computed due set");
        Self { items }
    }

    /// The subconcept to practise next, if anything is due.
    pub fn current(&self) -> Option<&SubconceptProgress> {
        self.items.first()
    }

    pub fn items(&self) -> &[SubconceptProgress] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop a just-reviewed subconcept without refetching progress.
    pub fn record_review(&mut self, subconcept_slug: &str) -> Option<SubconceptProgress> {
        let index = self
            .items
            .iter()
            .position(|p| p.subconcept_slug == subconcept_slug)?;
        Some(self.items.remove(index))
    }
}
