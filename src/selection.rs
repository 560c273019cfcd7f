use crate::error::RejectionReason;
use crate::models::{Selection, SelectionId};
use tracing::debug;

pub const MAX_SELECTIONS: usize = 5;

/// The institution/year the user has picked but not yet added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingChoice {
    pub institution: String,
    pub year: String,
}

impl PendingChoice {
    pub fn is_complete(&self) -> bool {
        !self.institution.is_empty() && !self.year.is_empty()
    }

    pub fn clear(&mut self) {
        self.institution.clear();
        self.year.clear();
    }
}

/// Ordered, bounded, duplicate-free set of (institution, year) picks.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    selections: Vec<Selection>,
    next_id: u64,
    pub pending: PendingChoice,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, institution: &str, year: &str) -> Result<Selection, RejectionReason> {
        if institution.is_empty() || year.is_empty() {
            return Err(RejectionReason::IncompleteChoice);
        }
        if self.selections.len() >= MAX_SELECTIONS {
            return Err(RejectionReason::CapacityExceeded);
        }
        if self.selections.iter().any(|s| s.matches(institution, year)) {
            return Err(RejectionReason::DuplicateCombination);
        }

        self.next_id += 1;
        let selection = Selection {
            id: SelectionId(self.next_id),
            institution: institution.to_string(),
            year: year.to_string(),
        };
        self.selections.push(selection.clone());
        self.pending.clear();

        debug!(id = %selection.id, institution, year, "selection added");
        Ok(selection)
    }

    /// Add whatever is in `pending`; it is cleared only on success.
    pub fn add_pending(&mut self) -> Result<Selection, RejectionReason> {
        let PendingChoice { institution, year } = self.pending.clone();
        self.add(&institution, &year)
    }

    /// Removing an unknown or already removed id does nothing.
    pub fn remove(&mut self, id: SelectionId) {
        let before = self.selections.len();
        self.selections.retain(|s| s.id != id);
        if self.selections.len() != before {
            debug!(%id, "selection removed");
        }
    }

    pub fn list(&self) -> &[Selection] {
        &self.selections
    }

    pub fn get(&self, id: SelectionId) -> Option<&Selection> {
        self.selections.iter().find(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    pub fn capacity(&self) -> usize {
        MAX_SELECTIONS
    }

    /// Mirrors the add button: enabled when the pending pick is complete and there is room.
    pub fn can_add(&self) -> bool {
        self.pending.is_complete() && self.selections.len() < MAX_SELECTIONS
    }

    /// Counter shown next to the selector, e.g. `3/5`.
    pub fn counter(&self) -> String {
        format!("{}/{}", self.selections.len(), MAX_SELECTIONS)
    }
}
