use tracing::debug;

use crate::catalog::Catalog;
use crate::conflict;
use crate::models::{Batch, BatchId, ConflictReport, Member};
use crate::request::EnrollmentChangeRequest;

/// Unique batch ids in the order they were first chosen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: Vec<BatchId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: BatchId) -> bool {
        self.ids.contains(&id)
    }

    pub fn insert(&mut self, id: BatchId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    pub fn remove(&mut self, id: BatchId) -> bool {
        let before = self.ids.len();
        self.ids.retain(|existing| *existing != id);
        self.ids.len() != before
    }

    /// Flips membership of `id`, returning whether it is selected afterwards.
    pub fn toggle(&mut self, id: BatchId) -> bool {
        if self.remove(id) {
            false
        } else {
            self.ids.push(id);
            true
        }
    }

    pub fn with(&self, id: BatchId) -> Self {
        let mut next = self.clone();
        next.insert(id);
        next
    }

    pub fn iter(&self) -> impl Iterator<Item = BatchId> + '_ {
        self.ids.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<BatchId> for SelectionSet {
    fn from_iter<T: IntoIterator<Item = BatchId>>(iter: T) -> Self {
        let mut selection = SelectionSet::new();
        for id in iter {
            selection.insert(id);
        }
        selection
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("batch {0} is not in the catalog")]
    UnknownBatch(BatchId),
    #[error("batch {batch} cannot be added: another {program} level is already selected")]
    CandidateDisabled { batch: BatchId, program: String },
    #[error("selection still has {0} unresolved conflict(s)")]
    Unresolved(usize),
    #[error("selection has no changes to request")]
    NoChanges,
    #[error("batch {0} is not in the current selection")]
    NotSelected(BatchId),
    #[error("batch {0} is already in the current selection")]
    AlreadySelected(BatchId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Selected,
    Available,
    Disabled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionDiff {
    pub added: Vec<BatchId>,
    pub removed: Vec<BatchId>,
}

impl SelectionDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// A member's in-progress batch selection, re-validated after every change.
#[derive(Debug)]
pub struct EditSession<'a> {
    catalog: &'a Catalog,
    member: &'a Member,
    original: SelectionSet,
    current: SelectionSet,
    report: ConflictReport,
}

impl<'a> EditSession<'a> {
    pub fn open(catalog: &'a Catalog, member: &'a Member) -> Self {
        let original: SelectionSet = member.held_batches().collect();
        Self::with_selection(catalog, member, original)
    }

    /// Opens a session whose working selection differs from the member's held batches.
    pub fn with_selection(
        catalog: &'a Catalog,
        member: &'a Member,
        current: SelectionSet,
    ) -> Self {
        let original: SelectionSet = member.held_batches().collect();
        let report = conflict::validate(&catalog.batches, &catalog.levels, &current);
        if !report.is_clear() {
            debug!(
                member = %member.id,
                conflicts = report.conflicts.len(),
                "session opened with existing conflicts"
            );
        }
        Self {
            catalog,
            member,
            original,
            current,
            report,
        }
    }

    pub fn member(&self) -> &Member {
        self.member
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.current
    }

    pub fn report(&self) -> &ConflictReport {
        &self.report
    }

    pub fn is_disabled(&self, id: BatchId) -> bool {
        conflict::is_candidate_disabled(
            &self.catalog.batches,
            &self.catalog.levels,
            &self.current,
            id,
        )
    }

    /// Removal always succeeds, even for a held batch the catalog no longer lists.
    pub fn toggle(&mut self, id: BatchId) -> Result<bool, SessionError> {
        if self.current.remove(id) {
            self.revalidate();
            debug!(
                batch = id,
                conflicts = self.report.conflicts.len(),
                "removed batch"
            );
            return Ok(false);
        }

        let batch = self.catalog.batch(id).ok_or(SessionError::UnknownBatch(id))?;
        if self.is_disabled(id) {
            return Err(SessionError::CandidateDisabled {
                batch: id,
                program: batch.program.clone(),
            });
        }

        self.current.insert(id);
        self.revalidate();
        debug!(
            batch = id,
            conflicts = self.report.conflicts.len(),
            "added batch"
        );
        Ok(true)
    }

    /// Applies removals before additions, so a level switch frees the
    /// program before the new level is checked.
    pub fn apply(&mut self, remove: &[BatchId], add: &[BatchId]) -> Result<(), SessionError> {
        for &id in remove {
            if !self.current.contains(id) {
                return Err(SessionError::NotSelected(id));
            }
            self.toggle(id)?;
        }
        for &id in add {
            if self.current.contains(id) {
                return Err(SessionError::AlreadySelected(id));
            }
            self.toggle(id)?;
        }
        Ok(())
    }

    fn revalidate(&mut self) {
        self.report =
            conflict::validate(&self.catalog.batches, &self.catalog.levels, &self.current);
    }

    pub fn availability(&self) -> Vec<(&'a Batch, Availability)> {
        let disabled = conflict::disabled_candidates(
            &self.catalog.batches,
            &self.catalog.levels,
            &self.current,
        );
        self.catalog
            .batches
            .iter()
            .map(|batch| {
                let state = if self.current.contains(batch.id) {
                    Availability::Selected
                } else if disabled.contains(&batch.id) {
                    Availability::Disabled
                } else {
                    Availability::Available
                };
                (batch, state)
            })
            .collect()
    }

    pub fn changes(&self) -> SelectionDiff {
        SelectionDiff {
            added: self
                .current
                .iter()
                .filter(|id| !self.original.contains(*id))
                .collect(),
            removed: self
                .original
                .iter()
                .filter(|id| !self.current.contains(*id))
                .collect(),
        }
    }

    pub fn into_request(
        self,
        note: Option<String>,
    ) -> Result<EnrollmentChangeRequest, SessionError> {
        if !self.report.is_clear() {
            return Err(SessionError::Unresolved(self.report.conflicts.len()));
        }
        let diff = self.changes();
        if diff.is_empty() {
            return Err(SessionError::NoChanges);
        }
        Ok(EnrollmentChangeRequest::new(self.member, diff, note))
    }
}
