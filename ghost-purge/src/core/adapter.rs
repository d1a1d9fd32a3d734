/*!
The contract every store adapter satisfies, and the values that cross it.
*/

use std::path::Path;

use ghost_stores::PreservationRules;

use crate::core::{
    confirm::Confirmer,
    identity::Identity,
    ledger::ErrorRecord,
    occurrence::{AdapterKind, Occurrence},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeletionOutcome {
    Deleted,
    SkippedPreserved,
    SkippedUserDeclined,
    Failed,
}

impl DeletionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DeletionOutcome::Deleted => "deleted",
            DeletionOutcome::SkippedPreserved => "skipped-preserved",
            DeletionOutcome::SkippedUserDeclined => "skipped-user-declined",
            DeletionOutcome::Failed => "failed",
        }
    }
}

/// What happened to one occurrence. A failure always carries its record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub occurrence: Occurrence,
    pub outcome: DeletionOutcome,
    pub error: Option<ErrorRecord>,
}

impl ItemOutcome {
    pub fn deleted(occurrence: &Occurrence) -> Self {
        Self {
            occurrence: occurrence.clone(),
            outcome: DeletionOutcome::Deleted,
            error: None,
        }
    }

    pub fn preserved(occurrence: &Occurrence) -> Self {
        Self {
            occurrence: occurrence.clone(),
            outcome: DeletionOutcome::SkippedPreserved,
            error: None,
        }
    }

    /// The user chose to keep this item. A record is attached when keeping it
    /// leaves the purge incomplete in a way the user should act on.
    pub fn declined(occurrence: &Occurrence, error: Option<ErrorRecord>) -> Self {
        Self {
            occurrence: occurrence.clone(),
            outcome: DeletionOutcome::SkippedUserDeclined,
            error,
        }
    }

    pub fn failed(occurrence: &Occurrence, error: ErrorRecord) -> Self {
        Self {
            occurrence: occurrence.clone(),
            outcome: DeletionOutcome::Failed,
            error: Some(error),
        }
    }
}

/// Result of one adapter's scan.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub occurrences: Vec<Occurrence>,
    /// Problems that did not stop the scan, e.g. an unreadable store.
    pub warnings: Vec<String>,
}

impl ScanReport {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            occurrences: Vec::new(),
            warnings: vec![message.into()],
        }
    }
}

/// Shared capabilities handed to every adapter call.
pub struct AdapterContext<'a> {
    pub home: &'a Path,
    pub rules: &'a PreservationRules,
    pub confirm: &'a dyn Confirmer,
}

pub trait StoreAdapter {
    fn kind(&self) -> AdapterKind;

    /// Find every location holding `identity`. Read-only. A missing store is
    /// an empty report; an unreadable one is an empty report with a warning.
    fn scan(&self, identity: &Identity, ctx: &AdapterContext) -> ScanReport;

    /// Remove the given occurrences, all of which this adapter reported.
    /// Each one is re-verified first; one outcome per occurrence.
    fn delete(
        &self,
        identity: &Identity,
        occurrences: &[Occurrence],
        ctx: &AdapterContext,
    ) -> Vec<ItemOutcome>;
}
