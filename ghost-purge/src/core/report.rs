/*!
Final tally and exit status of a run.
*/

use std::fmt;
use std::time::Duration;

use crate::core::{
    adapter::{DeletionOutcome, ItemOutcome},
    ledger::ErrorLedger,
    orchestrator::ScanWarning,
};

/// Process exit statuses.
pub mod exit {
    pub const SUCCESS: u8 = 0;
    pub const INCOMPLETE: u8 = 1;
    pub const USAGE: u8 = 2;
    pub const CANCELLED: u8 = 3;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub deleted: usize,
    pub skipped_preserved: usize,
    pub skipped_declined: usize,
    pub failed: usize,
}

impl Tally {
    pub fn of(outcomes: &[ItemOutcome]) -> Self {
        let mut tally = Self::default();
        for item in outcomes {
            match item.outcome {
                DeletionOutcome::Deleted => tally.deleted += 1,
                DeletionOutcome::SkippedPreserved => tally.skipped_preserved += 1,
                DeletionOutcome::SkippedUserDeclined => tally.skipped_declined += 1,
                DeletionOutcome::Failed => tally.failed += 1,
            }
        }
        tally
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum RunEnd {
    NothingFound,
    DryRun,
    Cancelled,
    Completed(Report),
}

impl RunEnd {
    pub fn exit_code(&self) -> u8 {
        match self {
            RunEnd::NothingFound | RunEnd::DryRun => exit::SUCCESS,
            RunEnd::Cancelled => exit::CANCELLED,
            RunEnd::Completed(report) if report.ledger.is_empty() => exit::SUCCESS,
            RunEnd::Completed(_) => exit::INCOMPLETE,
        }
    }
}

#[derive(Debug)]
pub struct Report {
    pub elapsed: Duration,
    pub outcomes: Vec<ItemOutcome>,
    pub tally: Tally,
    pub warnings: Vec<ScanWarning>,
    pub ledger: ErrorLedger,
}

impl Report {
    pub fn new(
        elapsed: Duration,
        outcomes: Vec<ItemOutcome>,
        warnings: Vec<ScanWarning>,
        ledger: ErrorLedger,
    ) -> Self {
        Self {
            elapsed,
            tally: Tally::of(&outcomes),
            outcomes,
            warnings,
            ledger,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Finished in {:.1}s", self.elapsed.as_secs_f64())?;
        for item in &self.outcomes {
            writeln!(f, "  {:<22} {}", item.outcome.label(), item.occurrence.tag())?;
        }
        writeln!(
            f,
            "{} deleted, {} skipped (preserved), {} skipped (declined), {} failed",
            self.tally.deleted, self.tally.skipped_preserved, self.tally.skipped_declined, self.tally.failed
        )?;

        if !self.warnings.is_empty() {
            writeln!(f, "\nScan warnings:")?;
            for warning in &self.warnings {
                writeln!(f, "  {}: {}", warning.adapter.label(), warning.message)?;
            }
        }

        if !self.ledger.is_empty() {
            writeln!(f, "\n{} problem(s) need attention:", self.ledger.len())?;
            for (index, record) in self.ledger.records().iter().enumerate() {
                writeln!(f, "  {}. {}", index + 1, record.message)?;
                writeln!(f, "     -> {}", record.remediation)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::ErrorRecord;
    use crate::core::occurrence::AdapterKind;
    use crate::core::testing::occurrence_at;

    #[test]
    fn test_tally_and_exit_codes() {
        let occurrence = occurrence_at(AdapterKind::AppData, "/Users/me/a");
        let outcomes = vec![
            ItemOutcome::deleted(&occurrence),
            ItemOutcome::preserved(&occurrence),
            ItemOutcome::declined(&occurrence, None),
        ];
        let report = Report::new(Duration::from_secs(1), outcomes, Vec::new(), ErrorLedger::new());
        assert_eq!(
            report.tally,
            Tally {
                deleted: 1,
                skipped_preserved: 1,
                skipped_declined: 1,
                failed: 0
            }
        );
        assert_eq!(RunEnd::Completed(report).exit_code(), exit::SUCCESS);

        let mut ledger = ErrorLedger::new();
        ledger.push(ErrorRecord::new("Chrome is still running", "Quit Chrome and re-run"));
        let report = Report::new(Duration::ZERO, Vec::new(), Vec::new(), ledger);
        assert!(report.to_string().contains("-> Quit Chrome and re-run"));
        assert_eq!(RunEnd::Completed(report).exit_code(), exit::INCOMPLETE);

        assert_eq!(RunEnd::NothingFound.exit_code(), exit::SUCCESS);
        assert_eq!(RunEnd::DryRun.exit_code(), exit::SUCCESS);
        assert_eq!(RunEnd::Cancelled.exit_code(), exit::CANCELLED);
    }
}
