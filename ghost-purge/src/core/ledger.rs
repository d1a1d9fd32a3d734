/*!
Append-only record of everything that went wrong during a run, each entry
paired with what the user can do about it.
*/

use ghost_stores::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub message: String,
    pub remediation: String,
}

impl ErrorRecord {
    pub fn new(message: impl Into<String>, remediation: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            remediation: remediation.into(),
        }
    }

    /// Record a store failure while working on `what`. Permission and lock
    /// problems get their standard remediation; anything else gets `otherwise`.
    pub fn from_store(what: &str, error: &StoreError, otherwise: impl Into<String>) -> Self {
        let remediation = if error.is_permission_denied() {
            "Grant Full Disk Access to your terminal in System Settings > Privacy & Security, then re-run".to_string()
        } else if error.is_locked() {
            "Quit the application that owns this store, then re-run".to_string()
        } else if let StoreError::CommandUnavailable { program, .. } = error {
            format!("`{program}` is part of macOS; run ghost-purge on the Mac that holds the data")
        } else {
            otherwise.into()
        };
        Self {
            message: format!("{what}: {error}"),
            remediation,
        }
    }
}

#[derive(Debug, Default)]
pub struct ErrorLedger {
    records: Vec<ErrorRecord>,
}

impl ErrorLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ErrorRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
