use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::firestore::bulk::tree::ExportFile;
use crate::firestore::error::FirestoreError;

/// A document that could not be written, even individually.
#[derive(Clone, Debug)]
pub struct WriteFailure {
    /// Path relative to the database, e.g. `users/u1`.
    pub path: String,
    pub error: FirestoreError,
}

impl WriteFailure {
    pub fn new(path: impl Into<String>, error: FirestoreError) -> Self {
        Self {
            path: path.into(),
            error,
        }
    }
}

/// Outcome of an import or delete: how many documents made it, and which
/// ones did not.
#[derive(Clone, Debug, Default)]
pub struct WriteReport {
    pub succeeded: usize,
    pub failures: Vec<WriteFailure>,
}

impl WriteReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, path: impl Into<String>, error: FirestoreError) {
        self.failures.push(WriteFailure::new(path, error));
    }

    pub fn merge(&mut self, other: WriteReport) {
        self.succeeded += other.succeeded;
        self.failures.extend(other.failures);
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn summary(&self, verb: &str) -> String {
        if self.is_complete() {
            format!("{} document(s) {verb}.", self.succeeded)
        } else {
            format!(
                "{} document(s) {verb}, {} failed.",
                self.succeeded,
                self.failed()
            )
        }
    }
}

/// A bulk operation stopped early. `report` holds what was done before.
#[derive(Clone, Debug)]
pub struct BulkError {
    pub error: FirestoreError,
    pub report: WriteReport,
}

impl BulkError {
    pub fn new(error: FirestoreError, report: WriteReport) -> Self {
        Self { error, report }
    }
}

impl Display for BulkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} document(s) processed before stopping)",
            self.error, self.report.succeeded
        )
    }
}

impl Error for BulkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

impl From<BulkError> for FirestoreError {
    fn from(value: BulkError) -> Self {
        value.error
    }
}

/// A database export stopped early. `partial` holds the collections that
/// were exported completely before the failure.
#[derive(Clone, Debug)]
pub struct ExportError {
    pub error: FirestoreError,
    pub exported: usize,
    pub partial: ExportFile,
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} document(s) exported, {} collection(s) complete)",
            self.error,
            self.exported,
            self.partial.collections().count()
        )
    }
}

impl Error for ExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

impl From<ExportError> for FirestoreError {
    fn from(value: ExportError) -> Self {
        value.error
    }
}
