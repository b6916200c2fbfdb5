use serde::Serialize;
use std::fmt;

use crate::error::VaultError;

/// A per-document problem that did not stop the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentIssue {
    pub name: String,
    pub message: String,
}

impl DocumentIssue {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn from_error(name: &str, err: &VaultError) -> Self {
        Self::new(name, err.to_string())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexReport {
    pub nodes: usize,
    pub written: usize,
    pub unchanged: usize,
    pub errors: Vec<DocumentIssue>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// Nothing was written; counts describe what would change
    pub dry_run: bool,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: Vec<DocumentIssue>,
    pub errors: Vec<DocumentIssue>,
    /// Notes that were (or, in a dry run, would be) rewritten
    pub pending: Vec<String>,
}

impl SyncReport {
    /// Documents whose content was rewritten
    pub fn changed(&self) -> usize {
        self.inserted + self.updated
    }
}

impl fmt::Display for IndexReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Indexes: {} tags, {} written, {} unchanged, {} errors",
            self.nodes,
            self.written,
            self.unchanged,
            self.errors.len()
        )?;
        for issue in &self.errors {
            writeln!(f, "  error: {}: {}", issue.name, issue.message)?;
        }
        Ok(())
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Backlinks{}: {} inserted, {} updated, {} unchanged, {} skipped, {} errors",
            if self.dry_run { " (dry run)" } else { "" },
            self.inserted,
            self.updated,
            self.unchanged,
            self.skipped.len(),
            self.errors.len()
        )?;
        if self.dry_run {
            for name in &self.pending {
                writeln!(f, "  out of sync: {}", name)?;
            }
        }
        for issue in &self.skipped {
            writeln!(f, "  skipped: {}: {}", issue.name, issue.message)?;
        }
        for issue in &self.errors {
            writeln!(f, "  error: {}: {}", issue.name, issue.message)?;
        }
        Ok(())
    }
}
