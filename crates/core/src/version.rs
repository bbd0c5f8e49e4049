//! Optimistic concurrency tokens for stored records.

use crate::error::{DomainError, DomainResult};

/// Optimistic concurrency expectation for a stored record.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking.
    Any,
    /// Require the record to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::UpdateFailed(format!(
                "stale record (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}
