//! Image-scoped exception record
//!
//! Hard failures are returned as [`Error`](crate::Error) values.  Soft
//! conditions, where processing continues with a substituted value (an
//! out-of-range palette index, a window that could not be served), are
//! recorded in the [`ExceptionInfo`] attached to the image so the caller can
//! inspect them once the operation returns.

use crate::error::Error;
use std::collections::BTreeMap;

/// Exception severity, ordered from least to most serious.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    #[default]
    Undefined,
    Warning,
    Option,
    CorruptImage,
    Blob,
    Cache,
    Image,
    ResourceLimitFatal,
}

impl Severity {
    /// True for conditions that leave the process unable to continue.
    pub fn is_fatal(self) -> bool {
        self >= Severity::ResourceLimitFatal
    }
}

/// One recorded condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exception {
    pub severity: Severity,
    pub reason: &'static str,
    pub description: String,
}

/// Collected soft conditions for one image.
#[derive(Debug, Clone, Default)]
pub struct ExceptionInfo {
    worst: Option<Exception>,
    counts: BTreeMap<&'static str, usize>,
}

impl ExceptionInfo {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a condition. The most severe condition seen so far is kept
    /// verbatim; every condition is counted by reason.
    pub fn record(&mut self, error: &Error) {
        let exception = Exception {
            severity: error.severity(),
            reason: error.reason(),
            description: error.to_string(),
        };
        log::warn!("{}: {}", exception.reason, exception.description);
        *self.counts.entry(exception.reason).or_insert(0) += 1;
        let replace = match &self.worst {
            Some(current) => exception.severity > current.severity,
            None => true,
        };
        if replace {
            self.worst = Some(exception);
        }
    }

    /// Number of times a reason was recorded
    pub fn count(&self, reason: &str) -> usize {
        self.counts.get(reason).copied().unwrap_or(0)
    }

    /// Total number of recorded conditions
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Severity of the worst recorded condition
    pub fn severity(&self) -> Severity {
        self.worst.as_ref().map(|e| e.severity).unwrap_or_default()
    }

    /// Worst recorded condition
    pub fn worst(&self) -> Option<&Exception> {
        self.worst.as_ref()
    }

    /// Check if nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.worst.is_none()
    }

    /// Merge another record into this one
    pub fn inherit(&mut self, other: &ExceptionInfo) {
        for (reason, n) in &other.counts {
            *self.counts.entry(reason).or_insert(0) += n;
        }
        if let Some(theirs) = &other.worst
            && self.severity() < theirs.severity
        {
            self.worst = Some(theirs.clone());
        }
    }

    /// Forget everything recorded
    pub fn clear(&mut self) {
        self.worst = None;
        self.counts.clear();
    }
}
