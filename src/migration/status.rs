//! Run reports and installation status

use crate::migration::version::{Action, Direction, Version};
use serde::Serialize;

/// Outcome of a committed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub action: Action,
    pub direction: Direction,
    /// Versions whose stages ran, in execution order
    pub applied: Vec<Version>,
    /// Marker before the run
    pub previous: Option<Version>,
    /// Marker after the run; `None` after an uninstall
    pub current: Option<Version>,
}

impl MigrationReport {
    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }
}

/// Installed version compared against the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    /// Recorded marker, `None` when nothing is installed
    pub current: Option<Version>,
    /// Every version the catalog offers, oldest first
    pub available: Vec<Version>,
    /// Versions newer than `current`; empty when `current` is not in the catalog
    pub pending: Vec<Version>,
}

impl MigrationStatus {
    /// Compare `current` against `available`
    #[must_use]
    pub fn new(current: Option<Version>, available: Vec<Version>) -> Self {
        let pending = match &current {
            None => available.clone(),
            Some(current) => match available.iter().position(|v| v == current) {
                Some(ci) => available[ci + 1..].to_vec(),
                None => Vec::new(),
            },
        };
        Self {
            current,
            available,
            pending,
        }
    }

    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.current.is_some()
    }

    /// Whether the recorded version appears in the catalog
    #[must_use]
    pub fn is_known(&self) -> bool {
        match &self.current {
            Some(current) => self.available.contains(current),
            None => true,
        }
    }

    /// Installed and nothing newer to apply
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.is_installed() && self.is_known() && self.pending.is_empty()
    }

    #[must_use]
    pub fn latest_available(&self) -> Option<&Version> {
        self.available.last()
    }
}
