//! Version-path resolution
//!
//! Turns (current version, requested target, available versions) into the ordered list
//! of versions whose stages must run. The available list is the only source of
//! ordering: position in it is the version's rank.
//!
//! Moving forward runs `available[current+1..=target]` ascending: the current version is
//! already applied and the target is the last stage applied. Moving backward runs
//! `available[target+1..=current]` descending: the most recently installed stage is
//! undone first and the target's own stage stays applied.

use crate::migration::version::{Direction, Version};
use std::fmt;

/// Ordered versions to run, plus the direction to run them in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub direction: Direction,
    pub versions: Vec<Version>,
}

impl Plan {
    fn forward(versions: &[Version]) -> Self {
        Self {
            direction: Direction::Forward,
            versions: versions.to_vec(),
        }
    }

    fn backward(versions: &[Version]) -> Self {
        Self {
            direction: Direction::Backward,
            versions: versions.iter().rev().cloned().collect(),
        }
    }

    /// The last version the plan runs, if any
    #[must_use]
    pub fn last(&self) -> Option<&Version> {
        self.versions.last()
    }
}

/// Why no plan was produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// A referenced version is not in the catalog. `version` is `None` only when the
    /// catalog is empty and no target was requested.
    UnavailableVersion {
        version: Option<Version>,
        all_versions: Vec<Version>,
    },
    /// Current and target are the same version
    NothingToDo { current: Version, target: Version },
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::UnavailableVersion {
                version: Some(version),
                all_versions,
            } => write!(
                f,
                "Version {} is unavailable. Available versions are: {}",
                version,
                join_versions(all_versions)
            ),
            ResolveError::UnavailableVersion { version: None, .. } => {
                write!(f, "No versions are available to install")
            }
            ResolveError::NothingToDo { current, .. } => {
                write!(f, "Already at version {current}")
            }
        }
    }
}

impl std::error::Error for ResolveError {}

pub(crate) fn join_versions(versions: &[Version]) -> String {
    if versions.is_empty() {
        return "(none)".to_string();
    }
    versions
        .iter()
        .map(Version::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn unavailable(version: &Version, available: &[Version]) -> ResolveError {
    ResolveError::UnavailableVersion {
        version: Some(version.clone()),
        all_versions: available.to_vec(),
    }
}

fn position(version: &Version, available: &[Version]) -> Option<usize> {
    available.iter().position(|v| v == version)
}

/// Resolve the versions to run to get from `current` to `target`
///
/// `current = None` means nothing is installed. `target = None` means the newest
/// available version; an explicit target equal to `current` is never replaced by the
/// newest version.
///
/// # Errors
///
/// - `UnavailableVersion` when the catalog is empty, or when `current` or `target` is
///   not in `available`
/// - `NothingToDo` when `current` and `target` are the same version
pub fn resolve(
    current: Option<&Version>,
    target: Option<&Version>,
    available: &[Version],
) -> Result<Plan, ResolveError> {
    let Some(latest) = available.last() else {
        return Err(ResolveError::UnavailableVersion {
            version: target.cloned(),
            all_versions: Vec::new(),
        });
    };
    let target = target.unwrap_or(latest);

    let Some(current) = current else {
        let ti = position(target, available).ok_or_else(|| unavailable(target, available))?;
        return Ok(Plan::forward(&available[..=ti]));
    };

    let ci = position(current, available).ok_or_else(|| unavailable(current, available))?;
    let ti = position(target, available).ok_or_else(|| unavailable(target, available))?;

    if ci == ti {
        return Err(ResolveError::NothingToDo {
            current: current.clone(),
            target: target.clone(),
        });
    }
    if ci < ti {
        Ok(Plan::forward(&available[ci + 1..=ti]))
    } else {
        Ok(Plan::backward(&available[ti + 1..=ci]))
    }
}

/// Resolve a full uninstall: every installed version, newest first, down to and
/// including the first available version
///
/// # Errors
///
/// Returns `UnavailableVersion` when `current` is not in `available`.
pub fn resolve_uninstall(current: &Version, available: &[Version]) -> Result<Plan, ResolveError> {
    let ci = position(current, available).ok_or_else(|| unavailable(current, available))?;
    Ok(Plan::backward(&available[..=ci]))
}
