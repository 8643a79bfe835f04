//! Migration-specific error types

use crate::executor::ShiftError;
use crate::migration::resolver::{join_versions, ResolveError};
use crate::migration::version::{Action, Direction, Version};
use crate::transaction::TransactionError;
use std::path::PathBuf;

/// Migration-specific errors
#[derive(Debug)]
pub enum MigrationError {
    /// Downgrade, uninstall or status needs a recorded version and there is none
    NoInstallation,
    /// A requested or recorded version is not in the catalog
    UnavailableVersion {
        version: Option<Version>,
        all_versions: Vec<Version>,
    },
    /// The database is already where the caller asked it to go; nothing was executed
    NothingToDo {
        current: Option<Version>,
        target: Version,
        action: Action,
    },
    /// A stage's forward or backward operation failed; the group was rolled back
    StageFailed {
        version: Version,
        /// Zero-based position of the stage in the plan
        position: usize,
        direction: Direction,
        source: ShiftError,
    },
    /// Creating the version marker table failed for a reason other than it existing
    Bootstrap(ShiftError),
    /// Reading or writing the version marker failed
    VersionStore(ShiftError),
    /// Opening or rolling back a session failed
    Session(TransactionError),
    /// The final commit failed; nothing from the group was kept
    Commit(TransactionError),
    /// Catalog directory not found
    CatalogNotFound(PathBuf),
    /// Invalid catalog layout or configuration
    InvalidFormat(String),
    /// A version was registered twice
    AlreadyRegistered(Version),
    /// Reading a catalog file failed
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl MigrationError {
    /// Whether this is the "already there" outcome, which callers treat as success
    #[must_use]
    pub fn is_nothing_to_do(&self) -> bool {
        matches!(self, MigrationError::NothingToDo { .. })
    }

    pub(crate) fn from_resolve(error: ResolveError, action: Action) -> Self {
        match error {
            ResolveError::UnavailableVersion {
                version,
                all_versions,
            } => MigrationError::UnavailableVersion {
                version,
                all_versions,
            },
            ResolveError::NothingToDo { current, target } => MigrationError::NothingToDo {
                current: Some(current),
                target,
                action,
            },
        }
    }
}

impl std::fmt::Display for MigrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationError::NoInstallation => write!(f, "No installation detected."),
            MigrationError::UnavailableVersion {
                version: Some(version),
                all_versions,
            } => write!(
                f,
                "Requested version ({}) is unavailable. Available versions are: {}",
                version,
                join_versions(all_versions)
            ),
            MigrationError::UnavailableVersion { version: None, .. } => {
                write!(f, "No versions are available in the catalog")
            }
            MigrationError::NothingToDo {
                current,
                target,
                action,
            } => match current {
                Some(current) if current == target => {
                    write!(f, "Already at version {}.", current)
                }
                Some(current) => {
                    let hint = match action {
                        Action::Upgrade => "lower than the current one; maybe you meant to downgrade?",
                        Action::Downgrade | Action::Uninstall => {
                            "higher than the current one; maybe you meant to upgrade?"
                        }
                    };
                    write!(
                        f,
                        "Requested version {} is {} (current: {})",
                        target, hint, current
                    )
                }
                None => write!(f, "Nothing to {} (target {}).", action, target),
            },
            MigrationError::StageFailed {
                version,
                position,
                direction,
                source,
            } => write!(
                f,
                "Stage {} (#{} in plan) failed running {}: {}. All changes were rolled back.",
                version,
                position + 1,
                direction,
                source
            ),
            MigrationError::Bootstrap(e) => {
                write!(f, "Failed to create version table: {}", e)
            }
            MigrationError::VersionStore(e) => {
                write!(f, "Failed to access version information: {}", e)
            }
            MigrationError::Session(e) => write!(f, "Session error: {}", e),
            MigrationError::Commit(e) => {
                write!(f, "Failed to commit migration, all changes were rolled back: {}", e)
            }
            MigrationError::CatalogNotFound(path) => {
                write!(f, "Version catalog not found: {}", path.display())
            }
            MigrationError::InvalidFormat(msg) => write!(f, "Invalid catalog format: {}", msg),
            MigrationError::AlreadyRegistered(version) => {
                write!(f, "Version {} is already registered", version)
            }
            MigrationError::Io { path, source } => {
                write!(f, "Failed to read {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for MigrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MigrationError::StageFailed { source, .. } => Some(source),
            MigrationError::Bootstrap(e) | MigrationError::VersionStore(e) => Some(e),
            MigrationError::Session(e) | MigrationError::Commit(e) => Some(e),
            MigrationError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<TransactionError> for MigrationError {
    fn from(error: TransactionError) -> Self {
        MigrationError::Session(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn versions(names: &[&str]) -> Vec<Version> {
        names.iter().map(|n| Version::from(*n)).collect()
    }

    #[test]
    fn test_unavailable_lists_all_versions() {
        let err = MigrationError::UnavailableVersion {
            version: Some(Version::from("9.0")),
            all_versions: versions(&["1.0", "2.0"]),
        };
        let msg = err.to_string();
        assert!(msg.contains("(9.0)"));
        assert!(msg.contains("1.0, 2.0"));
    }

    #[test]
    fn test_nothing_to_do_messages() {
        let same = MigrationError::NothingToDo {
            current: Some(Version::from("3.0")),
            target: Version::from("3.0"),
            action: Action::Upgrade,
        };
        assert!(same.is_nothing_to_do());
        assert_eq!(same.to_string(), "Already at version 3.0.");

        let wrong_way = MigrationError::NothingToDo {
            current: Some(Version::from("3.0")),
            target: Version::from("1.0"),
            action: Action::Upgrade,
        };
        assert!(wrong_way.to_string().contains("maybe you meant to downgrade"));
    }

    #[test]
    fn test_stage_failure_reports_version_and_position() {
        let err = MigrationError::StageFailed {
            version: Version::from("0004"),
            position: 1,
            direction: Direction::Forward,
            source: ShiftError::QueryError("syntax error".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("0004"));
        assert!(msg.contains("#2"));
        assert!(msg.contains("forward"));
        assert!(msg.contains("syntax error"));
        assert!(!err.is_nothing_to_do());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_from_resolve_keeps_action() {
        let err = MigrationError::from_resolve(
            ResolveError::NothingToDo {
                current: Version::from("2"),
                target: Version::from("2"),
            },
            Action::Downgrade,
        );
        assert!(matches!(
            err,
            MigrationError::NothingToDo {
                action: Action::Downgrade,
                ..
            }
        ));
    }
}
