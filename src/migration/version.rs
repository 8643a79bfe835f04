//! Version identifiers and the direction/action vocabulary shared by the resolver
//! and the migrator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque schema version identifier
///
/// Versions carry no ordering of their own. Their order is their position in the
/// catalog's list of available versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    /// Create a version from its name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The version name as stored in the marker table
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Version {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for Version {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Which stage operation a plan runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Apply stages in ascending order with `forward()`
    Forward,
    /// Undo stages in descending order with `backward()`
    Backward,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => f.write_str("forward"),
            Direction::Backward => f.write_str("backward"),
        }
    }
}

/// The operation a caller asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Upgrade,
    Downgrade,
    Uninstall,
}

impl Action {
    /// The direction stages run in for this action
    #[must_use]
    pub fn direction(self) -> Direction {
        match self {
            Action::Upgrade => Direction::Forward,
            Action::Downgrade | Action::Uninstall => Direction::Backward,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Upgrade => f.write_str("upgrade"),
            Action::Downgrade => f.write_str("downgrade"),
            Action::Uninstall => f.write_str("uninstall"),
        }
    }
}
