//! Stage trait definition

use crate::executor::{ShiftError, ShiftExecutor};
use crate::migration::script::split_statements;
use crate::migration::version::Version;

/// One version's pair of change operations
///
/// Both operations run inside the migration group's session and must not commit.
/// A stage signals failure by returning an error; the migrator then rolls back the
/// whole group.
///
/// Note: dbshift runs on the may runtime, so this is synchronous, not async.
pub trait Stage {
    /// Apply this version's changes
    fn forward(&self, session: &dyn ShiftExecutor) -> Result<(), ShiftError>;

    /// Undo this version's changes
    fn backward(&self, session: &dyn ShiftExecutor) -> Result<(), ShiftError>;
}

/// A stage backed by SQL scripts
///
/// Each script may hold several statements; they are split and executed one by one
/// through the session.
#[derive(Debug, Clone)]
pub struct SqlStage {
    version: Version,
    up: String,
    down: Option<String>,
}

impl SqlStage {
    pub fn new(version: Version, up: impl Into<String>, down: Option<String>) -> Self {
        Self {
            version,
            up: up.into(),
            down,
        }
    }

    #[must_use]
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Whether this stage can be undone
    #[must_use]
    pub fn is_reversible(&self) -> bool {
        self.down.is_some()
    }

    fn run_script(&self, session: &dyn ShiftExecutor, script: &str) -> Result<(), ShiftError> {
        for statement in split_statements(script) {
            log::debug!("[{}] {}", self.version, statement);
            session.execute(&statement, &[])?;
        }
        Ok(())
    }
}

impl Stage for SqlStage {
    fn forward(&self, session: &dyn ShiftExecutor) -> Result<(), ShiftError> {
        self.run_script(session, &self.up)
    }

    fn backward(&self, session: &dyn ShiftExecutor) -> Result<(), ShiftError> {
        match &self.down {
            Some(down) => self.run_script(session, down),
            None => Err(ShiftError::Other(format!(
                "Version {} is irreversible: it has no down script",
                self.version
            ))),
        }
    }
}
