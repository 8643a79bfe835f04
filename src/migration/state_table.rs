//! Version marker storage
//!
//! The currently installed version lives in a single-row table inside the migrated
//! database, so it commits and rolls back together with the stages that produced it.
//! A missing table means "never installed or fully removed"; a table with no row
//! reads the same way.

use crate::executor::{ShiftError, ShiftExecutor};
use crate::migration::version::Version;
use crate::migration::MigrationError;
use regex::Regex;

/// Default name of the version marker table
pub const DEFAULT_VERSION_TABLE: &str = "dbshift_version";

/// Persisted "currently installed version" record
///
/// Every operation runs through the caller's session. `current_version` never
/// creates anything; only `create` does.
pub trait VersionStore {
    /// Read the marker. `None` when the table is missing or holds no row.
    fn current_version(&self, session: &dyn ShiftExecutor) -> Result<Option<Version>, ShiftError>;

    /// Replace the marker with exactly one record holding `version`.
    fn set_current_version(
        &self,
        session: &dyn ShiftExecutor,
        version: &Version,
    ) -> Result<(), ShiftError>;

    /// Whether the marker table exists, with or without a row.
    fn table_exists(&self, session: &dyn ShiftExecutor) -> Result<bool, ShiftError>;

    /// Remove the marker table entirely.
    fn clear(&self, session: &dyn ShiftExecutor) -> Result<(), ShiftError>;

    /// Create the marker table. Fails with `ShiftError::AlreadyExists` when it is there.
    fn create(&self, session: &dyn ShiftExecutor) -> Result<(), ShiftError>;
}

/// `VersionStore` backed by a PostgreSQL table
#[derive(Debug, Clone)]
pub struct SqlVersionStore {
    table: String,
}

impl SqlVersionStore {
    /// Create a store over `table`, which must be a plain SQL identifier
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::InvalidFormat` for names that are not
    /// `[A-Za-z_][A-Za-z0-9_]*` or longer than PostgreSQL's 63-byte limit.
    pub fn new(table: impl Into<String>) -> Result<Self, MigrationError> {
        let table = table.into();
        let re = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$")
            .map_err(|e| MigrationError::InvalidFormat(format!("Invalid regex: {}", e)))?;
        if !re.is_match(&table) {
            return Err(MigrationError::InvalidFormat(format!(
                "Version table name '{}' is not a valid identifier",
                table
            )));
        }
        Ok(Self { table })
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    fn exists_sql() -> &'static str {
        "SELECT 1 FROM information_schema.tables \
         WHERE table_schema = current_schema() AND table_name = $1"
    }

    fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE {} (current_version VARCHAR(255) NOT NULL)",
            self.table
        )
    }

    fn select_sql(&self) -> String {
        format!("SELECT current_version FROM {} LIMIT 1", self.table)
    }

    fn delete_sql(&self) -> String {
        format!("DELETE FROM {}", self.table)
    }

    fn insert_sql(&self) -> String {
        format!("INSERT INTO {} (current_version) VALUES ($1)", self.table)
    }

    fn drop_sql(&self) -> String {
        format!("DROP TABLE {}", self.table)
    }
}

impl Default for SqlVersionStore {
    fn default() -> Self {
        Self {
            table: DEFAULT_VERSION_TABLE.to_string(),
        }
    }
}

impl VersionStore for SqlVersionStore {
    fn current_version(&self, session: &dyn ShiftExecutor) -> Result<Option<Version>, ShiftError> {
        // Checked first: selecting from a missing table would abort the session.
        if !self.table_exists(session)? {
            return Ok(None);
        }
        let rows = session.query_all(&self.select_sql(), &[])?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };
        let raw: String = row
            .try_get(0)
            .map_err(|e| ShiftError::ParseError(format!("current_version: {e}")))?;
        Ok(Some(Version::from(raw.trim())))
    }

    fn set_current_version(
        &self,
        session: &dyn ShiftExecutor,
        version: &Version,
    ) -> Result<(), ShiftError> {
        session.execute(&self.delete_sql(), &[])?;
        session.execute(&self.insert_sql(), &[&version.as_str()])?;
        log::info!("Changed to version {}.", version);
        Ok(())
    }

    fn table_exists(&self, session: &dyn ShiftExecutor) -> Result<bool, ShiftError> {
        let rows = session.query_all(Self::exists_sql(), &[&self.table])?;
        Ok(!rows.is_empty())
    }

    fn clear(&self, session: &dyn ShiftExecutor) -> Result<(), ShiftError> {
        session.execute(&self.drop_sql(), &[])?;
        Ok(())
    }

    fn create(&self, session: &dyn ShiftExecutor) -> Result<(), ShiftError> {
        session.execute(&self.create_table_sql(), &[])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_name() {
        assert_eq!(SqlVersionStore::default().table(), "dbshift_version");
    }

    #[test]
    fn test_rejects_unsafe_table_names() {
        for name in ["", "1table", "version; DROP TABLE users", "a-b", "\"quoted\""] {
            assert!(SqlVersionStore::new(name).is_err(), "should reject {name:?}");
        }
        let too_long = "a".repeat(64);
        assert!(SqlVersionStore::new(too_long).is_err());
    }

    #[test]
    fn test_accepts_plain_identifiers() {
        for name in ["dbup_version", "_schema_marker", "V2"] {
            assert!(SqlVersionStore::new(name).is_ok(), "should accept {name:?}");
        }
    }

    #[test]
    fn test_statements_target_configured_table() {
        let store = SqlVersionStore::new("app_version").unwrap();
        assert_eq!(
            store.create_table_sql(),
            "CREATE TABLE app_version (current_version VARCHAR(255) NOT NULL)"
        );
        assert_eq!(store.select_sql(), "SELECT current_version FROM app_version LIMIT 1");
        assert_eq!(store.delete_sql(), "DELETE FROM app_version");
        assert_eq!(
            store.insert_sql(),
            "INSERT INTO app_version (current_version) VALUES ($1)"
        );
        assert_eq!(store.drop_sql(), "DROP TABLE app_version");
    }

    #[test]
    fn test_create_does_not_use_if_not_exists() {
        // An existing table must surface as AlreadyExists rather than pass silently.
        let store = SqlVersionStore::default();
        assert!(!store.create_table_sql().contains("IF NOT EXISTS"));
    }
}
