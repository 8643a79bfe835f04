//! In-memory test doubles
//!
//! `MemoryDatabase` stands in for a PostgreSQL connection in unit tests. It keeps a
//! committed snapshot and, while a session is open, a pending copy of it. Sessions
//! understand `CREATE TABLE` and `DROP TABLE` well enough to track which tables
//! exist; every other statement succeeds without effect. All statements are
//! recorded, including the one that failed.
//!
//! `MemoryVersionStore` keeps the marker in the same snapshots, so rolled-back
//! marker writes disappear along with the stages that ran before them.
//!
//! Available to other crates with the `test-helpers` feature.

use crate::executor::{ShiftError, ShiftExecutor};
use crate::migration::{Version, VersionStore, DEFAULT_VERSION_TABLE};
use crate::transaction::{Session, Transactional, TransactionError};
use may_postgres::types::ToSql;
use may_postgres::Row;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

#[derive(Debug, Clone, Default)]
struct Snapshot {
    tables: BTreeSet<String>,
    marker: Option<Version>,
}

#[derive(Debug, Default)]
struct State {
    committed: Snapshot,
    pending: Option<Snapshot>,
    statements: Vec<String>,
    fail_on: Vec<String>,
    fail_commit: bool,
    fail_begin: bool,
    commits: usize,
    rollbacks: usize,
}

impl State {
    fn visible(&self) -> &Snapshot {
        self.pending.as_ref().unwrap_or(&self.committed)
    }
}

/// In-memory stand-in for a database connection
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    state: Rc<RefCell<State>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every statement starting with `prefix` fail with a query error
    pub fn fail_on(&self, prefix: &str) {
        self.state.borrow_mut().fail_on.push(prefix.to_string());
    }

    /// Forget every `fail_on` prefix
    pub fn clear_failures(&self) {
        self.state.borrow_mut().fail_on.clear();
    }

    /// Make the next commit fail; the pending work is discarded
    pub fn fail_commit(&self) {
        self.state.borrow_mut().fail_commit = true;
    }

    /// Make opening a session fail
    pub fn fail_begin(&self) {
        self.state.borrow_mut().fail_begin = true;
    }

    /// Create `table` directly in the committed state
    pub fn create_table(&self, table: &str) {
        self.state.borrow_mut().committed.tables.insert(table.to_string());
    }

    /// Every statement executed so far, in order
    pub fn statements(&self) -> Vec<String> {
        self.state.borrow().statements.clone()
    }

    /// Whether `table` exists in the committed state
    pub fn has_table(&self, table: &str) -> bool {
        self.state.borrow().committed.tables.contains(table)
    }

    /// Committed tables, sorted by name
    pub fn tables(&self) -> Vec<String> {
        self.state.borrow().committed.tables.iter().cloned().collect()
    }

    /// Committed marker value
    pub fn committed_version(&self) -> Option<Version> {
        self.state.borrow().committed.marker.clone()
    }

    pub fn commit_count(&self) -> usize {
        self.state.borrow().commits
    }

    pub fn rollback_count(&self) -> usize {
        self.state.borrow().rollbacks
    }

    /// Whether a session is currently open
    pub fn in_session(&self) -> bool {
        self.state.borrow().pending.is_some()
    }

    /// A version store over this database using the default table name
    pub fn version_store(&self) -> MemoryVersionStore {
        MemoryVersionStore {
            state: Rc::clone(&self.state),
            table: DEFAULT_VERSION_TABLE.to_string(),
        }
    }

    /// Install `version` as if an earlier run had committed it
    pub fn install(&self, version: &str) {
        let mut state = self.state.borrow_mut();
        state.committed.tables.insert(DEFAULT_VERSION_TABLE.to_string());
        state.committed.marker = Some(Version::from(version));
    }
}

impl Transactional for MemoryDatabase {
    fn begin_session(&self) -> Result<Box<dyn Session + '_>, TransactionError> {
        let mut state = self.state.borrow_mut();
        if state.fail_begin {
            return Err(TransactionError::Other("connection refused".to_string()));
        }
        if state.pending.is_some() {
            return Err(TransactionError::Other(
                "a session is already open on this connection".to_string(),
            ));
        }
        state.pending = Some(state.committed.clone());
        Ok(Box::new(MemorySession {
            state: Rc::clone(&self.state),
            closed: false,
        }))
    }
}

/// Session over a `MemoryDatabase`; rolls back when dropped open
#[derive(Debug)]
pub struct MemorySession {
    state: Rc<RefCell<State>>,
    closed: bool,
}

fn table_name(rest: &str) -> String {
    let rest = rest.trim_start();
    let rest = rest
        .strip_prefix("IF NOT EXISTS")
        .or_else(|| rest.strip_prefix("IF EXISTS"))
        .unwrap_or(rest)
        .trim_start();
    rest.split(|c: char| c.is_whitespace() || c == '(' || c == ';')
        .next()
        .unwrap_or_default()
        .trim_matches('"')
        .to_string()
}

impl MemorySession {
    fn close(&mut self, commit: bool) -> Result<(), TransactionError> {
        self.closed = true;
        let mut state = self.state.borrow_mut();
        let pending = state.pending.take();
        if !commit {
            state.rollbacks += 1;
            return Ok(());
        }
        if state.fail_commit {
            state.fail_commit = false;
            state.rollbacks += 1;
            return Err(TransactionError::Other("could not serialize access".to_string()));
        }
        if let Some(pending) = pending {
            state.committed = pending;
        }
        state.commits += 1;
        Ok(())
    }
}

impl ShiftExecutor for MemorySession {
    fn execute(&self, query: &str, _params: &[&dyn ToSql]) -> Result<u64, ShiftError> {
        let mut state = self.state.borrow_mut();
        state.statements.push(query.to_string());
        if state.fail_on.iter().any(|p| query.starts_with(p.as_str())) {
            return Err(ShiftError::QueryError(format!("statement rejected: {query}")));
        }

        let upper = query.to_ascii_uppercase();
        let Some(pending) = state.pending.as_mut() else {
            return Err(ShiftError::Other("Transaction is closed".to_string()));
        };
        if upper.starts_with("CREATE TABLE") {
            let if_not_exists = upper["CREATE TABLE".len()..]
                .trim_start()
                .starts_with("IF NOT EXISTS");
            let name = table_name(&query["CREATE TABLE".len()..]);
            if pending.tables.contains(&name) {
                if if_not_exists {
                    return Ok(0);
                }
                return Err(ShiftError::AlreadyExists(format!(
                    "relation \"{name}\" already exists"
                )));
            }
            pending.tables.insert(name);
        } else if upper.starts_with("DROP TABLE") {
            let if_exists = upper["DROP TABLE".len()..].trim_start().starts_with("IF EXISTS");
            let name = table_name(&query["DROP TABLE".len()..]);
            if !pending.tables.remove(&name) && !if_exists {
                return Err(ShiftError::QueryError(format!(
                    "table \"{name}\" does not exist"
                )));
            }
        }
        Ok(0)
    }

    fn query_one(&self, query: &str, _params: &[&dyn ToSql]) -> Result<Row, ShiftError> {
        Err(ShiftError::QueryError(format!(
            "MemorySession cannot produce rows: {query}"
        )))
    }

    fn query_all(&self, query: &str, _params: &[&dyn ToSql]) -> Result<Vec<Row>, ShiftError> {
        self.state.borrow_mut().statements.push(query.to_string());
        Ok(Vec::new())
    }
}

impl Session for MemorySession {
    fn as_executor(&self) -> &dyn ShiftExecutor {
        self
    }

    fn commit(mut self: Box<Self>) -> Result<(), TransactionError> {
        self.close(true)
    }

    fn rollback(mut self: Box<Self>) -> Result<(), TransactionError> {
        self.close(false)
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.close(false);
        }
    }
}

/// `VersionStore` over a `MemoryDatabase`
///
/// Writes go through the session as SQL so `MemoryDatabase::fail_on` can target
/// them; the marker value itself lives in the database's pending snapshot.
#[derive(Debug, Clone)]
pub struct MemoryVersionStore {
    state: Rc<RefCell<State>>,
    table: String,
}

impl MemoryVersionStore {
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }
}

impl VersionStore for MemoryVersionStore {
    fn current_version(&self, session: &dyn ShiftExecutor) -> Result<Option<Version>, ShiftError> {
        session.query_all(&format!("SELECT current_version FROM {}", self.table), &[])?;
        let state = self.state.borrow();
        let visible = state.visible();
        if !visible.tables.contains(&self.table) {
            return Ok(None);
        }
        Ok(visible.marker.clone())
    }

    fn set_current_version(
        &self,
        session: &dyn ShiftExecutor,
        version: &Version,
    ) -> Result<(), ShiftError> {
        let exists = self.state.borrow().visible().tables.contains(&self.table);
        if !exists {
            return Err(ShiftError::QueryError(format!(
                "relation \"{}\" does not exist",
                self.table
            )));
        }
        session.execute(&format!("DELETE FROM {}", self.table), &[])?;
        session.execute(
            &format!(
                "INSERT INTO {} (current_version) VALUES ('{}')",
                self.table, version
            ),
            &[],
        )?;
        if let Some(pending) = self.state.borrow_mut().pending.as_mut() {
            pending.marker = Some(version.clone());
        }
        Ok(())
    }

    fn table_exists(&self, session: &dyn ShiftExecutor) -> Result<bool, ShiftError> {
        session.query_all(
            &format!(
                "SELECT 1 FROM information_schema.tables WHERE table_name = '{}'",
                self.table
            ),
            &[],
        )?;
        Ok(self.state.borrow().visible().tables.contains(&self.table))
    }

    fn clear(&self, session: &dyn ShiftExecutor) -> Result<(), ShiftError> {
        session.execute(&format!("DROP TABLE {}", self.table), &[])?;
        if let Some(pending) = self.state.borrow_mut().pending.as_mut() {
            pending.marker = None;
        }
        Ok(())
    }

    fn create(&self, session: &dyn ShiftExecutor) -> Result<(), ShiftError> {
        session.execute(
            &format!(
                "CREATE TABLE {} (current_version VARCHAR(255) NOT NULL)",
                self.table
            ),
            &[],
        )?;
        if let Some(pending) = self.state.borrow_mut().pending.as_mut() {
            pending.marker = None;
        }
        Ok(())
    }
}
