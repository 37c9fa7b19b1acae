//! Transaction management with single-step undo.
//!
//! The manager owns the only connection to the store. Every statement runs
//! inside one long transaction that is opened by a baseline savepoint. After
//! each statement that may have changed the store a new savepoint is pushed,
//! so the most recent change can be rolled back without touching anything
//! before it:
//!
//! ```text
//! SAVEPOINT s1            baseline
//! INSERT ...   SAVEPOINT s2
//! INSERT ...   SAVEPOINT s3
//! undo         ROLLBACK TO s2   (second insert gone, first kept)
//! ```
//!
//! Undo is single-step: once the latest change has been undone the restored
//! savepoint becomes the new baseline, and further undos do nothing until
//! another change is made. Commit and rollback end the transaction and start
//! over from a fresh baseline.

use std::path::Path;

use formsql_config::{config::DEFAULT_SAVEPOINT_PREFIX, StoreConfig};
use rusqlite::{types::Value, Connection, ToSql};
use tracing::{debug, error, info, trace, warn};

use crate::{
    error::{DbError, Result},
    result::ResultSet,
    statement::{Statement, StatementFactory, StatementKind},
};

pub struct TransactionManager {
    conn: Connection,
    /// Number of the most recently pushed savepoint.
    savepoint: u32,
    /// Savepoint that undo cannot go past.
    baseline: u32,
    prefix: String,
    factory: StatementFactory,
}

impl TransactionManager {
    /// Opens the store at `path` with default settings.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Opens the store named by a resolved configuration.
    pub fn open_with(config: &StoreConfig) -> Result<Self> {
        let path = config.get_database_path();
        debug!("opening store at {}", path.display());

        let conn = Connection::open(&path)?;
        if config.foreign_keys() {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        }
        if let Some(timeout) = config.busy_timeout() {
            conn.busy_timeout(timeout)?;
        }

        Self::with_settings(
            conn,
            config.savepoint_prefix().to_string(),
            StatementFactory::from_config(config),
        )
    }

    /// Takes over an already prepared connection, e.g. one whose schema was
    /// just created.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        Self::with_settings(
            conn,
            DEFAULT_SAVEPOINT_PREFIX.to_string(),
            StatementFactory::default(),
        )
    }

    fn with_settings(conn: Connection, prefix: String, factory: StatementFactory) -> Result<Self> {
        let mut manager = Self {
            conn,
            savepoint: 0,
            baseline: 0,
            prefix,
            factory,
        };
        manager.reset_savepoints()?;
        Ok(manager)
    }

    /// Creates an empty statement for a form action, see
    /// [`StatementFactory::create`].
    pub fn new_statement(&self, action: &str, limit: Option<u32>) -> Statement {
        self.factory.create(action, limit)
    }

    /// Renders and executes `statement`, returning its rows.
    ///
    /// A savepoint is pushed after every successful insert, update or delete.
    /// Store errors are returned with the statement text and parameters
    /// attached; nothing is rolled back automatically. If the store itself
    /// aborted the transaction, undo history starts over from a new baseline.
    ///
    /// An update without data fails with [`DbError::EmptyStatement`] before
    /// reaching the store.
    pub fn handle(&mut self, statement: &Statement) -> Result<ResultSet> {
        if statement.kind().is_null() {
            trace!("skipping null statement");
            return Ok(ResultSet::default());
        }
        if statement.kind() == StatementKind::Update && !statement.has_data() {
            return Err(DbError::EmptyStatement);
        }

        let (sql, params) = statement.build_sql()?;
        debug!(kind = %statement.kind(), "executing {sql} with {params:?}");

        let result = match self.run(&sql, &params) {
            Ok(result) => result,
            Err(source) => {
                error!("statement failed: {source}\n  sql: {sql}\n  params: {params:?}");
                if self.conn.is_autocommit() {
                    warn!("store aborted the transaction, undo history discarded");
                    if let Err(err) = self.reset_savepoints() {
                        error!("failed to re-establish baseline savepoint: {err}");
                    }
                }
                return Err(DbError::StoreExecution {
                    sql,
                    params,
                    source,
                });
            }
        };

        if statement.changes_store() {
            self.push_savepoint()?;
        }

        Ok(result)
    }

    fn run(&self, sql: &str, params: &[Value]) -> rusqlite::Result<ResultSet> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let params_ref: Vec<&dyn ToSql> = params.iter().map(|v| v as &dyn ToSql).collect();
        let mut rows = stmt.query(params_ref.as_slice())?;

        let mut collected = Vec::new();
        while let Some(row) = rows.next()? {
            let values = (0..columns.len())
                .map(|idx| row.get::<_, Value>(idx))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            collected.push(values);
        }
        drop(rows);

        let affected = if columns.is_empty() {
            self.conn.changes()
        } else {
            0
        };

        Ok(ResultSet {
            columns,
            rows: collected,
            affected,
        })
    }

    /// Commits every change so far. Undo history starts over afterwards.
    pub fn commit(&mut self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        info!("committed changes");
        self.reset_savepoints()
    }

    /// Discards every uncommitted change. Undo history starts over afterwards.
    pub fn rollback(&mut self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        info!("rolled back uncommitted changes");
        self.reset_savepoints()
    }

    /// Reverts the most recent change.
    ///
    /// Returns `false` without touching the store when there is nothing to
    /// undo.
    pub fn undo(&mut self) -> Result<bool> {
        if self.savepoint <= self.baseline {
            trace!("nothing to undo");
            return Ok(false);
        }

        self.savepoint -= 1;
        let name = self.savepoint_name(self.savepoint);
        self.conn.execute_batch(&format!("ROLLBACK TO {name}"))?;
        self.baseline = self.savepoint;
        debug!("rolled back to savepoint {name}");
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        self.savepoint > self.baseline
    }

    /// Number of the most recently pushed savepoint. `1` is the baseline of
    /// a fresh transaction.
    pub fn savepoint_depth(&self) -> u32 {
        self.savepoint
    }

    /// The underlying connection, for inspecting the store.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Commits or rolls back, then closes the connection.
    pub fn finish(mut self, save: bool) -> Result<()> {
        if save {
            self.commit()?;
        } else {
            self.rollback()?;
        }
        self.close()
    }

    /// Releases the connection. Uncommitted changes are discarded by the store.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, err)| DbError::Connection(err))?;
        debug!("store connection closed");
        Ok(())
    }

    fn savepoint_name(&self, number: u32) -> String {
        format!("{}{}", self.prefix, number)
    }

    fn push_savepoint(&mut self) -> Result<()> {
        self.savepoint += 1;
        let name = self.savepoint_name(self.savepoint);
        self.conn.execute_batch(&format!("SAVEPOINT {name}"))?;
        trace!("pushed savepoint {name}");
        Ok(())
    }

    fn reset_savepoints(&mut self) -> Result<()> {
        self.savepoint = 0;
        self.push_savepoint()?;
        self.baseline = self.savepoint;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::{
        error::StoreFailure,
        statement::new_statement,
        test_utils::{count_rows, setup_connection, setup_manager, SCHEMA},
    };

    fn insert_caregiver(name: &str) -> Statement {
        let mut stmt = new_statement("add", None);
        stmt.set("Name", "Caregivers", name.to_string()).unwrap();
        stmt
    }

    fn caregiver_names(manager: &mut TransactionManager) -> Vec<Value> {
        let mut stmt = manager.new_statement("get", None);
        stmt.project("Name", "Caregivers").unwrap();
        manager
            .handle(&stmt)
            .unwrap()
            .rows
            .into_iter()
            .map(|mut row| row.remove(0))
            .collect()
    }

    #[test]
    fn test_handle_insert_and_select() {
        let mut manager = setup_manager();

        let result = manager.handle(&insert_caregiver("Alice")).unwrap();
        assert_eq!(result.affected, 1);
        assert!(result.is_empty());

        let mut stmt = manager.new_statement("get", None);
        stmt.project("CaregiverID", "Caregivers").unwrap();
        stmt.project("Name", "Caregivers").unwrap();
        stmt.add_constraint("Name", "Caregivers", "Alice".to_string())
            .unwrap();

        let result = manager.handle(&stmt).unwrap();
        assert_eq!(result.columns, vec!["CaregiverID", "Name"]);
        assert_eq!(
            result.rows,
            vec![vec![Value::Integer(1), Value::Text("Alice".to_string())]]
        );
    }

    #[test]
    fn test_savepoints_follow_mutations_only() {
        let mut manager = setup_manager();
        assert_eq!(manager.savepoint_depth(), 1);
        assert!(!manager.can_undo());

        manager.handle(&insert_caregiver("Alice")).unwrap();
        assert_eq!(manager.savepoint_depth(), 2);

        let mut select = manager.new_statement("get", None);
        select.project("Name", "Caregivers").unwrap();
        manager.handle(&select).unwrap();
        assert_eq!(manager.savepoint_depth(), 2);

        let null = manager.new_statement("bogus", None);
        assert_eq!(manager.handle(&null).unwrap(), ResultSet::default());
        assert_eq!(manager.savepoint_depth(), 2);
    }

    #[test]
    fn test_undo_reverts_only_latest_change() {
        let mut manager = setup_manager();

        manager.handle(&insert_caregiver("Alice")).unwrap();
        manager.handle(&insert_caregiver("Bob")).unwrap();
        assert_eq!(count_rows(&manager, "Caregivers"), 2);

        assert!(manager.undo().unwrap());
        assert_eq!(
            caregiver_names(&mut manager),
            vec![Value::Text("Alice".to_string())]
        );

        // Second undo is a no-op.
        assert!(!manager.undo().unwrap());
        assert_eq!(
            caregiver_names(&mut manager),
            vec![Value::Text("Alice".to_string())]
        );
    }

    #[test]
    fn test_undo_after_new_change() {
        let mut manager = setup_manager();

        manager.handle(&insert_caregiver("Alice")).unwrap();
        manager.handle(&insert_caregiver("Bob")).unwrap();
        manager.undo().unwrap();

        manager.handle(&insert_caregiver("Carol")).unwrap();
        assert_eq!(count_rows(&manager, "Caregivers"), 2);

        assert!(manager.undo().unwrap());
        assert_eq!(
            caregiver_names(&mut manager),
            vec![Value::Text("Alice".to_string())]
        );
    }

    #[test]
    fn test_undo_update_and_delete() {
        let mut manager = setup_manager();
        manager.handle(&insert_caregiver("Alice")).unwrap();

        let mut update = manager.new_statement("change", None);
        update
            .set("EmailAddress", "Caregivers", "alice@example.com".to_string())
            .unwrap();
        update
            .add_constraint("Name", "Caregivers", "Alice".to_string())
            .unwrap();
        assert_eq!(manager.handle(&update).unwrap().affected, 1);
        manager.undo().unwrap();

        let email: Option<String> = manager
            .connection()
            .query_row("SELECT EmailAddress FROM Caregivers", [], |row| row.get(0))
            .unwrap();
        assert_eq!(email, None);

        let mut delete = manager.new_statement("remove", None);
        delete
            .add_constraint("Name", "Caregivers", "Alice".to_string())
            .unwrap();
        manager.handle(&delete).unwrap();
        assert_eq!(count_rows(&manager, "Caregivers"), 0);

        manager.undo().unwrap();
        assert_eq!(count_rows(&manager, "Caregivers"), 1);
    }

    #[test]
    fn test_commit_resets_undo_history() {
        let mut manager = setup_manager();

        manager.handle(&insert_caregiver("Alice")).unwrap();
        manager.handle(&insert_caregiver("Bob")).unwrap();
        manager.commit().unwrap();

        assert_eq!(manager.savepoint_depth(), 1);
        assert!(!manager.undo().unwrap());
        assert_eq!(count_rows(&manager, "Caregivers"), 2);
    }

    #[test]
    fn test_rollback_discards_uncommitted() {
        let mut manager = setup_manager();

        manager.handle(&insert_caregiver("Alice")).unwrap();
        manager.commit().unwrap();
        manager.handle(&insert_caregiver("Bob")).unwrap();
        manager.handle(&insert_caregiver("Carol")).unwrap();
        manager.rollback().unwrap();

        assert_eq!(manager.savepoint_depth(), 1);
        assert!(!manager.undo().unwrap());
        assert_eq!(
            caregiver_names(&mut manager),
            vec![Value::Text("Alice".to_string())]
        );
    }

    #[test]
    fn test_store_error_carries_statement() {
        let mut manager = setup_manager();
        manager.handle(&insert_caregiver("Alice")).unwrap();

        let err = manager.handle(&insert_caregiver("Alice")).unwrap_err();
        match &err {
            DbError::StoreExecution { sql, params, .. } => {
                assert_eq!(sql, r#"INSERT INTO "Caregivers" ("Name") VALUES (?)"#);
                assert_eq!(params, &vec![Value::Text("Alice".to_string())]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.store_failure(), Some(StoreFailure::Unique));
        assert_eq!(StoreFailure::Unique.message(), "Already exists");

        // The failure pushed no savepoint and the earlier insert survives.
        assert_eq!(manager.savepoint_depth(), 2);
        assert_eq!(count_rows(&manager, "Caregivers"), 1);
    }

    #[test]
    fn test_foreign_key_failure() {
        let mut manager = setup_manager();

        let mut stmt = manager.new_statement("add", None);
        stmt.set("ChildName", "Children", "Sam".to_string()).unwrap();
        stmt.set("CaregiverID", "Children", 99).unwrap();

        let err = manager.handle(&stmt).unwrap_err();
        assert_eq!(err.store_failure(), Some(StoreFailure::ForeignKey));
    }

    #[test]
    fn test_empty_insert_never_reaches_store() {
        let mut manager = setup_manager();
        let stmt = manager.new_statement("add", None);

        let err = manager.handle(&stmt).unwrap_err();
        assert!(matches!(err, DbError::EmptyStatement));
        assert!(err.store_failure().is_none());
        assert_eq!(manager.savepoint_depth(), 1);
    }

    #[test]
    fn test_custom_savepoint_prefix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch(SCHEMA)
            .unwrap();

        let config = StoreConfig::from_toml_str(&format!(
            "database_path = {:?}\nsavepoint_prefix = \"step_\"\nselect_limit = 1",
            path.display().to_string()
        ))
        .unwrap();
        let mut manager = TransactionManager::open_with(&config).unwrap();

        manager.handle(&insert_caregiver("Alice")).unwrap();
        manager.handle(&insert_caregiver("Bob")).unwrap();
        assert!(manager.undo().unwrap());
        assert_eq!(count_rows(&manager, "Caregivers"), 1);

        let stmt = manager.new_statement("get", None);
        assert_eq!(stmt.limit(), 1);
        manager.close().unwrap();
    }

    #[test]
    fn test_commit_persists_across_sessions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch(SCHEMA)
            .unwrap();

        let mut manager = TransactionManager::open(&path).unwrap();
        manager.handle(&insert_caregiver("Alice")).unwrap();
        manager.finish(true).unwrap();

        let mut manager = TransactionManager::open(&path).unwrap();
        manager.handle(&insert_caregiver("Bob")).unwrap();
        manager.finish(false).unwrap();

        let mut manager = TransactionManager::open(&path).unwrap();
        manager.handle(&insert_caregiver("Carol")).unwrap();
        manager.close().unwrap();

        let manager = TransactionManager::open(&path).unwrap();
        assert_eq!(count_rows(&manager, "Caregivers"), 1);
    }

    #[test]
    fn test_from_prepared_connection() {
        let conn = setup_connection();
        conn.execute("INSERT INTO Caregivers (Name) VALUES ('Seed')", [])
            .unwrap();

        let mut manager = TransactionManager::from_connection(conn).unwrap();
        assert!(!manager.undo().unwrap());
        assert_eq!(count_rows(&manager, "Caregivers"), 1);
    }

    #[test]
    fn test_store_aborted_transaction_resets_baseline() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE Tags (Name TEXT UNIQUE ON CONFLICT ROLLBACK);")
            .unwrap();
        let mut manager = TransactionManager::from_connection(conn).unwrap();

        let insert_tag = |name: &str| {
            let mut stmt = new_statement("add", None);
            stmt.set("Name", "Tags", name.to_string()).unwrap();
            stmt
        };

        manager.handle(&insert_tag("A")).unwrap();
        let err = manager.handle(&insert_tag("A")).unwrap_err();
        assert_eq!(err.store_failure(), Some(StoreFailure::Unique));

        // The conflict rolled back the whole transaction, first insert included.
        assert!(!manager.connection().is_autocommit());
        assert_eq!(manager.savepoint_depth(), 1);
        assert!(!manager.can_undo());
        assert_eq!(count_rows(&manager, "Tags"), 0);

        manager.handle(&insert_tag("B")).unwrap();
        assert!(manager.undo().unwrap());
        assert_eq!(count_rows(&manager, "Tags"), 0);

        manager.handle(&insert_tag("B")).unwrap();
        manager.rollback().unwrap();
        assert_eq!(count_rows(&manager, "Tags"), 0);
    }

    #[test]
    fn test_empty_update_never_reaches_store() {
        let mut manager = setup_manager();
        manager.handle(&insert_caregiver("Alice")).unwrap();

        let mut stmt = manager.new_statement("change", None);
        stmt.add_constraint("Name", "Caregivers", "Alice".to_string())
            .unwrap();

        let err = manager.handle(&stmt).unwrap_err();
        assert!(matches!(err, DbError::EmptyStatement));
        assert_eq!(manager.savepoint_depth(), 2);
        assert!(manager.can_undo());
    }
}
