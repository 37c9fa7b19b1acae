use rusqlite::Connection;

use crate::TransactionManager;

/// Routes `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub const SCHEMA: &str = r#"
CREATE TABLE Caregivers (
    CaregiverID INTEGER PRIMARY KEY,
    Name TEXT NOT NULL UNIQUE,
    ContactNumber TEXT,
    EmailAddress TEXT
);
CREATE TABLE Children (
    ChildID INTEGER PRIMARY KEY,
    ChildName TEXT NOT NULL,
    CaregiverID INTEGER REFERENCES Caregivers(CaregiverID)
);
"#;

pub fn setup_connection() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    conn
}

pub fn setup_manager() -> TransactionManager {
    TransactionManager::from_connection(setup_connection()).unwrap()
}

pub fn count_rows(manager: &TransactionManager, table: &str) -> i64 {
    manager
        .connection()
        .query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
            row.get(0)
        })
        .unwrap()
}
