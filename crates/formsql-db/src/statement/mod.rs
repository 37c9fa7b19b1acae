//! The statement descriptor and its renderers.
//!
//! A [`Statement`] accumulates the shape of one pending statement: the tables
//! it touches, the columns it projects or writes, equality constraints, join
//! links and raw fragments. It knows nothing about SQL text until
//! [`Statement::build_sql`] hands it to the renderer for its
//! [`StatementKind`]:
//!
//! - [`StatementKind::Insert`]: `INSERT INTO t ("a","b") VALUES (?,?)`
//! - [`StatementKind::Select`]: `SELECT "t"."a" FROM t WHERE ... LIMIT n`
//! - [`StatementKind::Update`]: `UPDATE t SET "a"=? WHERE ...`
//! - [`StatementKind::Delete`]: `DELETE FROM t WHERE ...`
//! - [`StatementKind::Null`]: renders to nothing and ignores every mutation
//!
//! Identifiers are always escaped and interpolated; values are always bound as
//! parameters. The only text that reaches the statement unescaped comes from
//! [`Statement::add_custom_constraint`], [`Statement::add_custom_select`] and
//! [`Statement::add_custom_tail`]. Those fragments are meant for trusted,
//! schema-authored input and must never carry end-user text.
//!
//! # Example
//!
//! ```
//! use formsql_db::statement::{new_statement, StatementKind};
//!
//! let mut stmt = new_statement("get", None);
//! assert_eq!(stmt.kind(), StatementKind::Select);
//!
//! stmt.project("ChildName", "Children").unwrap();
//! stmt.add_constraint("ChildID", "Children", 5).unwrap();
//!
//! let (sql, params) = stmt.build_sql().unwrap();
//! assert_eq!(
//!     sql,
//!     r#"SELECT "Children"."ChildName" FROM "Children" WHERE "Children"."ChildID"=? LIMIT 1000"#
//! );
//! assert_eq!(params, vec![rusqlite::types::Value::Integer(5)]);
//! ```

mod clause;
mod delete;
mod descriptor;
mod factory;
mod insert;
mod select;
mod update;

use std::fmt;

pub use descriptor::{ProjectedFields, Statement, CUSTOM_SELECT_TABLE};
pub use factory::{new_statement, StatementFactory};

/// The closed set of statement variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Insert,
    Select,
    Update,
    Delete,
    Null,
}

impl StatementKind {
    /// Maps a form action (`add`, `get`, `change`, `remove`, any case) to a
    /// kind. Unknown actions map to [`StatementKind::Null`].
    pub fn from_action(action: &str) -> Self {
        match action.to_ascii_lowercase().as_str() {
            "add" => StatementKind::Insert,
            "get" => StatementKind::Select,
            "change" => StatementKind::Update,
            "remove" => StatementKind::Delete,
            _ => StatementKind::Null,
        }
    }

    /// Whether executing this kind may modify the store.
    pub fn changes_store(&self) -> bool {
        matches!(
            self,
            StatementKind::Insert | StatementKind::Update | StatementKind::Delete
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, StatementKind::Null)
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatementKind::Insert => "insert",
            StatementKind::Select => "select",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
            StatementKind::Null => "null",
        };
        f.write_str(name)
    }
}
