//! Form-driven access to a SQLite store.
//!
//! [`Statement`]s are built up field by field from form input and rendered to
//! parameterized SQL. A [`TransactionManager`] executes them inside a single
//! long transaction, pushing a savepoint after every change so the latest one
//! can be undone before the user decides to commit or roll back.

pub mod error;
pub mod escape;
pub mod result;
pub mod statement;
pub mod transaction;

#[cfg(test)]
mod test_utils;

pub use error::{DbError, InvalidCharClass, Result, StoreFailure};
pub use escape::{escape, escape_utf16, escape_with, escape_without_literal, InvalidCharPolicy};
pub use result::ResultSet;
pub use statement::{new_statement, Statement, StatementFactory, StatementKind};
pub use transaction::TransactionManager;
