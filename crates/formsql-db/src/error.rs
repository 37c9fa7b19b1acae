//! Error types for formsql-db.

use std::fmt;

use miette::Diagnostic;
use rusqlite::{ffi, types::Value};
use thiserror::Error;

/// The class of code point that made an identifier invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidCharClass {
    Nul,
    HighSurrogate,
    LowSurrogate,
    NonCharacter,
}

impl fmt::Display for InvalidCharClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InvalidCharClass::Nul => "NUL",
            InvalidCharClass::HighSurrogate => "high-surrogate",
            InvalidCharClass::LowSurrogate => "low-surrogate",
            InvalidCharClass::NonCharacter => "non-character",
        };
        f.write_str(name)
    }
}

/// Why the store refused a statement, for user-facing feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFailure {
    Unique,
    PrimaryKey,
    ForeignKey,
    NotNull,
    Check,
    Other,
}

impl StoreFailure {
    pub fn classify(err: &rusqlite::Error) -> Self {
        let rusqlite::Error::SqliteFailure(failure, _) = err else {
            return StoreFailure::Other;
        };
        match failure.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE => StoreFailure::Unique,
            ffi::SQLITE_CONSTRAINT_PRIMARYKEY => StoreFailure::PrimaryKey,
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => StoreFailure::ForeignKey,
            ffi::SQLITE_CONSTRAINT_NOTNULL => StoreFailure::NotNull,
            ffi::SQLITE_CONSTRAINT_CHECK => StoreFailure::Check,
            _ => StoreFailure::Other,
        }
    }

    /// Short explanation suitable for showing next to a form.
    pub fn message(&self) -> &'static str {
        match self {
            StoreFailure::Unique | StoreFailure::PrimaryKey => "Already exists",
            StoreFailure::ForeignKey => "Refers to a record that does not exist",
            StoreFailure::NotNull => "A required field is missing",
            StoreFailure::Check => "A value is out of range",
            StoreFailure::Other => "The store rejected the change",
        }
    }
}

#[derive(Error, Diagnostic, Debug)]
pub enum DbError {
    #[error("SQLite identifier contains {class} character: {identifier:?}")]
    #[diagnostic(
        code(formsql_db::invalid_identifier),
        help("Remove the character or escape with a replacement policy")
    )]
    InvalidIdentifier {
        class: InvalidCharClass,
        identifier: String,
    },

    #[error("Cannot write a row without any data fields")]
    #[diagnostic(
        code(formsql_db::empty_statement),
        help("Set at least one field before submitting an insert or update")
    )]
    EmptyStatement,

    #[error("Statement failed: {source}\n  sql: {sql}\n  params: {params:?}")]
    #[diagnostic(code(formsql_db::store_execution))]
    StoreExecution {
        sql: String,
        params: Vec<Value>,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Store connection error: {0}")]
    #[diagnostic(
        code(formsql_db::connection),
        help("Check if the database file exists and is accessible")
    )]
    Connection(#[from] rusqlite::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] formsql_config::ConfigError),
}

impl DbError {
    /// Classifies a store execution failure. `None` for every other error.
    pub fn store_failure(&self) -> Option<StoreFailure> {
        match self {
            DbError::StoreExecution { source, .. } => Some(StoreFailure::classify(source)),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
