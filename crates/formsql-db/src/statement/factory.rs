use formsql_config::{
    config::{DEFAULT_MUTATION_LIMIT, DEFAULT_SELECT_LIMIT},
    StoreConfig,
};

use super::{Statement, StatementKind};

/// Creates empty statements with the configured default row limits.
///
/// Only selects render their limit. Insert, update and delete statements
/// carry the mutation limit for callers to inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementFactory {
    select_limit: u32,
    mutation_limit: u32,
}

impl Default for StatementFactory {
    fn default() -> Self {
        Self {
            select_limit: DEFAULT_SELECT_LIMIT,
            mutation_limit: DEFAULT_MUTATION_LIMIT,
        }
    }
}

impl StatementFactory {
    pub fn new(select_limit: u32, mutation_limit: u32) -> Self {
        Self {
            select_limit,
            mutation_limit,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.select_limit(), config.mutation_limit())
    }

    /// Creates an empty statement for a form action.
    ///
    /// `action` is one of `add`, `get`, `change` or `remove`, case-insensitive.
    /// Anything else yields a [`StatementKind::Null`] statement so that an
    /// unknown action does nothing.
    pub fn create(&self, action: &str, limit: Option<u32>) -> Statement {
        self.create_kind(StatementKind::from_action(action), limit)
    }

    pub fn create_kind(&self, kind: StatementKind, limit: Option<u32>) -> Statement {
        let default_limit = match kind {
            StatementKind::Select => self.select_limit,
            _ => self.mutation_limit,
        };
        Statement::new(kind, limit.unwrap_or(default_limit))
    }
}

/// Shorthand for [`StatementFactory::create`] with the default limits.
pub fn new_statement(action: &str, limit: Option<u32>) -> Statement {
    StatementFactory::default().create(action, limit)
}
