//! Clause helpers shared by the renderers.

use rusqlite::types::Value;

use super::Statement;
use crate::{error::Result, escape::escape};

/// Comma-separated escaped table list.
pub(super) fn table_list(stmt: &Statement) -> Result<String> {
    let tables = stmt
        .tables
        .iter()
        .map(|table| escape(table))
        .collect::<Result<Vec<_>>>()?;
    Ok(tables.join(","))
}

/// `WHERE` clause built from constraints, links and custom constraints, in
/// that order. Empty when there is nothing to constrain.
pub(super) fn where_clause(stmt: &Statement) -> String {
    let conditions: Vec<String> = stmt
        .constraints
        .keys()
        .map(|column| format!("{column}=?"))
        .chain(
            stmt.links
                .iter()
                .map(|(left, right)| format!("{left}={right}")),
        )
        .chain(
            stmt.custom_constraints
                .iter()
                .map(|fragment| format!("({fragment})")),
        )
        .collect();

    if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    }
}

pub(super) fn constraint_params(stmt: &Statement) -> impl Iterator<Item = Value> + '_ {
    stmt.constraints.values().cloned()
}

pub(super) fn tail(stmt: &Statement) -> String {
    stmt.custom_tail.join(" ")
}

/// Joins statement parts with single spaces, skipping empty ones.
pub(super) fn assemble<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(|part| part.as_ref().trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub(super) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}
