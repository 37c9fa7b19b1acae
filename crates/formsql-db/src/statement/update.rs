use rusqlite::types::Value;

use super::{
    clause::{assemble, constraint_params, table_list, tail, where_clause},
    Statement,
};
use crate::error::Result;

pub(super) fn build(stmt: &Statement) -> Result<(String, Vec<Value>)> {
    let assignments = stmt
        .data
        .keys()
        .map(|column| format!("{column}=?"))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = assemble(&[
        format!("UPDATE {}", table_list(stmt)?),
        format!("SET {assignments}"),
        where_clause(stmt),
        tail(stmt),
    ]);

    let params = stmt
        .data
        .values()
        .cloned()
        .chain(constraint_params(stmt))
        .collect();

    Ok((sql, params))
}
