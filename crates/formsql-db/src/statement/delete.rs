use rusqlite::types::Value;

use super::{
    clause::{assemble, constraint_params, table_list, tail, where_clause},
    Statement,
};
use crate::error::Result;

pub(super) fn build(stmt: &Statement) -> Result<(String, Vec<Value>)> {
    let sql = assemble(&[
        format!("DELETE FROM {}", table_list(stmt)?),
        where_clause(stmt),
        tail(stmt),
    ]);
    let params = constraint_params(stmt).collect();

    Ok((sql, params))
}
