use rusqlite::types::Value;

use super::{
    clause::{assemble, placeholders, table_list, tail},
    Statement,
};
use crate::error::{DbError, Result};

pub(super) fn build(stmt: &Statement) -> Result<(String, Vec<Value>)> {
    if stmt.data.is_empty() {
        return Err(DbError::EmptyStatement);
    }

    let columns = stmt
        .data
        .keys()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",");
    let values = format!("({columns}) VALUES ({})", placeholders(stmt.data.len()));

    let sql = assemble(&[
        "INSERT INTO".to_string(),
        table_list(stmt)?,
        values,
        tail(stmt),
    ]);
    let params = stmt.data.values().cloned().collect();

    Ok((sql, params))
}
