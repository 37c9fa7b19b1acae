use rusqlite::types::Value;

use super::{
    clause::{assemble, constraint_params, table_list, tail, where_clause},
    Statement,
};
use crate::{error::Result, escape::qualify};

pub(super) fn build(stmt: &Statement) -> Result<(String, Vec<Value>)> {
    let mut columns = Vec::new();
    for (table, fields) in &stmt.fields {
        for field in fields {
            columns.push(qualify(table, field)?);
        }
    }
    columns.extend(stmt.custom_select.iter().map(|(_, expr)| expr.clone()));

    let select = if columns.is_empty() {
        "*".to_string()
    } else {
        columns.join(",")
    };

    let mut params: Vec<Value> = constraint_params(stmt).collect();

    let order = match &stmt.order_by {
        Some(target) => {
            params.push(target.clone());
            let direction = if stmt.order_ascending { "ASC" } else { "DESC" };
            format!("ORDER BY ? {direction}")
        }
        None => String::new(),
    };

    let sql = assemble(&[
        format!("SELECT {select}"),
        format!("FROM {}", table_list(stmt)?),
        where_clause(stmt),
        tail(stmt),
        order,
        format!("LIMIT {}", stmt.limit),
    ]);

    Ok((sql, params))
}
