use indexmap::{IndexMap, IndexSet};
use rusqlite::types::Value;

use super::{delete, insert, select, update, StatementKind};
use crate::{
    error::Result,
    escape::{escape, qualify},
};

/// Table name → projected column names, in the order they were added.
pub type ProjectedFields = IndexMap<String, Vec<String>>;

/// Pseudo-table under which [`Statement::projected_fields`] lists the labels
/// of custom select expressions.
pub const CUSTOM_SELECT_TABLE: &str = " ";

/// Accumulates the shape of one statement before it is rendered.
///
/// Every mutator validates the identifiers it receives immediately and records
/// the table it touches. On a [`StatementKind::Null`] statement all mutators
/// are no-ops.
#[derive(Debug, Clone)]
pub struct Statement {
    pub(super) kind: StatementKind,
    pub(super) tables: IndexSet<String>,
    pub(super) fields: ProjectedFields,
    /// Escaped column → bound value. Position decides parameter order.
    pub(super) data: IndexMap<String, Value>,
    /// Qualified escaped column → bound value.
    pub(super) constraints: IndexMap<String, Value>,
    /// Qualified escaped column → qualified escaped column.
    pub(super) links: IndexMap<String, String>,
    pub(super) custom_constraints: Vec<String>,
    pub(super) custom_select: Vec<(String, String)>,
    pub(super) custom_tail: Vec<String>,
    pub(super) order_by: Option<Value>,
    pub(super) order_ascending: bool,
    pub(super) limit: u32,
}

impl Statement {
    pub fn new(kind: StatementKind, limit: u32) -> Self {
        Self {
            kind,
            tables: IndexSet::new(),
            fields: IndexMap::new(),
            data: IndexMap::new(),
            constraints: IndexMap::new(),
            links: IndexMap::new(),
            custom_constraints: vec![],
            custom_select: vec![],
            custom_tail: vec![],
            order_by: None,
            order_ascending: true,
            limit,
        }
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Tables referenced so far, in first-use order.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(String::as_str)
    }

    pub fn changes_store(&self) -> bool {
        self.kind.changes_store()
    }

    /// Whether any insert or update field has been written.
    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }

    /// Records `"table"."field" = value`.
    pub fn add_constraint(
        &mut self,
        field: &str,
        table: &str,
        value: impl Into<Value>,
    ) -> Result<&mut Self> {
        if self.kind.is_null() {
            return Ok(self);
        }
        let key = qualify(table, field)?;
        self.constraints.insert(key, value.into());
        self.tables.insert(table.to_string());
        Ok(self)
    }

    /// Records the join condition `"table1"."field1" = "table2"."field2"`.
    pub fn add_link(
        &mut self,
        field1: &str,
        table1: &str,
        field2: &str,
        table2: &str,
    ) -> Result<&mut Self> {
        if self.kind.is_null() {
            return Ok(self);
        }
        let left = qualify(table1, field1)?;
        let right = qualify(table2, field2)?;
        self.links.insert(left, right);
        self.tables.insert(table1.to_string());
        self.tables.insert(table2.to_string());
        Ok(self)
    }

    /// Appends a raw boolean expression, ANDed with the other constraints.
    ///
    /// The fragment is interpolated verbatim. Only pass trusted,
    /// schema-authored text.
    pub fn add_custom_constraint(&mut self, fragment: impl Into<String>) -> &mut Self {
        if !self.kind.is_null() {
            self.custom_constraints.push(fragment.into());
        }
        self
    }

    /// Appends a raw expression to the select list, shown under `label`.
    ///
    /// The expression is interpolated verbatim. Only pass trusted,
    /// schema-authored text.
    pub fn add_custom_select(
        &mut self,
        label: impl Into<String>,
        expression: impl Into<String>,
    ) -> &mut Self {
        if !self.kind.is_null() {
            self.custom_select.push((label.into(), expression.into()));
        }
        self
    }

    /// Appends raw SQL after the constraint clause, e.g. `GROUP BY ...`.
    ///
    /// The fragment is interpolated verbatim. Only pass trusted,
    /// schema-authored text.
    pub fn add_custom_tail(&mut self, fragment: impl Into<String>) -> &mut Self {
        if !self.kind.is_null() {
            self.custom_tail.push(fragment.into());
        }
        self
    }

    /// Records a field for the statement.
    ///
    /// - Select: projects `table.field`; any value is ignored.
    /// - Insert/Update: writes `value` (NULL when absent) to `field`. A later
    ///   write to the same field replaces the earlier value in place.
    /// - Delete: only records the table.
    pub fn set_data(&mut self, field: &str, table: &str, value: Option<Value>) -> Result<&mut Self> {
        match self.kind {
            StatementKind::Null => return Ok(self),
            StatementKind::Select => {
                qualify(table, field)?;
                let columns = self.fields.entry(table.to_string()).or_default();
                if !columns.iter().any(|c| c == field) {
                    columns.push(field.to_string());
                }
            }
            StatementKind::Insert | StatementKind::Update => {
                escape(table)?;
                let key = escape(field)?;
                self.data.insert(key, value.unwrap_or(Value::Null));
            }
            StatementKind::Delete => {
                escape(table)?;
            }
        }
        self.tables.insert(table.to_string());
        Ok(self)
    }

    /// Projects `table.field` in a select.
    pub fn project(&mut self, field: &str, table: &str) -> Result<&mut Self> {
        self.set_data(field, table, None)
    }

    /// Writes `value` to `field` in an insert or update.
    pub fn set(&mut self, field: &str, table: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.set_data(field, table, Some(value.into()))
    }

    /// Orders a select by a bound value.
    pub fn order_by(&mut self, target: impl Into<Value>, ascending: bool) -> &mut Self {
        if !self.kind.is_null() {
            self.order_by = Some(target.into());
            self.order_ascending = ascending;
        }
        self
    }

    pub fn set_limit(&mut self, limit: u32) -> &mut Self {
        if !self.kind.is_null() {
            self.limit = limit;
        }
        self
    }

    /// Columns a select will return, grouped by table, for result headers.
    ///
    /// Custom select labels are listed under [`CUSTOM_SELECT_TABLE`]. Returns
    /// `None` for every other kind.
    pub fn projected_fields(&self) -> Option<ProjectedFields> {
        if self.kind != StatementKind::Select {
            return None;
        }
        let mut fields = self.fields.clone();
        if !self.custom_select.is_empty() {
            fields.insert(
                CUSTOM_SELECT_TABLE.to_string(),
                self.custom_select
                    .iter()
                    .map(|(label, _)| label.clone())
                    .collect(),
            );
        }
        Some(fields)
    }

    /// Forgets everything recorded so the statement can be reused. Kind,
    /// limit and ordering (target and direction) are kept.
    pub fn clear(&mut self) {
        self.tables.clear();
        self.fields.clear();
        self.data.clear();
        self.constraints.clear();
        self.links.clear();
        self.custom_constraints.clear();
        self.custom_select.clear();
        self.custom_tail.clear();
    }

    /// Renders the statement text and its bound parameters.
    ///
    /// Placeholders appear in the text in the same order as the parameters.
    pub fn build_sql(&self) -> Result<(String, Vec<Value>)> {
        match self.kind {
            StatementKind::Insert => insert::build(self),
            StatementKind::Select => select::build(self),
            StatementKind::Update => update::build(self),
            StatementKind::Delete => delete::build(self),
            StatementKind::Null => Ok((String::new(), vec![])),
        }
    }
}
