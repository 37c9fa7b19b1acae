use rusqlite::types::Value;

/// Rows returned by executing a statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Column names as reported by the store.
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    /// Rows changed by a mutating statement; zero for reads.
    pub affected: u64,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[Value]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Values of one column across all rows, looked up by name.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }
}
