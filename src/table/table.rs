//! Column-major table values
//!
//! A [`Table`] is an ordered set of named [`Column`]s that all share one row
//! count. A table with zero columns has zero rows.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::types::ScalarKind;
use super::value::Value;
use crate::error::{Error, Result};

/// A typed column of values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    kind: ScalarKind,
    values: Vec<Value>,
}

impl Column {
    /// Build a column, inferring its kind from the values
    pub fn new(values: Vec<Value>) -> Self {
        Self::with_hint(None, values)
    }

    /// Build a column starting from a kind hint (typically the engine's
    /// declared type). Values that do not fit widen the kind; every value is
    /// then coerced to the final kind.
    pub fn with_hint(hint: Option<ScalarKind>, values: Vec<Value>) -> Self {
        let kind = values
            .iter()
            .fold(hint.unwrap_or(ScalarKind::Null), |kind, v| {
                kind.unify(v.kind())
            });
        let values = values.into_iter().map(|v| v.coerce(kind)).collect();
        Self { kind, values }
    }

    /// A column of `len` copies of `value`
    pub fn repeat(value: Value, len: usize) -> Self {
        Self::new(vec![value; len])
    }

    /// Kind of the column
    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    /// All values
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consume the column, returning its values
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Get a value by row index
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the column is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keep the values whose mask entry is truthy
    pub fn filter(&self, mask: &[bool]) -> Column {
        let values = self
            .values
            .iter()
            .zip(mask)
            .filter(|(_, keep)| **keep)
            .map(|(v, _)| v.clone())
            .collect();
        Column {
            kind: self.kind,
            values,
        }
    }

    /// First `n` values
    pub fn head(&self, n: usize) -> Column {
        Column {
            kind: self.kind,
            values: self.values.iter().take(n).cloned().collect(),
        }
    }
}

/// An in-memory table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    columns: IndexMap<String, Column>,
}

impl Table {
    /// Create a new table with no columns
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from row-major data, as read from the engine.
    ///
    /// `hints` is either empty or holds one optional kind per column.
    pub fn from_rows(
        names: Vec<String>,
        hints: Vec<Option<ScalarKind>>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self> {
        let mut data: Vec<Vec<Value>> = names
            .iter()
            .map(|_| Vec::with_capacity(rows.len()))
            .collect();
        for (r, row) in rows.into_iter().enumerate() {
            if row.len() != names.len() {
                return Err(Error::Internal(format!(
                    "row {} has {} value(s), expected {}",
                    r,
                    row.len(),
                    names.len()
                )));
            }
            for (i, value) in row.into_iter().enumerate() {
                data[i].push(value);
            }
        }

        let mut table = Table::new();
        for (i, (name, values)) in names.into_iter().zip(data).enumerate() {
            let hint = hints.get(i).copied().flatten();
            table.set_column(name, Column::with_hint(hint, values))?;
        }
        Ok(table)
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.columns.values().next().map_or(0, Column::len)
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Check if the table has no columns
    pub fn has_no_columns(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in declaration order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    /// Get column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Iterate over `(name, column)` pairs in order
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(n, c)| (n.as_str(), c))
    }

    /// Check if column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Add or replace a column.
    ///
    /// The column must match the table's row count, except when it is the
    /// only column (replacing it, or the first column of an empty table).
    pub fn set_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        let sole = self.columns.is_empty()
            || (self.columns.len() == 1 && self.columns.contains_key(&name));
        if !sole && column.len() != self.row_count() {
            return Err(Error::ColumnLength {
                column: name,
                expected: self.row_count(),
                found: column.len(),
            });
        }
        self.columns.insert(name, column);
        Ok(())
    }

    /// Remove a column, preserving the order of the others
    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        self.columns.shift_remove(name)
    }

    /// Values of one row
    pub fn row(&self, index: usize) -> Option<Vec<Value>> {
        if index >= self.row_count() {
            return None;
        }
        Some(
            self.columns
                .values()
                .map(|c| c.values()[index].clone())
                .collect(),
        )
    }

    /// Iterate over rows as value vectors
    pub fn rows(&self) -> impl Iterator<Item = Vec<Value>> + '_ {
        (0..self.row_count()).filter_map(move |i| self.row(i))
    }

    /// Keep the rows whose mask entry is true
    pub fn filter(&self, mask: &[bool]) -> Result<Table> {
        if mask.len() != self.row_count() {
            return Err(Error::ColumnLength {
                column: "<mask>".to_string(),
                expected: self.row_count(),
                found: mask.len(),
            });
        }
        Ok(Table {
            columns: self
                .columns
                .iter()
                .map(|(n, c)| (n.clone(), c.filter(mask)))
                .collect(),
        })
    }

    /// First `n` rows
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .map(|(name, c)| (name.clone(), c.head(n)))
                .collect(),
        }
    }

    /// Check the row-count invariant; used after deserialization
    pub fn validate(&self) -> Result<()> {
        let rows = self.row_count();
        for (name, column) in &self.columns {
            if column.len() != rows {
                return Err(Error::ColumnLength {
                    column: name.clone(),
                    expected: rows,
                    found: column.len(),
                });
            }
            let misfit = column
                .values()
                .iter()
                .find(|v| !v.is_null() && v.kind() != column.kind());
            if let Some(bad) = misfit {
                return Err(Error::Internal(format!(
                    "column '{}' of kind {} holds a {} value",
                    name,
                    column.kind(),
                    bad.type_name()
                )));
            }
        }
        Ok(())
    }
}

// Column order is part of a table's identity
impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(other.columns.iter())
                .all(|(a, b)| a == b)
    }
}

/// Builder for creating tables with a fluent API
pub struct TableBuilder {
    table: Table,
    error: Option<Error>,
}

impl TableBuilder {
    /// Start building a new table
    pub fn new() -> Self {
        Self {
            table: Table::new(),
            error: None,
        }
    }

    /// Add a column
    pub fn column<V: Into<Value>>(mut self, name: &str, values: Vec<V>) -> Self {
        let column = Column::new(values.into_iter().map(Into::into).collect());
        if self.error.is_none() {
            if let Err(e) = self.table.set_column(name, column) {
                self.error = Some(e);
            }
        }
        self
    }

    /// Finish the table
    pub fn build(self) -> Result<Table> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.table),
        }
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> Table {
        TableBuilder::new()
            .column("id", vec![1i64, 2, 3])
            .column("amount", vec![9.5, 3.0, 1.25])
            .build()
            .unwrap()
    }

    #[test]
    fn test_table_creation() {
        let table = orders();
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_names(), vec!["id", "amount"]);
        assert_eq!(table.column("id").unwrap().kind(), ScalarKind::Integer);
        assert_eq!(table.column("amount").unwrap().kind(), ScalarKind::Real);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let mut table = orders();
        let result = table.set_column("bad", Column::new(vec![Value::Integer(1)]));
        assert!(matches!(result, Err(Error::ColumnLength { expected: 3, found: 1, .. })));
    }

    #[test]
    fn test_sole_column_may_change_length() {
        let mut table = TableBuilder::new().column("a", vec![1i64, 2]).build().unwrap();
        table
            .set_column("a", Column::new(vec![Value::Integer(7)]))
            .unwrap();
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_mixed_values_widen() {
        let column = Column::new(vec![Value::Integer(1), Value::Real(2.5), Value::Null]);
        assert_eq!(column.kind(), ScalarKind::Real);
        assert_eq!(column.values()[0], Value::Real(1.0));

        let column = Column::new(vec![Value::Integer(1), Value::from("x")]);
        assert_eq!(column.kind(), ScalarKind::Text);
        assert_eq!(column.values()[0], Value::from("1"));
    }

    #[test]
    fn test_from_rows_uses_hints() {
        let table = Table::from_rows(
            vec!["n".to_string()],
            vec![Some(ScalarKind::Real)],
            vec![vec![Value::Integer(1)], vec![Value::Integer(2)]],
        )
        .unwrap();
        assert_eq!(table.column("n").unwrap().kind(), ScalarKind::Real);
        assert_eq!(table.row(1).unwrap(), vec![Value::Real(2.0)]);
    }

    #[test]
    fn test_filter_and_head() {
        let table = orders();
        let filtered = table.filter(&[true, false, true]).unwrap();
        assert_eq!(filtered.row_count(), 2);
        assert_eq!(filtered.row(1).unwrap()[0], Value::Integer(3));
        assert_eq!(table.head(1).row_count(), 1);
        assert!(table.filter(&[true]).is_err());
    }

    #[test]
    fn test_equality_respects_column_order() {
        let a = TableBuilder::new()
            .column("x", vec![1i64])
            .column("y", vec![2i64])
            .build()
            .unwrap();
        let b = TableBuilder::new()
            .column("y", vec![2i64])
            .column("x", vec![1i64])
            .build()
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }
}
