//! Result rows and execution results exchanged with the driver.

use crate::error::{OrmError, OrmResult};
use crate::value::{FromValue, Value};
use std::sync::Arc;

/// One result row: column names plus values in the same order.
///
/// Rows of one result set usually share the same `columns` allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row. Fails if the number of values differs from the number of columns.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> OrmResult<Self> {
        if columns.len() != values.len() {
            return Err(OrmError::Other(format!(
                "row has {} columns but {} values",
                columns.len(),
                values.len()
            )));
        }
        Ok(Self { columns, values })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a column by name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Typed access to a column, returning `OrmError::Decode` on failure.
    pub fn try_get_column<T: FromValue>(&self, column: &str) -> OrmResult<T> {
        let value = self
            .get(column)
            .cloned()
            .ok_or_else(|| OrmError::UnknownColumn(column.to_string()))?;
        T::from_value(value).map_err(|e| OrmError::decode(column, e.to_string()))
    }

    /// Iterate over `(column, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }
}

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Id generated by the statement, if the driver reports one.
    pub last_insert_id: Option<i64>,
}

impl ExecResult {
    pub fn new(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            last_insert_id: None,
        }
    }

    pub fn with_last_insert_id(mut self, id: i64) -> Self {
        self.last_insert_id = Some(id);
        self
    }
}
