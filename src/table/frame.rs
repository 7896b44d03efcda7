use std::collections::HashSet;

use super::{TableError, Value};

/// A 2-D table: labelled rows, named columns, one `Value` per cell.
///
/// Cells are stored column-major; every column has exactly as many values as
/// the index has labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    index_name: Option<String>,
    index: Vec<Value>,
    columns: Vec<String>,
    data: Vec<Vec<Value>>,
}

impl Frame {
    pub fn new(
        index_name: Option<String>,
        index: Vec<Value>,
        columns: Vec<(String, Vec<Value>)>,
    ) -> Result<Self, TableError> {
        let mut seen = HashSet::with_capacity(columns.len());
        let mut names = Vec::with_capacity(columns.len());
        let mut data = Vec::with_capacity(columns.len());
        for (name, values) in columns {
            if values.len() != index.len() {
                return Err(TableError::LengthMismatch {
                    column: name,
                    expected: index.len(),
                    actual: values.len(),
                });
            }
            if !seen.insert(name.clone()) {
                return Err(TableError::DuplicateColumn(name));
            }
            names.push(name);
            data.push(values);
        }
        Ok(Self {
            index_name,
            index,
            columns: names,
            data,
        })
    }

    pub fn index_name(&self) -> Option<&str> {
        self.index_name.as_deref()
    }

    pub fn index(&self) -> &[Value] {
        &self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn num_rows(&self) -> usize {
        self.index.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.position(name).map(|i| self.data[i].as_slice())
    }

    /// Cell at the first row labelled `row`, in column `column`.
    pub fn get(&self, row: &Value, column: &str) -> Option<&Value> {
        let c = self.position(column)?;
        let r = self.index.iter().position(|v| v == row)?;
        Some(&self.data[c][r])
    }

    /// Detaches a column, returning its values.
    pub fn remove_column(&mut self, name: &str) -> Option<Vec<Value>> {
        let i = self.position(name)?;
        self.columns.remove(i);
        Some(self.data.remove(i))
    }

    /// Splits the frame into its index and its named columns.
    pub fn into_parts(self) -> (Option<String>, Vec<Value>, Vec<(String, Vec<Value>)>) {
        let columns = self.columns.into_iter().zip(self.data).collect();
        (self.index_name, self.index, columns)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}
