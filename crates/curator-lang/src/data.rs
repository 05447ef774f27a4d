use std::collections::HashMap;

use thiserror::Error;

/// A single cell of a [`Dataset`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v as f64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DatasetError {
    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),
    #[error("Row {row} has {found} values but the dataset has {expected} columns")]
    RowWidth { row: usize, expected: usize, found: usize },
}

/// Row-major table of samples with named columns. Row identity is its position.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Result<Self, DatasetError> {
        let mut dataset = Dataset::default();
        for name in columns {
            let name = name.into();
            if dataset.index.contains_key(&name) {
                return Err(DatasetError::DuplicateColumn(name));
            }
            dataset.index.insert(name.clone(), dataset.columns.len());
            dataset.columns.push(name);
        }
        Ok(dataset)
    }

    pub fn push_row(&mut self, values: Vec<Value>) -> Result<(), DatasetError> {
        if values.len() != self.columns.len() {
            return Err(DatasetError::RowWidth {
                row: self.rows.len(),
                expected: self.columns.len(),
                found: values.len(),
            });
        }
        self.rows.push(values);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, row: usize) -> &[Value] {
        &self.rows[row]
    }

    pub fn value(&self, row: usize, column: usize) -> &Value {
        &self.rows[row][column]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_dataset() {
        let mut ds = Dataset::new(["age", "name"]).unwrap();
        ds.push_row(vec![30.0.into(), "ann".into()]).unwrap();
        ds.push_row(vec![Value::Null, "bob".into()]).unwrap();

        assert_eq!(ds.len(), 2);
        assert_eq!(ds.column_index("name"), Some(1));
        assert_eq!(ds.value(1, 0), &Value::Null);
    }

    #[test]
    fn test_dataset_errors() {
        assert_eq!(
            Dataset::new(["a", "a"]).unwrap_err(),
            DatasetError::DuplicateColumn("a".to_string())
        );

        let mut ds = Dataset::new(["a"]).unwrap();
        assert!(matches!(
            ds.push_row(vec![]),
            Err(DatasetError::RowWidth { row: 0, expected: 1, found: 0 })
        ));
    }
}
