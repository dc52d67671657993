use serde::Serialize;
use serde_json::{Map, Value};

pub type Row = Map<String, Value>;

/// Rows returned by a query plus the column order the query produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TabularResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnClass {
    Numeric,
    NonNumeric,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnProfile {
    pub name: String,
    pub class: ColumnClass,
}

impl TabularResult {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of `column` in every row; missing cells read as null.
    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.rows
            .iter()
            .map(move |row| row.get(column).unwrap_or(&Value::Null))
    }

    /// Classifies each column, in column order.
    ///
    /// A column is numeric when it has at least one non-null value and every
    /// non-null value is a number.
    pub fn profile(&self) -> Vec<ColumnProfile> {
        self.columns
            .iter()
            .map(|name| {
                let mut values = self.column_values(name).filter(|v| !v.is_null()).peekable();
                let numeric = values.peek().is_some() && values.all(Value::is_number);
                ColumnProfile {
                    name: name.clone(),
                    class: if numeric {
                        ColumnClass::Numeric
                    } else {
                        ColumnClass::NonNumeric
                    },
                }
            })
            .collect()
    }

    pub fn numeric_columns(&self) -> Vec<String> {
        self.profile()
            .into_iter()
            .filter(|p| p.class == ColumnClass::Numeric)
            .map(|p| p.name)
            .collect()
    }
}
