//! Minimal row-oriented table used as the exchange format between
//! retrieval rules and the collector.
//!
//! A cell is a `serde_json::Value`, a record maps column names to cells,
//! and a table is an ordered list of records. Row order is preserved by
//! every operation in this module.

use std::collections::{HashMap, HashSet};
use std::io::BufRead;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::util;

pub type Record = Map<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("missing column `{column}` in row {row}")]
    MissingColumn { column: String, row: usize },

    #[error("invalid value in column `{column}` at row {row}: expected {expected}, got {found}")]
    InvalidCell {
        column: String,
        row: usize,
        expected: &'static str,
        found: Value,
    },

    #[error("malformed table input at line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read table input: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Table {
    rows: Vec<Record>,
}

impl Table {
    pub fn new(rows: Vec<Record>) -> Self {
        Self { rows }
    }

    /// Build a table from JSON values, each of which must be an object.
    ///
    /// Mostly useful for tests and inline config tables.
    pub fn from_values(values: Vec<Value>) -> Result<Self, TableError> {
        let rows = values
            .into_iter()
            .enumerate()
            .map(|(row, value)| match value {
                Value::Object(record) => Ok(record),
                other => Err(TableError::InvalidCell {
                    column: String::new(),
                    row,
                    expected: "object",
                    found: other,
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rows })
    }

    /// Parse a JSON array of objects.
    pub fn from_json_reader<R: BufRead>(reader: R) -> Result<Self, TableError> {
        serde_json::from_reader(reader).map_err(|source| TableError::Parse {
            line: source.line(),
            source,
        })
    }

    /// Parse JSON lines (one object per line). Blank lines are skipped.
    pub fn from_json_lines<R: BufRead>(reader: R) -> Result<Self, TableError> {
        let mut rows = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let record: Record = serde_json::from_str(&line)
                .map_err(|source| TableError::Parse { line: idx + 1, source })?;
            rows.push(record);
        }

        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    /// Returns the cell at (`row`, `column`), failing if the column is absent.
    pub fn cell(&self, row: usize, column: &str) -> Result<&Value, TableError> {
        self.rows[row]
            .get(column)
            .ok_or_else(|| TableError::MissingColumn {
                column: column.to_string(),
                row,
            })
    }

    /// Returns a nullable numeric cell as `f64`.
    pub fn number(&self, row: usize, column: &str) -> Result<Option<f64>, TableError> {
        match self.cell(row, column)? {
            Value::Null => Ok(None),
            Value::Number(n) => Ok(n.as_f64()),
            other => Err(TableError::InvalidCell {
                column: column.to_string(),
                row,
                expected: "number",
                found: other.clone(),
            }),
        }
    }

    /// Returns a nullable text cell. Non-string scalars are rendered as JSON.
    pub fn text(&self, row: usize, column: &str) -> Result<Option<String>, TableError> {
        match self.cell(row, column)? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s.clone())),
            other => Ok(Some(other.to_string())),
        }
    }

    /// Drop rows whose `column` cell is in `excluded`.
    ///
    /// Returns the number of rows removed. Every row must carry `column`.
    pub fn retain_not_in(
        &mut self,
        column: &str,
        excluded: &HashSet<String>,
    ) -> Result<usize, TableError> {
        for row in 0..self.rows.len() {
            self.cell(row, column)?;
        }

        let before = self.rows.len();
        if !excluded.is_empty() {
            self.rows.retain(|record| {
                record
                    .get(column)
                    .is_none_or(|v| !excluded.contains(&util::cell_key(v)))
            });
        }

        Ok(before - self.rows.len())
    }

    /// Index row positions by the composite key over `columns`.
    ///
    /// Rows whose key contains a null are left out of the index.
    /// Positions within each bucket stay in row order.
    pub fn index_by(&self, columns: &[String]) -> Result<HashMap<String, Vec<usize>>, TableError> {
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();

        for row in 0..self.rows.len() {
            let parts = columns
                .iter()
                .map(|c| self.cell(row, c))
                .collect::<Result<Vec<_>, _>>()?;

            if let Some(key) = util::join_key(&parts) {
                index.entry(key).or_default().push(row);
            }
        }

        Ok(index)
    }
}

impl From<Vec<Record>> for Table {
    fn from(rows: Vec<Record>) -> Self {
        Self::new(rows)
    }
}
