//! In-memory tables read from CSV, with per-column type inference.
//!
//! Cells are held as JSON values so that rows serialize directly into the
//! output artifacts. A column becomes integer, float, boolean or string
//! depending on what every non-missing cell parses as; missing cells are
//! `null`. An integer column with missing cells is widened to float.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, TransformError};

/// Cell spellings treated as missing.
const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Empty,
    Int,
    Float,
    Bool,
    Text,
}

fn is_missing(cell: &str) -> bool {
    NA_VALUES.contains(&cell)
}

fn parse_bool(cell: &str) -> Option<bool> {
    match cell.trim() {
        "True" | "TRUE" | "true" => Some(true),
        "False" | "FALSE" | "false" => Some(false),
        _ => None,
    }
}

fn infer_kind<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut present = cells.filter(|c| !is_missing(c)).peekable();
    if present.peek().is_none() {
        return ColumnKind::Empty;
    }
    let present: Vec<&str> = present.collect();

    if present.iter().all(|c| c.trim().parse::<i64>().is_ok()) {
        ColumnKind::Int
    } else if present.iter().all(|c| c.trim().parse::<f64>().is_ok()) {
        ColumnKind::Float
    } else if present.iter().all(|c| parse_bool(c).is_some()) {
        ColumnKind::Bool
    } else {
        ColumnKind::Text
    }
}

fn convert(cell: &str, kind: ColumnKind, has_missing: bool) -> Value {
    if is_missing(cell) {
        return Value::Null;
    }
    match kind {
        ColumnKind::Empty => Value::Null,
        ColumnKind::Int if has_missing => cell
            .trim()
            .parse::<i64>()
            .map_or(Value::Null, |n| Value::from(n as f64)),
        ColumnKind::Int => cell.trim().parse::<i64>().map_or(Value::Null, Value::from),
        ColumnKind::Float => cell.trim().parse::<f64>().map_or(Value::Null, Value::from),
        ColumnKind::Bool => parse_bool(cell).map_or(Value::Null, Value::Bool),
        ColumnKind::Text => Value::String(cell.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    /// Reads a CSV file with a header row.
    pub fn load(name: &str, path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| TransformError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_reader(name, file).map_err(|source| TransformError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded {} ({} rows) from {}", name, table.len(), path.display());
        Ok(table)
    }

    pub fn from_reader<R: Read>(name: &str, reader: R) -> std::result::Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let raw: Vec<csv::StringRecord> = reader.records().collect::<std::result::Result<_, _>>()?;

        let kinds: Vec<(ColumnKind, bool)> = (0..columns.len())
            .map(|i| {
                let cells = raw.iter().map(move |r| r.get(i).unwrap_or(""));
                let has_missing = cells.clone().any(is_missing);
                (infer_kind(cells), has_missing)
            })
            .collect();

        let rows = raw
            .iter()
            .map(|record| {
                kinds
                    .iter()
                    .enumerate()
                    .map(|(i, (kind, has_missing))| {
                        convert(record.get(i).unwrap_or(""), *kind, *has_missing)
                    })
                    .collect()
            })
            .collect();

        Ok(Self::new(name, columns, rows))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| TransformError::MissingColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    /// Keeps only the named columns, in the order given.
    pub fn select(&self, columns: &[&str]) -> Result<Table> {
        let indices = columns
            .iter()
            .map(|c| self.column_index(c))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.project(&indices))
    }

    /// Removes the named columns. Every name must exist.
    pub fn drop_columns(&self, columns: &[&str]) -> Result<Table> {
        let dropped = columns
            .iter()
            .map(|c| self.column_index(c))
            .collect::<Result<Vec<_>>>()?;
        let kept: Vec<usize> = (0..self.columns.len())
            .filter(|i| !dropped.contains(i))
            .collect();
        Ok(self.project(&kept))
    }

    fn project(&self, indices: &[usize]) -> Table {
        Table {
            name: self.name.clone(),
            columns: indices.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(move |values| Record {
            table: self,
            values,
        })
    }
}

/// Serializes as an array of objects, one per row, keys in column order.
impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for record in self.records() {
            seq.serialize_element(&record)?;
        }
        seq.end()
    }
}

/// A borrowed row with by-name access.
pub struct Record<'a> {
    table: &'a Table,
    values: &'a [Value],
}

impl<'a> Record<'a> {
    pub fn get(&self, column: &str) -> Result<&'a Value> {
        let idx = self.table.column_index(column)?;
        Ok(&self.values[idx])
    }
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in self.table.columns.iter().zip(self.values) {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}
