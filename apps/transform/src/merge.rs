//! Key-based joins between two tables.
//!
//! Left row order is preserved, and each left row yields one output row per
//! matching right row (in right order). Output columns are the left columns
//! followed by the right columns; when both sides join on the same column
//! name it appears once. Other names present on both sides get the
//! configured suffixes.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{Result, TransformError};
use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Keep only left rows with at least one partner.
    Inner,
    /// Keep every left row; unmatched ones get nulls for the right columns.
    Left,
}

#[derive(Debug, Clone, Copy)]
pub struct Join<'a> {
    pub left_on: &'a str,
    pub right_on: &'a str,
    pub kind: JoinKind,
    pub suffixes: (&'a str, &'a str),
}

impl<'a> Join<'a> {
    pub fn on(column: &'a str, kind: JoinKind) -> Self {
        Self {
            left_on: column,
            right_on: column,
            kind,
            suffixes: ("_x", "_y"),
        }
    }

    pub fn suffixes(mut self, left: &'a str, right: &'a str) -> Self {
        self.suffixes = (left, right);
        self
    }
}

/// Hashable join key. Integral floats fold into integers so a float-typed
/// key column still matches an integer one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum JoinKey {
    Int(i64),
    Float(u64),
    Bool(bool),
    Text(String),
}

impl JoinKey {
    /// Null and structured values never match anything.
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Some(JoinKey::Int(i));
                }
                let f = n.as_f64()?;
                if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    Some(JoinKey::Int(f as i64))
                } else {
                    Some(JoinKey::Float(f.to_bits()))
                }
            }
            Value::Bool(b) => Some(JoinKey::Bool(*b)),
            Value::String(s) => Some(JoinKey::Text(s.clone())),
            _ => None,
        }
    }
}

pub fn merge(left: &Table, right: &Table, join: Join<'_>) -> Result<Table> {
    let left_key = left.column_index(join.left_on)?;
    let right_key = right.column_index(join.right_on)?;
    let coalesce_key = join.left_on == join.right_on;

    let right_kept: Vec<usize> = (0..right.columns().len())
        .filter(|&i| !(coalesce_key && i == right_key))
        .collect();

    let columns = output_columns(left, right, &right_kept, join)?;

    let mut index: HashMap<JoinKey, Vec<usize>> = HashMap::new();
    for (pos, row) in right.rows().iter().enumerate() {
        if let Some(key) = JoinKey::from_value(&row[right_key]) {
            index.entry(key).or_default().push(pos);
        }
    }

    let mut rows = Vec::new();
    for left_row in left.rows() {
        let matches = JoinKey::from_value(&left_row[left_key])
            .and_then(|key| index.get(&key))
            .map(Vec::as_slice)
            .unwrap_or_default();

        if matches.is_empty() {
            if join.kind == JoinKind::Left {
                let mut row = left_row.clone();
                row.extend(right_kept.iter().map(|_| Value::Null));
                rows.push(row);
            }
            continue;
        }

        for &pos in matches {
            let right_row = &right.rows()[pos];
            let mut row = left_row.clone();
            row.extend(right_kept.iter().map(|&i| right_row[i].clone()));
            rows.push(row);
        }
    }

    Ok(Table::new(left.name(), columns, rows))
}

fn output_columns(
    left: &Table,
    right: &Table,
    right_kept: &[usize],
    join: Join<'_>,
) -> Result<Vec<String>> {
    let right_names: Vec<&str> = right_kept
        .iter()
        .map(|&i| right.columns()[i].as_str())
        .collect();
    let overlaps = |name: &str| {
        left.columns().iter().any(|c| c == name) && right_names.contains(&name)
    };

    let (left_suffix, right_suffix) = join.suffixes;
    let mut columns: Vec<String> = left
        .columns()
        .iter()
        .map(|c| {
            if overlaps(c.as_str()) {
                format!("{c}{left_suffix}")
            } else {
                c.clone()
            }
        })
        .collect();
    columns.extend(right_names.iter().map(|&c| {
        if overlaps(c) {
            format!("{c}{right_suffix}")
        } else {
            c.to_string()
        }
    }));

    for (i, name) in columns.iter().enumerate() {
        if columns[..i].contains(name) {
            return Err(TransformError::DuplicateColumn(name.clone()));
        }
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(name: &str, csv: &str) -> Table {
        Table::from_reader(name, csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_left_join_keeps_unmatched_rows() {
        let companies = table("companies", "id,name\n1,Acme\n2,Globex\n3,Initech\n");
        let industry = table("industry", "id,growth_rate\n1,4.5\n3,1.5\n")
            .select(&["id", "growth_rate"])
            .unwrap();

        let merged = merge(&companies, &industry, Join::on("id", JoinKind::Left)).unwrap();
        assert_eq!(merged.columns(), ["id", "name", "growth_rate"]);
        assert_eq!(merged.rows()[0][2], json!(4.5));
        assert_eq!(merged.rows()[1][2], Value::Null);
        assert_eq!(merged.rows()[2][2], json!(1.5));
    }

    #[test]
    fn test_inner_join_drops_unmatched_and_keeps_left_order() {
        let jobs = table("jobs", "id,title\n3,C\n1,A\n2,B\n");
        let education = table("education", "job_id,required_education\n1,BSc\n3,MSc\n");

        let merged = merge(
            &jobs,
            &education,
            Join {
                left_on: "id",
                right_on: "job_id",
                kind: JoinKind::Inner,
                suffixes: ("", "_education"),
            },
        )
        .unwrap();

        assert_eq!(merged.columns(), ["id", "title", "job_id", "required_education"]);
        let titles: Vec<&Value> = merged.rows().iter().map(|r| &r[1]).collect();
        assert_eq!(titles, [&json!("C"), &json!("A")]);
    }

    #[test]
    fn test_overlapping_columns_are_suffixed() {
        let jobs = table("jobs", "id,title\n1,A\n");
        let education = table("education", "id,job_id,title\n10,1,Degree\n");

        let merged = merge(
            &jobs,
            &education,
            Join {
                left_on: "id",
                right_on: "job_id",
                kind: JoinKind::Inner,
                suffixes: ("", "_education"),
            },
        )
        .unwrap();

        assert_eq!(
            merged.columns(),
            ["id", "title", "id_education", "job_id", "title_education"]
        );
        assert_eq!(merged.rows()[0][0], json!(1));
        assert_eq!(merged.rows()[0][2], json!(10));
    }

    #[test]
    fn test_duplicate_partners_fan_out() {
        let left = table("l", "id,v\n1,a\n");
        let right = table("r", "id,w\n1,x\n1,y\n");
        let merged = merge(&left, &right, Join::on("id", JoinKind::Inner)).unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_float_keys_match_integer_keys() {
        let left = table("l", "id\n1\n2\n");
        let right = table("r", "id,w\n1,x\n,y\n2,z\n");
        let merged = merge(&left, &right, Join::on("id", JoinKind::Inner)).unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_missing_key_column_fails() {
        let left = table("l", "id\n1\n");
        let right = table("r", "other\n1\n");
        assert!(matches!(
            merge(&left, &right, Join::on("id", JoinKind::Inner)),
            Err(TransformError::MissingColumn { .. })
        ));
    }
}
