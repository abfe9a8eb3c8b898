//! Tabular model backing the contacts database.
//!
//! A `Table` is an ordered set of named columns plus rows of optional string
//! cells. Column order is significant: the sheet write-back emits columns in
//! table order, and the reconciler relies on `clean_columns` to restore the
//! stored schema after a join. Cells are `None` only where a join had no
//! matching side; values read from a sheet are always `Some`, including
//! empty strings.

use std::collections::HashMap;

use regex::Regex;
use thiserror::Error;

/// A single table cell. `None` marks a join non-match, not an empty value.
pub type Cell = Option<String>;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Row has {found} cells, table has {expected} columns")]
    RowWidth { expected: usize, found: usize },

    #[error("Column schemas differ: {0}")]
    SchemaMismatch(String),

    #[error("Invalid column pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// An ordered, fixed-schema table of optional string cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// An empty table with the given column schema.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// A table from a schema and pre-built rows. Every row must match the
    /// column count exactly.
    pub fn with_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self, TableError> {
        for row in &rows {
            if row.len() != columns.len() {
                return Err(TableError::RowWidth {
                    expected: columns.len(),
                    found: row.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    fn require_column(&self, name: &str) -> Result<usize, TableError> {
        self.column_index(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// All values of one column, in row order.
    pub fn column_values(&self, name: &str) -> Result<Vec<Cell>, TableError> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(|row| row[idx].clone()).collect())
    }

    /// Append another table's rows. Schemas must match exactly.
    pub fn append(&mut self, other: Table) -> Result<(), TableError> {
        if self.columns != other.columns {
            return Err(TableError::SchemaMismatch(format!(
                "{:?} vs {:?}",
                self.columns, other.columns
            )));
        }
        self.rows.extend(other.rows);
        Ok(())
    }

    /// Stable sort by one column, comparing cell strings. `None` sorts as
    /// the empty string. Descending is the reconciler's default direction.
    pub fn sort_by_column(&mut self, name: &str, ascending: bool) -> Result<(), TableError> {
        let idx = self.require_column(name)?;
        self.rows.sort_by(|a, b| {
            let left = a[idx].as_deref().unwrap_or("");
            let right = b[idx].as_deref().unwrap_or("");
            if ascending {
                left.cmp(right)
            } else {
                right.cmp(left)
            }
        });
        Ok(())
    }

    /// Projection to the named columns, in the given order.
    pub fn select(&self, columns: &[String]) -> Result<Table, TableError> {
        let indices = columns
            .iter()
            .map(|name| self.require_column(name))
            .collect::<Result<Vec<_>, _>>()?;
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(Table {
            columns: columns.to_vec(),
            rows,
        })
    }

    /// Post-join cleanup: drop the listed columns, strip join suffixes from
    /// the remaining column names via `suffix_pattern` (an alternation such
    /// as `_new|_old`), and, when a canonical order is supplied, reindex to
    /// exactly that order. The reindex doubles as a schema-conformance
    /// check: a canonical column the cleaned table lacks is an error.
    pub fn clean_columns(
        &self,
        drop_columns: &[String],
        suffix_pattern: &str,
        canonical: Option<&[String]>,
    ) -> Result<Table, TableError> {
        let pattern = Regex::new(suffix_pattern)?;

        let mut drop_indices = Vec::with_capacity(drop_columns.len());
        for name in drop_columns {
            drop_indices.push(self.require_column(name)?);
        }

        let mut columns = Vec::new();
        let mut keep_indices = Vec::new();
        for (i, name) in self.columns.iter().enumerate() {
            if drop_indices.contains(&i) {
                continue;
            }
            columns.push(pattern.replace_all(name, "").into_owned());
            keep_indices.push(i);
        }

        let rows = self
            .rows
            .iter()
            .map(|row| keep_indices.iter().map(|&i| row[i].clone()).collect())
            .collect();

        let cleaned = Table { columns, rows };
        match canonical {
            Some(order) => cleaned.select(order),
            None => Ok(cleaned),
        }
    }

    /// Build a table from raw sheet values. The first row is the header;
    /// data rows shorter than the header (the Sheets API omits trailing
    /// empty cells) are padded with empty strings, longer rows truncated.
    pub fn from_sheet_values(values: Vec<Vec<String>>) -> Table {
        let mut iter = values.into_iter();
        let columns: Vec<String> = iter.next().unwrap_or_default();
        let width = columns.len();
        let rows = iter
            .map(|mut row| {
                row.resize(width, String::new());
                row.into_iter().map(Some).collect()
            })
            .collect();
        Table { columns, rows }
    }

    /// Flatten back to sheet values: header first, `None` cells as empty.
    pub fn to_sheet_values(&self) -> Vec<Vec<String>> {
        let mut values = Vec::with_capacity(self.rows.len() + 1);
        values.push(self.columns.clone());
        for row in &self.rows {
            values.push(
                row.iter()
                    .map(|cell| cell.clone().unwrap_or_default())
                    .collect(),
            );
        }
        values
    }
}

/// Concatenate tables in order. Schemas must match exactly.
pub fn concat(tables: Vec<Table>) -> Result<Table, TableError> {
    let mut iter = tables.into_iter();
    let mut result = match iter.next() {
        Some(first) => first,
        None => return Ok(Table::new(Vec::new())),
    };
    for table in iter {
        result.append(table)?;
    }
    Ok(result)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum JoinKind {
    Outer,
    Inner,
}

/// Outer join on the merge columns. Conflicting non-key columns get the
/// left/right suffixes; unmatched sides contribute `None` cells. Output
/// order is left rows first (in order), then unmatched right rows.
pub fn outer_join(
    left: &Table,
    right: &Table,
    on: &[String],
    suffixes: (&str, &str),
) -> Result<Table, TableError> {
    join(left, right, on, suffixes, JoinKind::Outer)
}

/// Inner join on the merge columns: matched key pairs only.
pub fn inner_join(
    left: &Table,
    right: &Table,
    on: &[String],
    suffixes: (&str, &str),
) -> Result<Table, TableError> {
    join(left, right, on, suffixes, JoinKind::Inner)
}

fn join(
    left: &Table,
    right: &Table,
    on: &[String],
    suffixes: (&str, &str),
    kind: JoinKind,
) -> Result<Table, TableError> {
    let left_key: Vec<usize> = on
        .iter()
        .map(|name| left.require_column(name))
        .collect::<Result<_, _>>()?;
    let right_key: Vec<usize> = on
        .iter()
        .map(|name| right.require_column(name))
        .collect::<Result<_, _>>()?;

    let left_data: Vec<usize> = (0..left.columns.len())
        .filter(|i| !left_key.contains(i))
        .collect();
    let right_data: Vec<usize> = (0..right.columns.len())
        .filter(|i| !right_key.contains(i))
        .collect();

    // A non-key column present on both sides is tagged; a side-unique
    // column keeps its name, matching the reference join semantics.
    let suffixed = |name: &str, suffix: &str, other: &Table, other_key: &[usize]| -> String {
        let collides = other
            .columns
            .iter()
            .enumerate()
            .any(|(i, c)| !other_key.contains(&i) && c == name);
        if collides {
            format!("{}{}", name, suffix)
        } else {
            name.to_string()
        }
    };

    let mut columns: Vec<String> = on.to_vec();
    for &i in &left_data {
        columns.push(suffixed(&left.columns[i], suffixes.0, right, &right_key));
    }
    for &i in &right_data {
        columns.push(suffixed(&right.columns[i], suffixes.1, left, &left_key));
    }

    // Hash the right side by merge-key tuple.
    let mut right_index: HashMap<Vec<Cell>, Vec<usize>> = HashMap::new();
    for (row_idx, row) in right.rows.iter().enumerate() {
        let key: Vec<Cell> = right_key.iter().map(|&i| row[i].clone()).collect();
        right_index.entry(key).or_default().push(row_idx);
    }

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    let mut matched_right: Vec<bool> = vec![false; right.rows.len()];

    for row in &left.rows {
        let key: Vec<Cell> = left_key.iter().map(|&i| row[i].clone()).collect();
        match right_index.get(&key) {
            Some(partners) => {
                for &r in partners {
                    matched_right[r] = true;
                    let mut out = key.clone();
                    out.extend(left_data.iter().map(|&i| row[i].clone()));
                    out.extend(right_data.iter().map(|&i| right.rows[r][i].clone()));
                    rows.push(out);
                }
            }
            None if kind == JoinKind::Outer => {
                let mut out = key;
                out.extend(left_data.iter().map(|&i| row[i].clone()));
                out.extend(right_data.iter().map(|_| None));
                rows.push(out);
            }
            None => {}
        }
    }

    if kind == JoinKind::Outer {
        for (r, row) in right.rows.iter().enumerate() {
            if matched_right[r] {
                continue;
            }
            let mut out: Vec<Cell> = right_key.iter().map(|&i| row[i].clone()).collect();
            out.extend(left_data.iter().map(|_| None));
            out.extend(right_data.iter().map(|&i| row[i].clone()));
            rows.push(out);
        }
    }

    Ok(Table { columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(value: &str) -> Cell {
        Some(value.to_string())
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn sample() -> Table {
        Table::with_rows(
            cols(&["EMAIL", "COMPANY", "LAST_OUTREACH"]),
            vec![
                vec![cell("a@x.com"), cell("Acme"), cell("2024-01-01")],
                vec![cell("b@y.com"), cell("Globex"), cell("2024-02-01")],
            ],
        )
        .unwrap()
    }

    #[test]
    fn push_row_rejects_wrong_width() {
        let mut table = Table::new(cols(&["EMAIL", "COMPANY"]));
        let err = table.push_row(vec![cell("a@x.com")]).unwrap_err();
        assert!(matches!(
            err,
            TableError::RowWidth {
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn clean_columns_drops_strips_and_reorders() {
        let table = Table::with_rows(
            cols(&["EMAIL", "COMPANY_new", "COMPANY_old", "LAST_OUTREACH_new"]),
            vec![vec![cell("a@x.com"), cell("New"), cell("Old"), cell("2024-06-01")]],
        )
        .unwrap();

        let cleaned = table
            .clean_columns(
                &cols(&["COMPANY_old"]),
                "_new|_old",
                Some(&cols(&["EMAIL", "COMPANY", "LAST_OUTREACH"])),
            )
            .unwrap();

        assert_eq!(cleaned.columns(), cols(&["EMAIL", "COMPANY", "LAST_OUTREACH"]));
        assert_eq!(
            cleaned.rows()[0],
            vec![cell("a@x.com"), cell("New"), cell("2024-06-01")]
        );
    }

    #[test]
    fn clean_columns_missing_canonical_column_is_an_error() {
        let table = sample();
        let err = table
            .clean_columns(&[], "_new|_old", Some(&cols(&["EMAIL", "FIRST_OUTREACH"])))
            .unwrap_err();
        assert!(matches!(err, TableError::MissingColumn(name) if name == "FIRST_OUTREACH"));
    }

    #[test]
    fn outer_join_tags_conflicts_and_fills_non_matches() {
        let new = Table::with_rows(
            cols(&["EMAIL", "COMPANY"]),
            vec![
                vec![cell("a@x.com"), cell("New Acme")],
                vec![cell("c@z.com"), cell("Initech")],
            ],
        )
        .unwrap();
        let old = Table::with_rows(
            cols(&["EMAIL", "COMPANY"]),
            vec![
                vec![cell("a@x.com"), cell("Acme")],
                vec![cell("b@y.com"), cell("Globex")],
            ],
        )
        .unwrap();

        let joined = outer_join(&new, &old, &cols(&["EMAIL"]), ("_new", "_old")).unwrap();
        assert_eq!(joined.columns(), cols(&["EMAIL", "COMPANY_new", "COMPANY_old"]));
        assert_eq!(joined.len(), 3);

        // Matched key: both sides present.
        assert_eq!(
            joined.rows()[0],
            vec![cell("a@x.com"), cell("New Acme"), cell("Acme")]
        );
        // New-only key: old side is null.
        assert_eq!(joined.rows()[1], vec![cell("c@z.com"), cell("Initech"), None]);
        // Old-only key appended after left rows, new side null.
        assert_eq!(joined.rows()[2], vec![cell("b@y.com"), None, cell("Globex")]);
    }

    #[test]
    fn inner_join_keeps_matches_only() {
        let new = Table::with_rows(
            cols(&["EMAIL", "COMPANY"]),
            vec![
                vec![cell("a@x.com"), cell("New Acme")],
                vec![cell("c@z.com"), cell("Initech")],
            ],
        )
        .unwrap();
        let old = Table::with_rows(
            cols(&["EMAIL", "COMPANY"]),
            vec![vec![cell("a@x.com"), cell("Acme")]],
        )
        .unwrap();

        let joined = inner_join(&new, &old, &cols(&["EMAIL"]), ("_new", "_old")).unwrap();
        assert_eq!(joined.len(), 1);
        assert_eq!(
            joined.rows()[0],
            vec![cell("a@x.com"), cell("New Acme"), cell("Acme")]
        );
    }

    #[test]
    fn join_leaves_side_unique_columns_untagged() {
        let left = Table::with_rows(
            cols(&["EMAIL", "NOTE"]),
            vec![vec![cell("a@x.com"), cell("ping")]],
        )
        .unwrap();
        let right = Table::with_rows(
            cols(&["EMAIL", "COMPANY"]),
            vec![vec![cell("a@x.com"), cell("Acme")]],
        )
        .unwrap();

        let joined = inner_join(&left, &right, &cols(&["EMAIL"]), ("_new", "_old")).unwrap();
        assert_eq!(joined.columns(), cols(&["EMAIL", "NOTE", "COMPANY"]));
    }

    #[test]
    fn sort_descending_then_ascending() {
        let mut table = sample();
        table.sort_by_column("LAST_OUTREACH", false).unwrap();
        assert_eq!(table.rows()[0][0], cell("b@y.com"));

        table.sort_by_column("LAST_OUTREACH", true).unwrap();
        assert_eq!(table.rows()[0][0], cell("a@x.com"));
    }

    #[test]
    fn sheet_values_pad_short_rows() {
        let values = vec![
            vec!["EMAIL".to_string(), "COMPANY".to_string()],
            vec!["a@x.com".to_string()],
        ];
        let table = Table::from_sheet_values(values);
        assert_eq!(table.rows()[0], vec![cell("a@x.com"), cell("")]);

        let back = table.to_sheet_values();
        assert_eq!(back[0], vec!["EMAIL".to_string(), "COMPANY".to_string()]);
        assert_eq!(back[1], vec!["a@x.com".to_string(), String::new()]);
    }

    #[test]
    fn concat_requires_matching_schemas() {
        let err = concat(vec![sample(), Table::new(cols(&["EMAIL"]))]).unwrap_err();
        assert!(matches!(err, TableError::SchemaMismatch(_)));
    }
}
