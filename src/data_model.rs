//! In-memory snapshot types for a spreadsheet range and spreadsheet-style
//! column references.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One spreadsheet row: ordered string cells, insertion order = column
/// order. Rows are ragged; the backend omits trailing empty cells.
pub type Row = Vec<String>;

/// The full read range, row order preserved. Written back wholesale with
/// the same range expression used for the read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowSet {
    rows: Vec<Row>,
}

impl RowSet {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut Vec<Row> {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

impl From<Vec<Row>> for RowSet {
    fn from(rows: Vec<Row>) -> Self {
        Self::new(rows)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid column label {label:?}")]
pub struct InvalidColumnLabel {
    pub label: String,
}

/// A column label (`A`, `B`, ..., `Z`, `AA`, ...) with its zero-based index.
///
/// Labels are base-26 numerals with digit values 1-26, so `A` = 0, `Z` = 25,
/// `AA` = 26. The mapping is bijective with [`ColumnRef::from_index`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    label: String,
    index: usize,
}

impl ColumnRef {
    pub fn parse(label: &str) -> Result<Self, InvalidColumnLabel> {
        let invalid = || InvalidColumnLabel {
            label: label.to_string(),
        };
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return Err(invalid());
        }
        let mut index: usize = 0;
        for ch in trimmed.chars() {
            if !ch.is_ascii_alphabetic() {
                return Err(invalid());
            }
            let digit = (ch.to_ascii_uppercase() as usize) - ('A' as usize) + 1;
            index = index
                .checked_mul(26)
                .and_then(|i| i.checked_add(digit))
                .ok_or_else(invalid)?;
        }
        Ok(ColumnRef {
            label: trimmed.to_ascii_uppercase(),
            index: index - 1,
        })
    }

    pub fn from_index(index: usize) -> Self {
        let mut n = index + 1;
        let mut out = Vec::<u8>::new();
        while n > 0 {
            let rem = (n - 1) % 26;
            out.push(b'A' + rem as u8);
            n = (n - 1) / 26;
        }
        out.reverse();
        ColumnRef {
            label: String::from_utf8(out).expect("column letters are always valid UTF-8"),
            index,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// Range expression covering the source and target columns, e.g. `"A:B"`.
/// Reusing the identical string for read and write is what guarantees
/// column alignment between the two.
pub fn range_expr(source: &ColumnRef, target: &ColumnRef) -> String {
    format!("{}:{}", source.label(), target.label())
}
