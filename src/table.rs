// 📋 Table Model - In-memory sheet shared by every pipeline stage
// Ordered columns + rows of typed cells, the way a spreadsheet export looks

use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// CELL
// ============================================================================

/// A single spreadsheet value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Int(i64),
    Bool(bool),
}

impl Cell {
    /// Build a text cell, mapping "" to Empty
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(n) => n.is_nan(),
            _ => false,
        }
    }

    /// Canonical join key
    ///
    /// Integral numbers render without decimals ("45", not "45.0") so a
    /// numeric cell and a text cell holding the same code compare equal.
    pub fn key_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => format_number(*n),
            Cell::Int(i) => i.to_string(),
            Cell::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        }
    }

    /// Numeric view of the cell, if it has one
    ///
    /// Text is trimmed and parsed; on failure thousands separators are
    /// stripped and it is parsed again ("1,250.00" → 1250.0).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(*n),
            Cell::Int(i) => Some(*i as f64),
            Cell::Text(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<f64>()
                    .ok()
                    .or_else(|| trimmed.replace(',', "").parse::<f64>().ok())
                    .filter(|n| n.is_finite())
            }
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key_text())
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::text(value)
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Empty)
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        String::new()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// ============================================================================
// TABLE
// ============================================================================

/// Named columns + rows. Every row is exactly `columns.len()` wide.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    /// Sheet/table name, used in error messages
    pub name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Table {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Convenience constructor for fixtures and summaries
    pub fn with_columns(name: impl Into<String>, columns: &[&str]) -> Self {
        Self::new(name, columns.iter().map(|c| c.to_string()).collect())
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

    /// Append a row, padding or truncating it to the column count
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Empty);
        self.rows.push(row);
    }

    /// Remove and return the last row
    pub fn pop_row(&mut self) -> Option<Vec<Cell>> {
        self.rows.pop()
    }

    pub fn row(&self, index: usize) -> Option<&[Cell]> {
        self.rows.get(index).map(|r| r.as_slice())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Column index, or a structural error naming the table
    pub fn require_column(&self, name: &str) -> Result<usize, SchemaError> {
        self.column_index(name)
            .ok_or_else(|| SchemaError::MissingColumn {
                table: self.name.clone(),
                column: name.to_string(),
            })
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&Cell::Empty)
    }

    /// Iterate one column top to bottom
    pub fn column_values(&self, col: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().map(move |r| r.get(col).unwrap_or(&Cell::Empty))
    }

    /// Rewrite every value of one column in place
    pub fn map_column<F>(&mut self, col: usize, mut f: F)
    where
        F: FnMut(&Cell) -> Cell,
    {
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(col) {
                *cell = f(cell);
            }
        }
    }

    /// Insert a column at `position`, filling it from `values` (one per row).
    /// If a column with that name already exists it is removed first, so the
    /// derived column always lands in the requested slot.
    ///
    /// `position` is an index into the header as it was before the call.
    pub fn insert_column(&mut self, position: usize, name: &str, values: Vec<Cell>) {
        let mut position = position;
        if let Some(existing) = self.column_index(name) {
            self.columns.remove(existing);
            for row in &mut self.rows {
                row.remove(existing);
            }
            // columns right of the removed one shifted left by one
            if existing < position {
                position -= 1;
            }
        }

        let position = position.min(self.columns.len());
        self.columns.insert(position, name.to_string());

        let mut values = values.into_iter();
        for row in &mut self.rows {
            row.insert(position, values.next().unwrap_or(Cell::Empty));
        }
    }

    /// Add or overwrite a column at the end of the table
    pub fn set_column(&mut self, name: &str, values: Vec<Cell>) {
        match self.column_index(name) {
            Some(col) => {
                let mut values = values.into_iter();
                for row in &mut self.rows {
                    row[col] = values.next().unwrap_or(Cell::Empty);
                }
            }
            None => {
                let end = self.columns.len();
                self.insert_column(end, name, values);
            }
        }
    }

    /// New table with the same header and the selected rows, in the given order
    pub fn select_rows(&self, name: impl Into<String>, indices: &[usize]) -> Table {
        Table {
            name: name.into(),
            columns: self.columns.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
