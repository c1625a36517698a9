//! In-memory workbook model consumed by the detection engine.
//!
//! A [`Sheet`] is a read-only, row-major grid of untyped [`Cell`] values. File
//! decoding happens elsewhere (see `io_utils`); everything in this crate past
//! that point only ever sees the grid.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

static EMPTY_CELL: Cell = Cell::Empty;

/// A raw scalar cell as a spreadsheet reader would hand it over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    #[default]
    Empty,
}

impl Cell {
    /// Coerces a field read from a delimited file.
    ///
    /// Plain decimal literals become numbers. Digit strings with a leading zero
    /// (phone numbers, IDs of people born after 2000) stay text, which is how a
    /// spreadsheet would have kept them.
    pub fn from_field(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Empty;
        }
        if looks_numeric(trimmed)
            && let Ok(value) = trimmed.parse::<f64>()
            && value.is_finite()
        {
            return Cell::Number(value);
        }
        Cell::Text(trimmed.to_string())
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(text) => text.is_empty(),
            Cell::Number(_) => false,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Cell::Number(_))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Display text of the cell; `None` for blank cells.
    pub fn text(&self) -> Option<Cow<'_, str>> {
        match self {
            Cell::Empty => None,
            Cell::Text(text) if text.is_empty() => None,
            Cell::Text(text) => Some(Cow::Borrowed(text.as_str())),
            Cell::Number(value) => Some(Cow::Owned(format_number(*value))),
        }
    }
}

fn looks_numeric(value: &str) -> bool {
    let body = value.strip_prefix('-').unwrap_or(value);
    let mut chars = body.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_digit() {
        return false;
    }
    if first == '0' && chars.next().is_some_and(|next| next.is_ascii_digit()) {
        return false;
    }
    let mut seen_dot = false;
    for ch in body.chars() {
        match ch {
            '0'..='9' => {}
            '.' if !seen_dot => seen_dot = true,
            _ => return false,
        }
    }
    true
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    #[serde(default)]
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns spanned by the longest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn row(&self, row: usize) -> &[Cell] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .unwrap_or(&EMPTY_CELL)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Workbook {
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|sheet| sheet.name.as_str())
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    pub fn first(&self) -> Option<&Sheet> {
        self.sheets.first()
    }
}
