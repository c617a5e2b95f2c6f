//! In-memory table representation shared by every pipeline stage.
//!
//! A [`Table`] fixes its column set at construction; rows are stored in
//! insertion order and padded or truncated to the column count, so later
//! stages can index cells positionally without bounds anxiety.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::data::Value;

pub type Row = Vec<Option<Value>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends a row, padding with nulls or truncating to the column count.
    pub fn push_row(&mut self, mut row: Row) {
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column)).and_then(|c| c.as_ref())
    }

    pub fn rename_column(&mut self, index: usize, name: String) {
        if let Some(column) = self.columns.get_mut(index) {
            *column = name;
        }
    }

    pub fn retain_rows<F>(&mut self, mut predicate: F)
    where
        F: FnMut(&Row) -> bool,
    {
        self.rows.retain(|row| predicate(row));
    }

    pub fn map_cells<F>(&mut self, mut transform: F)
    where
        F: FnMut(usize, Option<Value>) -> Option<Value>,
    {
        for row in &mut self.rows {
            for (idx, cell) in row.iter_mut().enumerate() {
                *cell = transform(idx, cell.take());
            }
        }
    }
}

/// Renders the first `limit` rows as an aligned text block for the
/// `sniff` command's diagnostic preview.
pub fn render_preview(table: &Table, limit: usize) -> String {
    let shown = table.rows().iter().take(limit);
    let mut widths = table
        .columns()
        .iter()
        .map(|c| c.chars().count())
        .collect::<Vec<_>>();
    let mut rendered_rows = Vec::new();
    for row in shown {
        let cells = row
            .iter()
            .map(|cell| match cell {
                Some(value) => sanitize_cell(&value.as_display()).into_owned(),
                None => String::new(),
            })
            .collect::<Vec<_>>();
        for (idx, cell) in cells.iter().enumerate().take(widths.len()) {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
        rendered_rows.push(cells);
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(table.columns(), &widths));
    let separators = widths
        .iter()
        .map(|w| "-".repeat((*w).max(1)))
        .collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separators, &widths));
    for row in &rendered_rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    if table.len() > limit {
        let _ = writeln!(output, "... {} more row(s)", table.len() - limit);
    }
    output
}

fn format_row<S: AsRef<str>>(cells: &[S], widths: &[usize]) -> String {
    let mut line = String::new();
    for (idx, cell) in cells.iter().enumerate() {
        let cell = cell.as_ref();
        if idx > 0 {
            line.push_str("  ");
        }
        line.push_str(cell);
        let padding = widths
            .get(idx)
            .copied()
            .unwrap_or_default()
            .saturating_sub(cell.chars().count());
        if padding > 0 && idx + 1 < cells.len() {
            line.push_str(&" ".repeat(padding));
        }
    }
    while line.ends_with(' ') {
        line.pop();
    }
    line
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(
            value
                .chars()
                .map(|ch| match ch {
                    '\n' | '\r' | '\t' => ' ',
                    other => other,
                })
                .collect(),
        )
    } else {
        Cow::Borrowed(value)
    }
}
