//! Fixed-width Text Tables
//!
//! Renders a title, a header row and string cells into aligned columns:
//!
//! ```text
//! Users
//! -----
//!  Name  | Count
//! -------+-------
//!  alpha |     1
//!  beta  |    12
//! -------+-------
//! ```
//!
//! The first column is left-aligned, every other column right-aligned.

use thiserror::Error;

/// Returned in place of the header and rows when a table has no rows
pub const NO_DATA: &str = "no data available";

/// Table rendering errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    /// A row has a different number of cells than there are headers
    #[error("row {row} has {actual} cells, expected {expected}")]
    RowWidth {
        /// Zero-based row index
        row: usize,
        /// Number of headers
        expected: usize,
        /// Number of cells in the offending row
        actual: usize,
    },
}

/// Render a titled table.
///
/// Column widths are the widest of the header and every cell in that column,
/// measured in characters. Every row must have exactly `headers.len()` cells.
pub fn render_table<S: AsRef<str>>(
    title: &str,
    headers: &[&str],
    rows: &[Vec<S>],
) -> Result<String, TableError> {
    let mut output = String::new();
    output.push_str(title);
    output.push('\n');
    output.push_str(&"-".repeat(title.chars().count()));
    output.push('\n');

    if rows.is_empty() {
        output.push_str(NO_DATA);
        output.push('\n');
        return Ok(output);
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for (i, row) in rows.iter().enumerate() {
        if row.len() != headers.len() {
            return Err(TableError::RowWidth {
                row: i,
                expected: headers.len(),
                actual: row.len(),
            });
        }
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.as_ref().chars().count());
        }
    }

    let separator = widths
        .iter()
        .map(|w| "-".repeat(w + 2))
        .collect::<Vec<_>>()
        .join("+");

    push_row(&mut output, headers.iter().copied(), &widths);
    output.push_str(&separator);
    output.push('\n');
    for row in rows {
        push_row(&mut output, row.iter().map(AsRef::as_ref), &widths);
    }
    output.push_str(&separator);
    output.push('\n');

    Ok(output)
}

fn push_row<'a>(output: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line = cells
        .zip(widths)
        .enumerate()
        .map(|(col, (cell, &width))| {
            if col == 0 {
                format!(" {cell:<width$} ")
            } else {
                format!(" {cell:>width$} ")
            }
        })
        .collect::<Vec<_>>()
        .join("|");
    output.push_str(&line);
    output.push('\n');
}
