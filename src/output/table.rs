//! Box-drawn tables for terminal output
//!
//! Cells may span several lines and may carry ANSI colour codes; widths are
//! measured on the visible characters only.

use regex::Regex;
use std::sync::LazyLock;

static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").unwrap());

/// Width of a string as displayed, ignoring colour codes
pub fn visible_width(s: &str) -> usize {
    ANSI_ESCAPE.replace_all(s, "").chars().count()
}

/// A table with a header row and a separator line between every row
#[derive(Debug, Clone, Default)]
pub struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Create a table with a header row
    pub fn new<S: Into<String>>(header: impl IntoIterator<Item = S>) -> Self {
        Self {
            rows: vec![header.into_iter().map(Into::into).collect()],
        }
    }

    /// Append a row
    pub fn row<S: Into<String>>(mut self, cells: impl IntoIterator<Item = S>) -> Self {
        self.rows.push(cells.into_iter().map(Into::into).collect());
        self
    }

    fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths = vec![0; self.column_count()];
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let width = cell.lines().map(visible_width).max().unwrap_or(0);
                widths[i] = widths[i].max(width);
            }
        }
        widths
    }

    /// Renders the table, one line per entry, without a trailing newline
    pub fn render(&self) -> String {
        let widths = self.widths();
        let border = |left: &str, mid: &str, right: &str| {
            let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
            format!("{}{}{}", left, segments.join(mid), right)
        };

        let mut lines = vec![border("┌", "┬", "┐")];
        for (index, row) in self.rows.iter().enumerate() {
            if index > 0 {
                lines.push(border("├", "┼", "┤"));
            }
            let cells: Vec<Vec<&str>> = (0..widths.len())
                .map(|i| {
                    row.get(i)
                        .map(|cell| cell.lines().collect())
                        .unwrap_or_default()
                })
                .collect();
            let height = cells.iter().map(Vec::len).max().unwrap_or(0).max(1);
            for line in 0..height {
                let parts: Vec<String> = cells
                    .iter()
                    .zip(&widths)
                    .map(|(cell, width)| {
                        let text = cell.get(line).copied().unwrap_or("");
                        let pad = width - visible_width(text);
                        format!(" {}{} ", text, " ".repeat(pad))
                    })
                    .collect();
                lines.push(format!("│{}│", parts.join("│")));
            }
        }
        lines.push(border("└", "┴", "┘"));
        lines.join("\n")
    }
}

/// Joins items with `, `, breaking lines after a comma so that no line is
/// longer than `limit` (a single long item still gets its own line)
pub fn wrap_list(items: &[String], limit: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for (i, item) in items.iter().enumerate() {
        let piece = if i + 1 < items.len() {
            format!("{},", item)
        } else {
            item.clone()
        };
        if current.is_empty() {
            current = piece;
        } else if current.chars().count() + 1 + piece.chars().count() > limit {
            lines.push(std::mem::take(&mut current));
            current = piece;
        } else {
            current.push(' ');
            current.push_str(&piece);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.join("\n")
}
