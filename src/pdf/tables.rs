//! Heuristic table detection in page text.
//!
//! Text extraction loses table structure, so a table is recognised as a run
//! of consecutive lines that split into the same number of cells.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A table with a header row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Render as a markdown table.
    pub fn to_markdown(&self) -> String {
        let mut out = format!("| {} |\n", self.columns.join(" | "));
        out.push_str(&format!("|{}\n", " --- |".repeat(self.columns.len())));
        for row in &self.rows {
            out.push_str(&format!("| {} |\n", row.join(" | ")));
        }
        out
    }
}

fn cell_separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"\t+| {2,}").expect("Invalid regex"))
}

/// Split a line into cells, or `None` if it does not look tabular.
fn split_cells(line: &str) -> Option<Vec<String>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let cells: Vec<String> = if trimmed.contains('|') {
        trimmed
            .trim_matches('|')
            .split('|')
            .map(|c| c.trim().to_string())
            .collect()
    } else {
        cell_separator()
            .split(trimmed)
            .map(|c| c.trim().to_string())
            .collect()
    };

    // Markdown separator rows such as |---|---|
    if cells.iter().all(|c| !c.is_empty() && c.chars().all(|ch| ch == '-' || ch == ':')) {
        return Some(Vec::new());
    }

    (cells.len() >= 2).then_some(cells)
}

/// Find tables among the given lines.
///
/// A table needs a header line and at least one data line, all with the same
/// cell count.
pub fn detect_tables(lines: &[&str]) -> Vec<Table> {
    let mut tables = Vec::new();
    let mut run: Vec<Vec<String>> = Vec::new();

    let mut close = |run: &mut Vec<Vec<String>>| {
        if run.len() >= 2 {
            let columns = run.remove(0);
            tables.push(Table {
                columns,
                rows: std::mem::take(run),
            });
        }
        run.clear();
    };

    for line in lines {
        match split_cells(line) {
            Some(cells) if cells.is_empty() => continue,
            Some(cells) => {
                if run.first().is_some_and(|first| first.len() != cells.len()) {
                    close(&mut run);
                }
                run.push(cells);
            }
            None => close(&mut run),
        }
    }
    close(&mut run);

    tables
}
