//! Call-site detection.
//!
//! A cell is a call-site candidate when the last non-blank line of its text
//! invokes the spreadsheet entry point, e.g. `mitosheet.sheet(df)`. Only that
//! line is ever inspected; earlier lines are free-form user code.

/// Substring marking an invocation of the session-creation entry point.
pub const SHEET_CALL_MARKER: &str = "sheet(";

/// The last non-blank line of a cell, i.e. the only line that can carry a
/// call-site. `None` for empty or all-whitespace cells.
pub fn last_code_line(cell_text: &str) -> Option<&str> {
    cell_text.lines().rev().find(|line| !line.trim().is_empty())
}

/// Whether the cell's last non-blank line invokes the entry point.
///
/// This is a substring match: a commented-out call or one inside a string
/// literal on that line still counts. Accepted tradeoff for now.
pub fn is_call_site(cell_text: &str) -> bool {
    last_code_line(cell_text).is_some_and(|line| line.contains(SHEET_CALL_MARKER))
}
