//! Generated-code cell classification.
//!
//! Generated cells open with one of a small fixed set of boilerplate
//! prefixes. A cell that matches is a replaceable slot: overwriting it on
//! the next write-back cannot lose user-authored content.

/// Boilerplate prefixes marking system-authored code, current and legacy
/// forms. Exact, case-sensitive.
pub const GENERATED_CODE_PREFIXES: &[&str] = &[
    "# MITO CODE START",
    "from mitosheet import *; register_analysis(",
    "from mitosheet import *; # Analysis:",
];

/// Whether the cell text is prior generated output.
pub fn is_generated_code_cell(cell_text: &str) -> bool {
    GENERATED_CODE_PREFIXES
        .iter()
        .any(|prefix| cell_text.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_prefix() {
        assert!(is_generated_code_cell("# MITO CODE START\nx=1"));
    }

    #[test]
    fn test_legacy_prefixes() {
        assert!(is_generated_code_cell(
            "from mitosheet import *; register_analysis(\"id\")\ndf = df"
        ));
        assert!(is_generated_code_cell(
            "from mitosheet import *; # Analysis: id\ndf = df"
        ));
    }

    #[test]
    fn test_user_code_is_not_generated() {
        assert!(!is_generated_code_cell("print(1)"));
        assert!(!is_generated_code_cell(""));
        // Prefix must be at the very start of the cell.
        assert!(!is_generated_code_cell("x = 1\n# MITO CODE START"));
    }

    #[test]
    fn test_prefix_is_case_sensitive() {
        assert!(!is_generated_code_cell("# mito code start"));
    }
}
