//! Analysis tag codec: reading and rewriting the argument list of a
//! call-site.
//!
//! The analysis id has no storage of its own; its only representation in a
//! notebook is the `analysis_to_replay="<id>"` keyword embedded in the call
//! line. This module extracts positional arguments, tests for tags, and
//! inserts/replaces them. Argument splitting is quote- and paren-depth-aware
//! so dataframe expressions like `dfs["a"]` or `merge(a, b)` do not break
//! tokenization.

use std::sync::OnceLock;

use regex::Regex;

use crate::callsite::last_code_line;

/// Keyword that tags a call-site with its bound analysis.
pub const ANALYSIS_TAG_KEYWORD: &str = "analysis_to_replay";

/// Keyword arguments recognized on the call line. Everything from the first
/// recognized keyword onward is dropped when extracting positional arguments.
/// `saved_analysis_name` is the legacy spelling of the analysis tag.
pub const RECOGNIZED_KEYWORDS: &[&str] = &[
    "tutorial_mode",
    "saved_analysis_name",
    ANALYSIS_TAG_KEYWORD,
    "view_df",
];

/// Regex that matches any analysis tag, regardless of id.
///
/// Captures:
/// - group 1: the quoted analysis id
fn any_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r#"{}\s*=\s*"([^"]*)""#, ANALYSIS_TAG_KEYWORD))
            .expect("analysis tag regex must compile")
    })
}

fn tag_literal(analysis_id: &str) -> String {
    format!("{}=\"{}\"", ANALYSIS_TAG_KEYWORD, analysis_id)
}

/// The argument span of the call on `line`: the text between the first `(`
/// and its matching `)`, honoring quotes and nesting. An unbalanced call
/// degrades to everything after the open paren. `None` when the line has no
/// open paren at all.
fn call_args_span(line: &str) -> Option<&str> {
    let open = line.find('(')?;
    let bytes = line.as_bytes();
    let mut depth: i32 = 0;
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'"' | b'\'' => quote = Some(b),
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                depth -= 1;
                if depth <= 0 {
                    return Some(&line[open + 1..i]);
                }
            }
            _ => {}
        }
    }
    Some(&line[open + 1..])
}

/// Split `args` on commas at the top nesting level, outside string literals.
fn split_top_level(args: &str) -> Vec<&str> {
    let bytes = args.as_bytes();
    let mut depth: i32 = 0;
    let mut quote: Option<u8> = None;
    let mut escaped = false;
    let mut start = 0;
    let mut out = Vec::new();

    for (i, &b) in bytes.iter().enumerate() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'"' | b'\'' => quote = Some(b),
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b',' if depth == 0 => {
                out.push(&args[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&args[start..]);
    out
}

fn is_keyword_token(token: &str) -> bool {
    RECOGNIZED_KEYWORDS.iter().any(|kw| {
        token
            .strip_prefix(kw)
            .is_some_and(|rest| rest.is_empty() || rest.trim_start().starts_with('='))
    })
}

/// Positional arguments of the call-site on the cell's last non-blank line,
/// in order, with recognized keyword arguments and everything after them
/// dropped. Malformed call text degrades to an empty or partial list.
pub fn extract_arguments(cell_text: &str) -> Vec<String> {
    let Some(line) = last_code_line(cell_text) else {
        return Vec::new();
    };
    let Some(args) = call_args_span(line) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for token in split_top_level(args) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if is_keyword_token(token) {
            break;
        }
        out.push(token.to_string());
    }
    out
}

/// Whether the call line carries an analysis tag.
///
/// With `Some(id)`, matches only that exact id; with `None`, matches any
/// quoted id.
pub fn has_analysis_tag(cell_text: &str, analysis_id: Option<&str>) -> bool {
    let Some(line) = last_code_line(cell_text) else {
        return false;
    };
    match analysis_id {
        Some(id) => line.contains(&tag_literal(id)),
        None => any_tag_re().is_match(line),
    }
}

/// The id carried by the call line's analysis tag, if any.
pub fn analysis_tag(cell_text: &str) -> Option<String> {
    let line = last_code_line(cell_text)?;
    any_tag_re().captures(line).map(|caps| caps[1].to_string())
}

/// Replace `old_id` with `new_id` in the cell's analysis tag. Returns the
/// input unchanged when the expected tag is not present.
pub fn replace_tag(cell_text: &str, old_id: &str, new_id: &str) -> String {
    let old = tag_literal(old_id);
    if !cell_text.contains(&old) {
        return cell_text.to_string();
    }
    // A bound cell carries at most one tag.
    cell_text.replacen(&old, &tag_literal(new_id), 1)
}

/// Tag an untagged call-site with `analysis_id`, inserting the keyword
/// immediately before the final closing paren of the call line. A zero-arg
/// call gets no leading comma. Cells that already carry a tag, or have no
/// closing paren to anchor on, are returned unchanged.
pub fn insert_tag(cell_text: &str, analysis_id: &str) -> String {
    if has_analysis_tag(cell_text, None) {
        return cell_text.to_string();
    }
    let Some(line) = last_code_line(cell_text) else {
        return cell_text.to_string();
    };
    // Trailing blank lines hold no parens, so the last ')' in the cell text
    // is the final one of the call line.
    let Some(close) = cell_text.rfind(')') else {
        return cell_text.to_string();
    };

    let zero_args = call_args_span(line).is_none_or(|args| args.trim().is_empty());
    let tag = tag_literal(analysis_id);
    let insertion = if zero_args { tag } else { format!(", {}", tag) };

    format!(
        "{}{}{}",
        &cell_text[..close],
        insertion,
        &cell_text[close..]
    )
}
