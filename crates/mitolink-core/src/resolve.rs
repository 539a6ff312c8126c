//! Binding resolution: which cell is (or should become) bound to an
//! analysis.
//!
//! The notebook format has no durable link between an analysis and "its"
//! cell, so the binding is reconstructed on every call by an ordered chain
//! of strategies, first success wins:
//!
//! 1. exact tag scan (the only authoritative path)
//! 2. run-and-advance: the cell above the active one is an untagged call-site
//! 3. run-in-place: the active cell is an untagged call-site
//! 4. backward scan from the active cell for any untagged call-site
//!
//! Resolution is a pure read of the current notebook snapshot: no mutation,
//! no caching, no memory of past calls. Among several untagged call-sites
//! the chain picks whichever it reaches first; that is a best-effort guess
//! at user intent, not a guarantee.

use std::fmt;

use tracing::debug;

use crate::callsite::is_call_site;
use crate::classify::is_generated_code_cell;
use crate::error::Result;
use crate::notebook::Notebook;
use crate::tag::{has_analysis_tag, insert_tag};

/// The heuristic that produced a binding, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    TaggedScan,
    RunAndAdvance,
    RunInPlace,
    BackwardScan,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::TaggedScan => "tagged-scan",
            Strategy::RunAndAdvance => "run-and-advance",
            Strategy::RunInPlace => "run-in-place",
            Strategy::BackwardScan => "backward-scan",
        };
        f.write_str(name)
    }
}

/// A resolved binding: the cell index and the strategy that chose it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub index: usize,
    pub strategy: Strategy,
}

type StrategyFn = fn(&dyn Notebook, Option<&str>) -> Option<usize>;

/// The heuristic chain. Order is the contract: earlier entries are
/// strictly more trustworthy.
const STRATEGIES: &[(Strategy, StrategyFn)] = &[
    (Strategy::TaggedScan, tagged_scan),
    (Strategy::RunAndAdvance, run_and_advance),
    (Strategy::RunInPlace, run_in_place),
    (Strategy::BackwardScan, backward_scan),
];

fn cell_text_or_empty(notebook: &dyn Notebook, index: usize) -> String {
    notebook.cell_text(index).unwrap_or_default()
}

fn is_untagged_call_site(text: &str) -> bool {
    is_call_site(text) && !has_analysis_tag(text, None)
}

/// First cell, in index order, whose call-site carries the exact tag.
fn tagged_scan(notebook: &dyn Notebook, analysis_id: Option<&str>) -> Option<usize> {
    let id = analysis_id?;
    (0..notebook.cell_count())
        .find(|&i| has_analysis_tag(&cell_text_or_empty(notebook, i), Some(id)))
}

/// The user ran the call cell and the notebook advanced focus past it.
fn run_and_advance(notebook: &dyn Notebook, _analysis_id: Option<&str>) -> Option<usize> {
    let previous = notebook.active_index().checked_sub(1)?;
    is_untagged_call_site(&cell_text_or_empty(notebook, previous)).then_some(previous)
}

/// The user ran the call cell with focus staying put.
fn run_in_place(notebook: &dyn Notebook, _analysis_id: Option<&str>) -> Option<usize> {
    let active = notebook.active_index();
    if active >= notebook.cell_count() {
        return None;
    }
    is_untagged_call_site(&cell_text_or_empty(notebook, active)).then_some(active)
}

/// Run-all: focus may be anywhere below the call cell, so walk backward
/// from the active cell and take the nearest untagged call-site.
fn backward_scan(notebook: &dyn Notebook, _analysis_id: Option<&str>) -> Option<usize> {
    let count = notebook.cell_count();
    if count == 0 {
        return None;
    }
    let start = notebook.active_index().min(count - 1);
    (0..=start)
        .rev()
        .find(|&i| is_untagged_call_site(&cell_text_or_empty(notebook, i)))
}

/// Resolve `analysis_id` against the live notebook, or `None` when no
/// heuristic matches and the caller must create a freshly tagged cell.
pub fn resolve(notebook: &dyn Notebook, analysis_id: Option<&str>) -> Option<Binding> {
    for &(strategy, f) in STRATEGIES {
        if let Some(index) = f(notebook, analysis_id) {
            debug!(%strategy, index, analysis_id, "resolved binding");
            return Some(Binding { index, strategy });
        }
    }
    debug!(analysis_id, "no binding found");
    None
}

/// A slot the write-back may claim without risking user-authored content.
fn is_overwritable(cell_text: &str) -> bool {
    cell_text.trim().is_empty() || is_generated_code_cell(cell_text)
}

fn new_call_site_text(analysis_id: &str) -> String {
    format!(
        "import mitosheet\nmitosheet.sheet({}=\"{}\")",
        crate::tag::ANALYSIS_TAG_KEYWORD,
        analysis_id
    )
}

/// Materialize an analysis into the notebook: tag the bound call-site and
/// write `code` into the cell directly below it. The slot below is reused
/// only when it is blank or prior generated output; otherwise a fresh cell
/// is inserted. When no binding resolves at all, a freshly tagged call cell
/// and its code cell are appended.
///
/// Returns the index of the cell the generated code landed in.
pub fn write_generated_code(
    notebook: &mut dyn Notebook,
    analysis_id: &str,
    code: &str,
) -> Result<usize> {
    let call_index = match resolve(notebook, Some(analysis_id)) {
        Some(binding) => {
            let text = cell_text_or_empty(notebook, binding.index);
            if !has_analysis_tag(&text, Some(analysis_id)) {
                notebook.set_cell_text(binding.index, &insert_tag(&text, analysis_id))?;
            }
            binding.index
        }
        None => {
            let index = notebook.cell_count();
            notebook.insert_cell(index)?;
            notebook.set_cell_text(index, &new_call_site_text(analysis_id))?;
            index
        }
    };

    let target = call_index + 1;
    let reusable = notebook
        .cell_text(target)
        .is_some_and(|text| is_overwritable(&text));
    if !reusable {
        notebook.insert_cell(target)?;
    }
    notebook.set_cell_text(target, code)?;
    debug!(analysis_id, call_index, target, "wrote generated code");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notebook::BufferNotebook;

    const CALL: &str = "import mitosheet\nmitosheet.sheet(df)";

    fn tagged_call(id: &str) -> String {
        format!("mitosheet.sheet(df, analysis_to_replay=\"{}\")", id)
    }

    #[test]
    fn test_tagged_cell_wins_regardless_of_active_index() {
        for active in 0..5 {
            let mut cells = vec!["print(1)".to_string(); 5];
            cells[2] = tagged_call("session1");
            let nb = BufferNotebook::new(cells, active);

            let binding = resolve(&nb, Some("session1")).unwrap();
            assert_eq!(binding.index, 2);
            assert_eq!(binding.strategy, Strategy::TaggedScan);
        }
    }

    #[test]
    fn test_tagged_scan_requires_exact_id() {
        let nb = BufferNotebook::new(vec![tagged_call("other")], 0);
        // Wrong id: the tagged cell is not untagged either, so nothing binds.
        assert!(resolve(&nb, Some("session1")).is_none());
    }

    #[test]
    fn test_run_in_place() {
        let nb = BufferNotebook::new(vec![CALL, ""], 0);
        let binding = resolve(&nb, None).unwrap();
        assert_eq!(binding.index, 0);
        assert_eq!(binding.strategy, Strategy::RunInPlace);
    }

    #[test]
    fn test_run_and_advance() {
        let nb = BufferNotebook::new(vec![CALL, "# placeholder"], 1);
        let binding = resolve(&nb, None).unwrap();
        assert_eq!(binding.index, 0);
        assert_eq!(binding.strategy, Strategy::RunAndAdvance);
    }

    #[test]
    fn test_run_and_advance_outranks_run_in_place() {
        // Both the active cell and the one above are untagged call-sites;
        // the cell above was the one just run.
        let nb = BufferNotebook::new(vec![CALL, CALL], 1);
        let binding = resolve(&nb, None).unwrap();
        assert_eq!(binding.index, 0);
        assert_eq!(binding.strategy, Strategy::RunAndAdvance);
    }

    #[test]
    fn test_backward_scan_finds_nearest_call_site() {
        let nb = BufferNotebook::new(vec![CALL, "x = 1", "y = 2", "z = 3"], 3);
        let binding = resolve(&nb, None).unwrap();
        assert_eq!(binding.index, 0);
        assert_eq!(binding.strategy, Strategy::BackwardScan);
    }

    #[test]
    fn test_backward_scan_prefers_nearest_of_several() {
        let nb = BufferNotebook::new(vec![CALL, "x = 1", CALL, "y = 2"], 3);
        let binding = resolve(&nb, None).unwrap();
        assert_eq!(binding.index, 2);
    }

    #[test]
    fn test_tagged_cells_are_invisible_to_heuristics() {
        // A cell already bound to another analysis must never be stolen.
        let nb = BufferNotebook::new(vec![tagged_call("other")], 0);
        assert!(resolve(&nb, None).is_none());
    }

    #[test]
    fn test_empty_notebook_resolves_to_none() {
        let nb = BufferNotebook::new(Vec::<String>::new(), 0);
        assert!(resolve(&nb, None).is_none());
        assert!(resolve(&nb, Some("id")).is_none());
    }

    #[test]
    fn test_resolve_does_not_mutate() {
        let nb = BufferNotebook::new(vec![CALL, ""], 0);
        let before = nb.cells().to_vec();
        let _ = resolve(&nb, Some("id"));
        let _ = resolve(&nb, None);
        assert_eq!(nb.cells(), before.as_slice());
    }

    #[test]
    fn test_write_tags_call_site_and_fills_blank_slot() {
        let mut nb = BufferNotebook::new(vec![CALL, ""], 0);
        let target = write_generated_code(&mut nb, "id-1", "# MITO CODE START\ndf = df").unwrap();

        assert_eq!(target, 1);
        assert!(has_analysis_tag(&nb.cell_text(0).unwrap(), Some("id-1")));
        assert!(nb.cell_text(1).unwrap().starts_with("# MITO CODE START"));
        assert_eq!(nb.cell_count(), 2);
    }

    #[test]
    fn test_write_replaces_prior_generated_cell() {
        let mut nb = BufferNotebook::new(
            vec![tagged_call("id-1"), "# MITO CODE START\nold".to_string()],
            0,
        );
        let target = write_generated_code(&mut nb, "id-1", "# MITO CODE START\nnew").unwrap();

        assert_eq!(target, 1);
        assert_eq!(nb.cell_text(1).as_deref(), Some("# MITO CODE START\nnew"));
        assert_eq!(nb.cell_count(), 2);
    }

    #[test]
    fn test_write_does_not_overwrite_user_code_below() {
        let mut nb =
            BufferNotebook::new(vec![tagged_call("id-1"), "precious = 1".to_string()], 0);
        let target = write_generated_code(&mut nb, "id-1", "# MITO CODE START\nnew").unwrap();

        // Generated code goes into a freshly inserted cell; user code moves down.
        assert_eq!(target, 1);
        assert_eq!(nb.cell_count(), 3);
        assert_eq!(nb.cell_text(2).as_deref(), Some("precious = 1"));
    }

    #[test]
    fn test_write_appends_tagged_cell_when_nothing_resolves() {
        let mut nb = BufferNotebook::new(vec!["print(1)"], 0);
        let target = write_generated_code(&mut nb, "id-1", "# MITO CODE START\nnew").unwrap();

        assert_eq!(nb.cell_count(), 3);
        assert!(has_analysis_tag(&nb.cell_text(1).unwrap(), Some("id-1")));
        assert_eq!(target, 2);
        assert_eq!(nb.cell_text(2).as_deref(), Some("# MITO CODE START\nnew"));
    }

    #[test]
    fn test_write_is_stable_across_reruns() {
        // Rerunning the same analysis must not duplicate cells.
        let mut nb = BufferNotebook::new(vec![CALL, ""], 0);
        write_generated_code(&mut nb, "id-1", "# MITO CODE START\nv1").unwrap();
        write_generated_code(&mut nb, "id-1", "# MITO CODE START\nv2").unwrap();

        assert_eq!(nb.cell_count(), 2);
        assert_eq!(nb.cell_text(1).as_deref(), Some("# MITO CODE START\nv2"));
    }
}
