//! mitolink - inspect and rewrite analysis bindings in Jupyter notebooks.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mitolink_core::callsite::is_call_site;
use mitolink_core::classify::is_generated_code_cell;
use mitolink_core::resolve::resolve;
use mitolink_core::tag::{analysis_tag, has_analysis_tag, insert_tag, replace_tag};
use mitolink_core::{Notebook, NotebookDocument};

enum Action {
    List,
    Resolve(String),
    InsertTag(String),
    ReplaceTag(String, String),
}

fn print_usage() {
    eprintln!("Usage: mitolink [OPTIONS] <FILE.ipynb>");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <FILE.ipynb>              Notebook to inspect or rewrite");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --list                    List call-sites and generated cells (default)");
    eprintln!("  --resolve <ID>            Print the cell bound to the analysis");
    eprintln!("  --insert-tag <ID>         Tag the resolved call-site with the analysis id");
    eprintln!("  --replace-tag <OLD> <NEW> Rewrite an existing analysis tag");
    eprintln!("  --active <N>              Active cell index for the positional heuristics");
    eprintln!("                            (default: last code cell)");
    eprintln!("  --write                   Save changes back to the file (default: dry-run,");
    eprintln!("                            rewritten notebook is printed to stdout)");
    eprintln!("  --verbose                 Log resolution decisions to stderr");
    eprintln!("  -h, --help                Print help");
}

fn set_action(slot: &mut Option<Action>, action: Action) {
    if slot.is_some() {
        eprintln!("Error: Only one of --list/--resolve/--insert-tag/--replace-tag allowed");
        std::process::exit(1);
    }
    *slot = Some(action);
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut file_path: Option<PathBuf> = None;
    let mut action: Option<Action> = None;
    let mut active: Option<usize> = None;
    let mut write = false;
    let mut verbose = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                return;
            }
            "--list" => {
                set_action(&mut action, Action::List);
            }
            "--resolve" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --resolve requires an analysis id");
                    std::process::exit(1);
                }
                set_action(&mut action, Action::Resolve(args[i].clone()));
            }
            "--insert-tag" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --insert-tag requires an analysis id");
                    std::process::exit(1);
                }
                set_action(&mut action, Action::InsertTag(args[i].clone()));
            }
            "--replace-tag" => {
                if i + 2 >= args.len() {
                    eprintln!("Error: --replace-tag requires <OLD> and <NEW> ids");
                    std::process::exit(1);
                }
                set_action(
                    &mut action,
                    Action::ReplaceTag(args[i + 1].clone(), args[i + 2].clone()),
                );
                i += 2;
            }
            "--active" => {
                i += 1;
                let parsed = args.get(i).and_then(|v| v.parse::<usize>().ok());
                let Some(n) = parsed else {
                    eprintln!("Error: --active requires a cell index");
                    std::process::exit(1);
                };
                active = Some(n);
            }
            "--write" => {
                write = true;
            }
            "--verbose" => {
                verbose = true;
            }
            arg if arg.starts_with('-') => {
                eprintln!("Error: Unknown option: {}", arg);
                print_usage();
                std::process::exit(1);
            }
            _ => {
                if file_path.is_none() {
                    file_path = Some(PathBuf::from(&args[i]));
                } else {
                    eprintln!("Error: Unexpected argument: {}", args[i]);
                    print_usage();
                    std::process::exit(1);
                }
            }
        }
        i += 1;
    }

    let Some(file_path) = file_path else {
        eprintln!("Error: Missing notebook file");
        print_usage();
        std::process::exit(1);
    };

    if verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    }

    match run(action.unwrap_or(Action::List), &file_path, active, write) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Execute one action. `Ok(false)` means the notebook was valid but nothing
/// matched (no binding, nothing to tag).
fn run(action: Action, path: &Path, active: Option<usize>, write: bool) -> Result<bool> {
    let mut doc = NotebookDocument::load(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    if let Some(n) = active {
        doc.set_active_index(n);
    }

    match action {
        Action::List => {
            for index in 0..doc.cell_count() {
                let text = doc.cell_text(index).unwrap_or_default();
                if is_call_site(&text) {
                    match analysis_tag(&text) {
                        Some(id) => {
                            println!("cell {}: call-site analysis_to_replay=\"{}\"", index, id)
                        }
                        None => println!("cell {}: call-site (untagged)", index),
                    }
                } else if is_generated_code_cell(&text) {
                    println!("cell {}: generated code", index);
                }
            }
            Ok(true)
        }
        Action::Resolve(id) => match resolve(&doc, Some(&id)) {
            Some(binding) => {
                println!("cell {} ({})", binding.index, binding.strategy);
                Ok(true)
            }
            None => {
                println!("no binding");
                Ok(false)
            }
        },
        Action::InsertTag(id) => {
            let Some(binding) = resolve(&doc, Some(&id)) else {
                println!("no call-site to tag");
                return Ok(false);
            };
            let text = doc.cell_text(binding.index).unwrap_or_default();
            if has_analysis_tag(&text, Some(&id)) {
                println!("cell {} already tagged", binding.index);
                return Ok(true);
            }
            doc.set_cell_text(binding.index, &insert_tag(&text, &id))?;
            emit(&doc, path, write)?;
            if write {
                println!("tagged cell {}", binding.index);
            }
            Ok(true)
        }
        Action::ReplaceTag(old, new) => {
            let found = (0..doc.cell_count()).find(|&i| {
                doc.cell_text(i)
                    .is_some_and(|t| has_analysis_tag(&t, Some(&old)))
            });
            let Some(index) = found else {
                println!("no cell tagged \"{}\"", old);
                return Ok(false);
            };
            let text = doc.cell_text(index).unwrap_or_default();
            doc.set_cell_text(index, &replace_tag(&text, &old, &new))?;
            emit(&doc, path, write)?;
            if write {
                println!("retagged cell {}", index);
            }
            Ok(true)
        }
    }
}

fn emit(doc: &NotebookDocument, path: &Path, write: bool) -> Result<()> {
    if write {
        doc.save(path)
            .with_context(|| format!("failed to save {}", path.display()))?;
    } else {
        print!("{}", doc.to_json_string()?);
    }
    Ok(())
}
