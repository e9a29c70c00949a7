use crate::output;

use std::path::PathBuf;

use clap::Args;
use color_eyre::Result;

use hyperion_engine::DocumentReader;

/// Validate a document YAML file without running it
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the document YAML file
    pub document: PathBuf,
}

pub fn execute(args: ValidateArgs) -> Result<()> {
    let document_path = &args.document;

    if !document_path.exists() {
        color_eyre::eyre::bail!("Document file not found: {}", document_path.display());
    }

    output::status("Validating", &format!("{}", document_path.display()));

    let document = match DocumentReader::read_file(document_path) {
        Ok(document) => document,
        Err(e) => {
            output::error(&format!("Parse error: {}", e.message));
            if e.line > 0 {
                output::info(&format!("  At line {}, column {}", e.line, e.column));
            }
            if let Some(suggestion) = &e.suggestion {
                output::info(&format!("  Suggestion: {}", suggestion));
            }
            std::process::exit(1);
        }
    };

    output::check("YAML syntax valid");

    let tasks_count: usize = document
        .task_groups
        .iter()
        .map(|group| group.tasks().count())
        .sum();
    let parallel_count = document.task_groups.iter().filter(|g| g.parallel).count();

    output::check(&format!(
        "Structure: {} task groups ({} parallel), {} tasks",
        document.task_groups.len(),
        parallel_count,
        tasks_count
    ));

    if !document.matrix.is_empty() {
        output::check(&format!("Matrix: {} entries", document.matrix.len()));
    }

    println!();
    output::success("Document is valid");

    Ok(())
}
