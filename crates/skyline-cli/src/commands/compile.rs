//! Compile command - run the project pipeline

use super::ProjectArgs;
use anyhow::{bail, Context, Result};
use colored::Colorize;

/// Compile command arguments
#[derive(Debug, Default)]
pub struct CompileArgs {
    pub project: ProjectArgs,
    /// Compiler ids to run; empty runs everything
    pub only: Vec<String>,
    /// JSON output
    pub json: bool,
}

/// Run the compile command
pub fn run(args: CompileArgs) -> Result<()> {
    let mut context = super::load_context(&args.project)?;
    let root = context
        .project()
        .map(|p| p.root_directory().display().to_string())
        .unwrap_or_default();

    let outcome = context
        .compile_filtered(|compiler| args.only.is_empty() || args.only.iter().any(|id| id == compiler.id()))
        .context("Compilation could not start")?;

    if args.json {
        println!(
            "{}",
            serde_json::json!({
                "success": outcome.is_success(),
                "project": root,
                "executed": outcome.executed,
                "skipped": outcome.skipped,
                "failed": outcome.failed,
                "elapsed": outcome.elapsed.as_secs_f64(),
            })
        );
    } else {
        for id in &outcome.executed {
            println!("  {} {}", "compiled".green(), id);
        }
        for id in &outcome.skipped {
            println!("  {} {}", "skipped".yellow(), id);
        }
    }

    if let Some(failed) = &outcome.failed {
        bail!("Compilation aborted in '{}'", failed);
    }
    if !outcome.is_success() {
        bail!("Compilation aborted");
    }

    if !args.json {
        println!(
            "{} {} compilers in {:.2}s",
            "Finished".green().bold(),
            outcome.executed.len(),
            outcome.elapsed.as_secs_f64()
        );
    }
    Ok(())
}
