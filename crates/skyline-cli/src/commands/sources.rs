//! Sources command - list files found by the source code manager

use super::ProjectArgs;
use anyhow::{Context, Result};
use skyline_compiler::predef::ComposerPackagesOrderCompiler;
use skyline_compiler::{Compiler, SearchBanks};

/// Sources command arguments
#[derive(Debug, Default)]
pub struct SourcesArgs {
    pub project: ProjectArgs,
    /// Base-name regex
    pub pattern: Option<String>,
    /// Bank names; empty means the default banks
    pub banks: Vec<String>,
    /// Sort by composer package precedence
    pub package_order: bool,
    /// JSON output
    pub json: bool,
}

pub fn run(args: SourcesArgs) -> Result<()> {
    let mut context = super::load_context(&args.project)?;

    if args.package_order {
        ComposerPackagesOrderCompiler::new("composer-packages-order")
            .compile(&mut context)
            .context("Failed to order composer packages")?;
        context.source_code_manager()?.set_respect_package_order(true);
    }

    let banks = if args.banks.is_empty() {
        SearchBanks::Default
    } else {
        SearchBanks::only(args.banks.iter().cloned())
    };
    let files = context
        .source_files(args.pattern.as_deref(), &banks)
        .context("Source query failed")?;

    let mut paths = Vec::with_capacity(files.len());
    for file in &files {
        let path = context.relative_project_path(file.path())?;
        paths.push(path.display().to_string());
    }

    if args.json {
        println!("{}", serde_json::json!(paths));
    } else {
        for path in &paths {
            println!("{}", path);
        }
    }
    Ok(())
}
