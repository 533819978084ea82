pub mod compile;
pub mod order;
pub mod sources;

use anyhow::{bail, Context, Result};
use skyline_compiler::factory::{KIND_DIRECTORY_PROTECTION, KIND_ENTRY_POINT};
use skyline_compiler::{
    basic_compilers_factory, config_plugins_factory, CompilerContext, CompilerRegistry,
};
use skyline_config::{CompilerDescription, ConfigLoader, Project, MANIFEST_FILE_NAME};
use std::path::PathBuf;

/// Project selection and compiler flag overrides shared by the commands
#[derive(Debug, Default)]
pub struct ProjectArgs {
    /// Project directory (defaults to current directory)
    pub project_dir: Option<PathBuf>,
    pub dev: bool,
    pub test: bool,
    pub zero_links: bool,
}

/// Compilers run when the manifest does not declare a unit with the same id
fn default_descriptions() -> Vec<CompilerDescription> {
    vec![
        CompilerDescription::new("entry-point", KIND_ENTRY_POINT)
            .with_dependencies(vec!["create-directories".to_string()]),
        CompilerDescription::new("protect-app-data", KIND_DIRECTORY_PROTECTION)
            .with_dependencies(vec!["parameter-config".to_string()]),
    ]
}

/// Load skyline.toml and build a context holding the full pipeline
pub fn load_context(args: &ProjectArgs) -> Result<CompilerContext> {
    let dir = match &args.project_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    if !dir.is_dir() {
        bail!("Project directory {} does not exist", dir.display());
    }

    let config = ConfigLoader::new()
        .load_from_directory(&dir)
        .with_context(|| format!("Failed to load {} from {}", MANIFEST_FILE_NAME, dir.display()))?;

    let mut context = CompilerContext::from_config(&config);
    if context.project().is_none() {
        tracing::info!(dir = %dir.display(), "no manifest found, using directory as project root");
        let root = dir
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", dir.display()))?;
        context.set_project(Project::new(root));
    }

    let configuration = context.configuration_mut();
    configuration.debug |= args.dev;
    configuration.test |= args.test;
    configuration.zero_links |= args.zero_links;

    context.add_factory(basic_compilers_factory());
    context.add_factory(config_plugins_factory());

    let registry = CompilerRegistry::with_predefined();
    let declared: Vec<&str> = config.compilers.iter().map(|d| d.id.as_str()).collect();
    let defaults = default_descriptions()
        .into_iter()
        .filter(|d| !declared.contains(&d.id.as_str()));
    for description in config.compilers.iter().cloned().chain(defaults) {
        context
            .add_described(&registry, &description)
            .with_context(|| format!("Cannot register compiler '{}'", description.id))?;
    }

    Ok(context)
}
