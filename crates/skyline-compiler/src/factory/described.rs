use super::registry::{
    CompilerRegistry, KIND_COMPOSER_PACKAGES_ORDER, KIND_CREATE_DIRECTORIES,
    KIND_ORDERED_CONFIGURATION,
};
use crate::compiler::{register_unit, Compiler, CompilerFactory};
use crate::context::CompilerContext;
use crate::dependency::DependencyCollection;
use crate::error::CompilerResult;
use serde_json::json;
use skyline_config::CompilerDescription;
use std::rc::Rc;

/// Factory instantiating its units from descriptions through a registry
#[derive(Debug)]
pub struct DescribedCompilerFactory {
    name: String,
    descriptions: Vec<CompilerDescription>,
    registry: Rc<CompilerRegistry>,
}

impl DescribedCompilerFactory {
    pub fn new(name: impl Into<String>, descriptions: Vec<CompilerDescription>) -> Self {
        Self::with_registry(name, descriptions, Rc::new(CompilerRegistry::with_predefined()))
    }

    pub fn with_registry(
        name: impl Into<String>,
        descriptions: Vec<CompilerDescription>,
        registry: Rc<CompilerRegistry>,
    ) -> Self {
        Self {
            name: name.into(),
            descriptions,
            registry,
        }
    }

    pub fn descriptions(&self) -> &[CompilerDescription] {
        &self.descriptions
    }
}

impl CompilerFactory for DescribedCompilerFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn register_compilers(
        &self,
        collection: &mut DependencyCollection<Rc<dyn Compiler>>,
        _context: &CompilerContext,
    ) -> CompilerResult<()> {
        for description in &self.descriptions {
            let compiler = self.registry.instantiate(description)?;
            register_unit(collection, compiler)?;
        }
        Ok(())
    }
}

/// Directory skeleton and composer package order
pub fn basic_compilers_factory() -> DescribedCompilerFactory {
    DescribedCompilerFactory::new(
        "basic-compilers",
        vec![
            CompilerDescription::new("create-directories", KIND_CREATE_DIRECTORIES),
            CompilerDescription::new("composer-packages-order", KIND_COMPOSER_PACKAGES_ORDER)
                .with_dependencies(vec!["create-directories".to_string()]),
        ],
    )
}

/// Merged `*.plugins.json` configuration in composer package order
pub fn config_plugins_factory() -> DescribedCompilerFactory {
    DescribedCompilerFactory::new(
        "config-plugins",
        vec![
            CompilerDescription::new("parameter-config", KIND_ORDERED_CONFIGURATION)
                .with_dependencies(vec!["composer-packages-order".to_string()])
                .with_arguments(json!({
                    "target": "plugins.json",
                    "pattern": r"(?i)^.*\.plugins\.json$",
                    "default": "plugins.json",
                    "dev": "plugins.dev.json",
                    "test": "plugins.test.json",
                })),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompilerError;
    use crate::logger::SilentLogger;
    use pretty_assertions::assert_eq;
    use skyline_config::Project;
    use tempfile::TempDir;

    fn ids(context: &mut CompilerContext) -> Vec<String> {
        context
            .organized_compilers()
            .unwrap()
            .iter()
            .map(|c| c.id().to_string())
            .collect()
    }

    #[test]
    fn test_factories_order_after_their_dependencies() {
        let temp_dir = TempDir::new().unwrap();
        let mut context = CompilerContext::new(Project::new(temp_dir.path()))
            .with_logger(Rc::new(SilentLogger::new()));
        context.add_factory(config_plugins_factory());
        context.add_factory(basic_compilers_factory());

        assert_eq!(
            ids(&mut context),
            vec!["create-directories", "composer-packages-order", "parameter-config"]
        );
    }

    #[test]
    fn test_unknown_kind_aborts_resolution() {
        let temp_dir = TempDir::new().unwrap();
        let logger = Rc::new(SilentLogger::new());
        let mut context =
            CompilerContext::new(Project::new(temp_dir.path())).with_logger(logger.clone());
        context.add_factory(DescribedCompilerFactory::new(
            "broken",
            vec![CompilerDescription::new("x", "unknown")],
        ));

        assert!(matches!(
            context.organized_compilers(),
            Err(CompilerError::InvalidCompilerType { .. })
        ));
        assert!(!context.compile().unwrap().is_success());
        assert_eq!(logger.exceptions().len(), 1);
    }
}
