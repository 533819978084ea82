use crate::compiler::Compiler;
use crate::error::{CompilerError, CompilerResult};
use crate::predef::{
    ComposerPackagesOrderCompiler, ConfigurationCompiler, CreateDirectoriesCompiler,
    DirectoryProtectionCompiler, EntryPointCompiler,
};
use skyline_config::CompilerDescription;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

pub const KIND_CREATE_DIRECTORIES: &str = "create-directories";
pub const KIND_DIRECTORY_PROTECTION: &str = "directory-protection";
pub const KIND_COMPOSER_PACKAGES_ORDER: &str = "composer-packages-order";
pub const KIND_CONFIGURATION: &str = "configuration";
pub const KIND_ORDERED_CONFIGURATION: &str = "ordered-configuration";
pub const KIND_ENTRY_POINT: &str = "entry-point";

type Constructor = Box<dyn Fn(&CompilerDescription) -> CompilerResult<Rc<dyn Compiler>>>;

/// Maps compiler kinds to constructors
#[derive(Default)]
pub struct CompilerRegistry {
    constructors: BTreeMap<String, Constructor>,
}

impl CompilerRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry knowing every predefined compiler kind
    pub fn with_predefined() -> Self {
        let mut registry = Self::new();
        registry.register(KIND_CREATE_DIRECTORIES, |d| {
            Ok(Rc::new(CreateDirectoriesCompiler::from_description(d)?))
        });
        registry.register(KIND_DIRECTORY_PROTECTION, |d| {
            Ok(Rc::new(DirectoryProtectionCompiler::from_description(d)?))
        });
        registry.register(KIND_COMPOSER_PACKAGES_ORDER, |d| {
            Ok(Rc::new(ComposerPackagesOrderCompiler::from_description(d)?))
        });
        registry.register(KIND_CONFIGURATION, |d| {
            Ok(Rc::new(ConfigurationCompiler::from_description(d, false)?))
        });
        registry.register(KIND_ORDERED_CONFIGURATION, |d| {
            Ok(Rc::new(ConfigurationCompiler::from_description(d, true)?))
        });
        registry.register(KIND_ENTRY_POINT, |d| {
            Ok(Rc::new(EntryPointCompiler::from_description(d)?))
        });
        registry
    }

    /// Register or replace the constructor of a kind
    pub fn register<F>(&mut self, kind: impl Into<String>, constructor: F)
    where
        F: Fn(&CompilerDescription) -> CompilerResult<Rc<dyn Compiler>> + 'static,
    {
        self.constructors.insert(kind.into(), Box::new(constructor));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Known kinds in lexical order
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Build the compiler a description names
    pub fn instantiate(&self, description: &CompilerDescription) -> CompilerResult<Rc<dyn Compiler>> {
        let constructor = self.constructors.get(&description.kind).ok_or_else(|| {
            CompilerError::InvalidCompilerType {
                id: description.id.clone(),
                kind: description.kind.clone(),
            }
        })?;
        constructor(description)
    }
}

impl fmt::Debug for CompilerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.kinds()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CallbackCompiler;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_predefined_kinds() {
        let registry = CompilerRegistry::with_predefined();
        let kinds: Vec<&str> = registry.kinds().collect();
        assert_eq!(
            kinds,
            vec![
                "composer-packages-order",
                "configuration",
                "create-directories",
                "directory-protection",
                "entry-point",
                "ordered-configuration",
            ]
        );
    }

    #[test]
    fn test_instantiate_keeps_id_and_dependencies() {
        let registry = CompilerRegistry::with_predefined();
        let description = CompilerDescription::new("protect", KIND_DIRECTORY_PROTECTION)
            .with_dependencies(vec!["create-directories".to_string()]);

        let compiler = registry.instantiate(&description).unwrap();
        assert_eq!(compiler.id(), "protect");
        assert_eq!(compiler.depends_on(), ["create-directories".to_string()]);
    }

    #[test]
    fn test_unknown_kind() {
        let registry = CompilerRegistry::with_predefined();
        let result = registry.instantiate(&CompilerDescription::new("x", "minify-css"));
        assert!(matches!(
            result,
            Err(CompilerError::InvalidCompilerType { kind, .. }) if kind == "minify-css"
        ));
    }

    #[test]
    fn test_custom_kind() {
        let mut registry = CompilerRegistry::new();
        assert!(!registry.contains("noop"));
        registry.register("noop", |d| Ok(Rc::new(CallbackCompiler::new(&d.id, |_| Ok(())))));

        assert!(registry.contains("noop"));
        let compiler = registry.instantiate(&CompilerDescription::new("n", "noop")).unwrap();
        assert_eq!(compiler.id(), "n");
    }
}
