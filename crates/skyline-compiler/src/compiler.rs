//! Compiler unit and factory contracts

use crate::context::CompilerContext;
use crate::dependency::DependencyCollection;
use crate::error::CompilerResult;
use std::fmt;
use std::rc::Rc;

/// One named step of the generation pipeline
pub trait Compiler {
    /// Unique id within a run
    fn id(&self) -> &str;

    /// Ids of compilers that must run first
    fn depends_on(&self) -> &[String] {
        &[]
    }

    /// Run the step; an error aborts the remaining sequence
    fn compile(&self, context: &mut CompilerContext) -> CompilerResult<()>;
}

/// Contributes compiler units when the order is resolved
pub trait CompilerFactory {
    /// Name used to identify the factory in the context
    fn name(&self) -> &str;

    fn register_compilers(
        &self,
        collection: &mut DependencyCollection<Rc<dyn Compiler>>,
        context: &CompilerContext,
    ) -> CompilerResult<()>;
}

/// Item registered with a context
#[derive(Clone)]
pub enum CompilerItem {
    Unit(Rc<dyn Compiler>),
    Factory(Rc<dyn CompilerFactory>),
}

impl CompilerItem {
    pub fn unit(compiler: impl Compiler + 'static) -> Self {
        Self::Unit(Rc::new(compiler))
    }

    pub fn factory(factory: impl CompilerFactory + 'static) -> Self {
        Self::Factory(Rc::new(factory))
    }

    /// Compiler id or factory name
    pub fn id(&self) -> &str {
        match self {
            Self::Unit(compiler) => compiler.id(),
            Self::Factory(factory) => factory.name(),
        }
    }
}

impl fmt::Debug for CompilerItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit(compiler) => f.debug_tuple("Unit").field(&compiler.id()).finish(),
            Self::Factory(factory) => f.debug_tuple("Factory").field(&factory.name()).finish(),
        }
    }
}

/// Register a unit into a factory's collection under its own id and dependencies
pub fn register_unit(
    collection: &mut DependencyCollection<Rc<dyn Compiler>>,
    compiler: Rc<dyn Compiler>,
) -> CompilerResult<()> {
    let id = compiler.id().to_string();
    let dependencies = compiler.depends_on().to_vec();
    collection.add(id, compiler, dependencies)
}

type CompileFn = dyn Fn(&mut CompilerContext) -> CompilerResult<()>;

/// Compiler built from a closure
pub struct CallbackCompiler {
    id: String,
    dependencies: Vec<String>,
    callback: Box<CompileFn>,
}

impl CallbackCompiler {
    pub fn new<F>(id: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&mut CompilerContext) -> CompilerResult<()> + 'static,
    {
        Self {
            id: id.into(),
            dependencies: Vec::new(),
            callback: Box::new(callback),
        }
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }
}

impl Compiler for CallbackCompiler {
    fn id(&self) -> &str {
        &self.id
    }

    fn depends_on(&self) -> &[String] {
        &self.dependencies
    }

    fn compile(&self, context: &mut CompilerContext) -> CompilerResult<()> {
        (self.callback)(context)
    }
}
