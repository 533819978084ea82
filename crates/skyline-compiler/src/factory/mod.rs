//! Compilers described by configuration
//!
//! A [`CompilerRegistry`] maps compiler kinds to constructors. A
//! [`DescribedCompilerFactory`] turns a list of descriptions into units when
//! the context resolves its order.

pub mod described;
pub mod registry;

pub use described::{basic_compilers_factory, config_plugins_factory, DescribedCompilerFactory};
pub use registry::{
    CompilerRegistry, KIND_COMPOSER_PACKAGES_ORDER, KIND_CONFIGURATION, KIND_CREATE_DIRECTORIES,
    KIND_DIRECTORY_PROTECTION, KIND_ENTRY_POINT, KIND_ORDERED_CONFIGURATION,
};
