//! Predefined compiler units

pub mod composer_packages;
pub mod configuration;
pub mod create_directories;
pub mod directory_protection;
pub mod entry_point;

pub use composer_packages::ComposerPackagesOrderCompiler;
pub use configuration::{ConfigurationCompiler, ConfigurationInfo};
pub use create_directories::CreateDirectoriesCompiler;
pub use directory_protection::{DirectoryProtectionCompiler, PROTECTION_FILE_NAME, PROTECTION_MARKER};
pub use entry_point::{EntryPointCompiler, ENTRY_POINT_FILE_NAME};

use crate::error::{CompilerError, CompilerResult};
use serde::de::DeserializeOwned;
use skyline_config::CompilerDescription;

/// Decode the `arguments` of a description, using defaults when absent
pub(crate) fn parse_arguments<T>(description: &CompilerDescription) -> CompilerResult<T>
where
    T: DeserializeOwned + Default,
{
    if description.arguments.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(description.arguments.clone())
        .map_err(|e| CompilerError::invalid_arguments(&description.id, e))
}
