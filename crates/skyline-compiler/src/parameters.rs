//! Context parameters shared with the generated application

use crate::error::{CompilerError, CompilerResult};
use std::collections::BTreeMap;

pub const BOOTSTRAP_CLASS_PARAM: &str = "bootstrap-class";
pub const APPLICATION_CLASS_PARAM: &str = "application-class";
pub const CONTEXT_CLASS_PARAM: &str = "context-class";

/// Named parameters that can be frozen once a run has configured them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextParameters {
    values: BTreeMap<String, String>,
    frozen: bool,
}

impl ContextParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(values: BTreeMap<String, String>) -> Self {
        Self {
            values,
            frozen: false,
        }
    }

    /// Set a parameter; fails once modifications are denied
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> CompilerResult<()> {
        if self.frozen {
            return Err(CompilerError::BadConfiguration(format!(
                "Context parameter '{}' can not be modified",
                name
            )));
        }
        self.values.insert(name.to_string(), value.into());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn bootstrap_class(&self) -> Option<&str> {
        self.get(BOOTSTRAP_CLASS_PARAM)
    }

    pub fn application_class(&self) -> Option<&str> {
        self.get(APPLICATION_CLASS_PARAM)
    }

    pub fn context_class(&self) -> Option<&str> {
        self.get(CONTEXT_CLASS_PARAM)
    }

    /// Freeze the parameters
    pub fn deny_modifications(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
