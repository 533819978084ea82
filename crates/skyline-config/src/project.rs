//! Project Descriptor
//!
//! The project is consumed, never modified, by the compiler pipeline. It exposes
//! the root and public directories, a search path collection and free-form
//! attributes.

use crate::manifest::ProjectSection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Search path holding composer packages
pub const SEARCH_PATH_VENDOR: &str = "vendor";
/// Search path holding project classes
pub const SEARCH_PATH_CLASSES: &str = "classes";
/// Search path holding project modules
pub const SEARCH_PATH_MODULES: &str = "modules";
/// Search path holding configuration sources
pub const SEARCH_PATH_CONFIG: &str = "config";
/// Search path holding user defined default configuration files
pub const SEARCH_PATH_USER_CONFIG: &str = "user-config";

/// Attribute holding the project title
pub const TITLE_ATTR_NAME: &str = "title";
/// Attribute holding the project description
pub const DESCRIPTION_ATTR_NAME: &str = "description";
/// Attribute holding accepted CORS hosts
pub const HOSTS_ATTR_NAME: &str = "hosts";
/// Attribute overriding the public-to-root relative path
pub const PUB2ROOT_ATTR_NAME: &str = "pub2root";

/// Value of a project attribute
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AttributeValue {
    Flag(bool),
    Integer(i64),
    Text(String),
    List(Vec<AttributeValue>),
    Table(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttributeValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&BTreeMap<String, AttributeValue>> {
        match self {
            Self::Table(table) => Some(table),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Named search path lists, each resolved against the project root
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPaths {
    paths: BTreeMap<String, Vec<PathBuf>>,
}

impl SearchPaths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a directory to the named list
    pub fn add(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        self.paths.entry(name.into()).or_default().push(path.into());
    }

    /// Directories of a named list (empty when undeclared)
    pub fn get(&self, name: &str) -> &[PathBuf] {
        self.paths.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Declared list names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.paths.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// A project as seen by the compiler pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    root_directory: PathBuf,
    public_directory: PathBuf,
    search_paths: SearchPaths,
    attributes: BTreeMap<String, AttributeValue>,
    parameters: BTreeMap<String, String>,
}

impl Project {
    /// Create a project rooted at `root` with `root/public` as public directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root_directory = root.into();
        Self {
            public_directory: root_directory.join("public"),
            root_directory,
            search_paths: SearchPaths::new(),
            attributes: BTreeMap::new(),
            parameters: BTreeMap::new(),
        }
    }

    /// Build a project from a manifest section located in `manifest_dir`
    pub fn from_section(section: &ProjectSection, manifest_dir: &Path) -> Self {
        let root_directory = manifest_dir.join(&section.root);
        let mut project = Self::new(&root_directory).with_public_directory(&section.public);

        for (name, dirs) in &section.search_paths {
            for dir in dirs {
                project = project.with_search_path(name, dir);
            }
        }
        for (name, value) in &section.attributes {
            project = project.with_attribute(name, value.clone());
        }
        if let Some(title) = &section.title {
            project = project.with_attribute(TITLE_ATTR_NAME, title.as_str());
        }
        if let Some(description) = &section.description {
            project = project.with_attribute(DESCRIPTION_ATTR_NAME, description.as_str());
        }
        project.parameters = section.parameters.clone();
        project
    }

    /// Set the public directory (relative paths are resolved against the root)
    pub fn with_public_directory(mut self, public: impl AsRef<Path>) -> Self {
        self.public_directory = self.root_directory.join(public);
        self
    }

    /// Append a search path (relative paths are resolved against the root)
    pub fn with_search_path(mut self, name: &str, dir: impl AsRef<Path>) -> Self {
        let dir = self.root_directory.join(dir);
        self.search_paths.add(name, dir);
        self
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn with_parameter(mut self, name: &str, value: impl Into<String>) -> Self {
        self.parameters.insert(name.to_string(), value.into());
        self
    }

    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    pub fn public_directory(&self) -> &Path {
        &self.public_directory
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Text value of an attribute, if present and textual
    pub fn text_attribute(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(AttributeValue::as_str)
    }

    pub fn search_paths(&self) -> &SearchPaths {
        &self.search_paths
    }

    /// Initial context parameters declared by the project
    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_resolved_against_root() {
        let project = Project::new("/srv/app")
            .with_public_directory("public_html")
            .with_search_path(SEARCH_PATH_VENDOR, "vendor")
            .with_search_path(SEARCH_PATH_VENDOR, "/opt/shared");

        assert_eq!(project.public_directory(), Path::new("/srv/app/public_html"));
        assert_eq!(
            project.search_paths().get(SEARCH_PATH_VENDOR),
            &[PathBuf::from("/srv/app/vendor"), PathBuf::from("/opt/shared")]
        );
        assert!(project.search_paths().get(SEARCH_PATH_CLASSES).is_empty());
    }

    #[test]
    fn test_from_section() {
        let section: ProjectSection = toml::from_str(
            r#"
root = "app"
public = "web"
title = "Demo"

[search-paths]
classes = ["src"]

[attributes]
hosts = { "example.org" = ["https://cdn.example.org"] }

[parameters]
application-class = "App"
"#,
        )
        .unwrap();

        let project = Project::from_section(&section, Path::new("/work"));
        assert_eq!(project.root_directory(), Path::new("/work/app"));
        assert_eq!(project.public_directory(), Path::new("/work/app/web"));
        assert_eq!(project.text_attribute(TITLE_ATTR_NAME), Some("Demo"));
        assert_eq!(
            project.search_paths().get(SEARCH_PATH_CLASSES),
            &[PathBuf::from("/work/app/src")]
        );

        let hosts = project.attribute(HOSTS_ATTR_NAME).unwrap().as_table().unwrap();
        assert!(hosts.contains_key("example.org"));
        assert_eq!(
            project.parameters().get("application-class").map(String::as_str),
            Some("App")
        );
    }

    #[test]
    fn test_attribute_value_untagged() {
        let value: AttributeValue = toml::from_str::<BTreeMap<String, AttributeValue>>(
            "flag = true\ncount = 3\nlist = [\"a\", \"b\"]",
        )
        .unwrap()
        .remove("list")
        .unwrap();

        assert_eq!(value.as_list().map(<[_]>::len), Some(2));
    }
}
