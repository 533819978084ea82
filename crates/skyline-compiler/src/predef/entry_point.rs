//! Generates the public entry-point script

use crate::compiler::Compiler;
use crate::context::CompilerContext;
use crate::error::{CompilerError, CompilerResult};
use crate::logger::Verbosity;
use skyline_config::project::{
    DESCRIPTION_ATTR_NAME, HOSTS_ATTR_NAME, PUB2ROOT_ATTR_NAME, TITLE_ATTR_NAME,
};
use skyline_config::{AttributeValue, CompilerDescription, Project};
use std::fs;

/// Name of the generated script inside the public directory
pub const ENTRY_POINT_FILE_NAME: &str = "skyline.php";

const DEFAULT_BOOTSTRAP_CLASS: &str = r"Skyline\Kernel\Bootstrap";
const DEFAULT_APPLICATION_CLASS: &str = r"Skyline\Application\Application";

/// Writes `<public>/skyline.php`, the script every request enters through
#[derive(Debug, Clone)]
pub struct EntryPointCompiler {
    id: String,
    dependencies: Vec<String>,
}

impl EntryPointCompiler {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn from_description(description: &CompilerDescription) -> CompilerResult<Self> {
        if !description.arguments.is_null() {
            return Err(CompilerError::invalid_arguments(
                &description.id,
                "entry-point takes no arguments",
            ));
        }
        Ok(Self::new(&description.id).with_dependencies(description.dependencies.clone()))
    }

    /// Full script content for the current context
    pub fn render(&self, context: &CompilerContext) -> CompilerResult<String> {
        let project = context.require_project()?;
        let parameters = context.parameters();
        let application = parameters
            .application_class()
            .unwrap_or(DEFAULT_APPLICATION_CLASS);
        let bootstrap = parameters.bootstrap_class().unwrap_or(DEFAULT_BOOTSTRAP_CLASS);

        let app_data = context.app_data_directory()?;
        let app_data = pathdiff::diff_paths(&app_data, project.root_directory()).unwrap_or(app_data);

        let mut out = String::from("<?php\n\n");
        out.push_str(&format!("use {} as Application;\n", application));
        out.push_str(&format!("use {} as Bootstrap;\n", bootstrap));
        out.push_str("use Skyline\\Kernel\\Service\\CORSService as CORS;\n\n");
        out.push_str(&format!("define(\"SKY_DEBUG\", {});\n", context.is_development_context()));
        out.push_str(&format!("define(\"SKY_TEST\", {});\n\n", context.is_test_context()));
        out.push_str(&root_directive(project, context.use_zero_links()));
        out.push_str("require 'vendor/autoload.php';\n\n");
        out.push_str(&format!(
            "$configuration = Bootstrap::getConfigurationPath({});\n\n",
            php_string(&app_data.to_string_lossy())
        ));
        out.push_str(&cors_registrations(project));
        out.push_str("\nBootstrap::bootstrap($configuration);\n\n");
        out.push_str(&service_parameters(project));
        out.push_str("\n$app = new Application();\n$app->run();\n");
        Ok(out)
    }
}

impl Compiler for EntryPointCompiler {
    fn id(&self) -> &str {
        &self.id
    }

    fn depends_on(&self) -> &[String] {
        &self.dependencies
    }

    fn compile(&self, context: &mut CompilerContext) -> CompilerResult<()> {
        let content = self.render(context)?;
        let public = context.require_project()?.public_directory().to_path_buf();
        fs::create_dir_all(&public).map_err(|e| CompilerError::io(&public, e))?;

        let target = public.join(ENTRY_POINT_FILE_NAME);
        fs::write(&target, content).map_err(|e| CompilerError::io(&target, e))?;
        context.logger().log_text(
            &format!("Entry point written to {}", target.display()),
            Verbosity::Verbose,
        );
        Ok(())
    }
}

/// `chdir` into the project root when the script does not live there
fn root_directive(project: &Project, zero_links: bool) -> String {
    let root = project.root_directory();
    let public = project.public_directory();
    if root == public {
        return String::new();
    }
    if zero_links {
        return format!("chdir({});\n", php_string(&root.to_string_lossy()));
    }

    let relative = match project.text_attribute(PUB2ROOT_ATTR_NAME) {
        Some(relative) => relative.to_string(),
        None => {
            let relative = pathdiff::diff_paths(root, public).unwrap_or_else(|| root.to_path_buf());
            format!("{}/", relative.to_string_lossy())
        }
    };
    format!(
        "chdir( dirname(__FILE__) . DIRECTORY_SEPARATOR . {});\n",
        php_string(&relative)
    )
}

/// One `CORS::registerHost` call per accepted origin of each host
///
/// A host maps to an origin, a list of origins (empty accepts the host only)
/// or a table with `remote`, `credentials` and `label`.
fn cors_registrations(project: &Project) -> String {
    let Some(hosts) = project.attribute(HOSTS_ATTR_NAME).and_then(AttributeValue::as_table) else {
        return String::new();
    };

    let mut out = String::new();
    for (host, accepts) in hosts {
        match accepts {
            AttributeValue::List(origins) if origins.is_empty() => {
                out.push_str(&register_host(host, "", false, ""));
            }
            AttributeValue::List(origins) => {
                for origin in origins.iter().filter_map(AttributeValue::as_str) {
                    out.push_str(&register_host(host, origin, false, ""));
                }
            }
            AttributeValue::Text(origin) => out.push_str(&register_host(host, origin, false, "")),
            AttributeValue::Table(options) => {
                let remote = options.get("remote").and_then(AttributeValue::as_str).unwrap_or("");
                let credentials = matches!(options.get("credentials"), Some(AttributeValue::Flag(true)));
                let label = options.get("label").and_then(AttributeValue::as_str).unwrap_or("");
                out.push_str(&register_host(host, remote, credentials, label));
            }
            _ => tracing::debug!(host, "ignoring host with unsupported value"),
        }
    }
    out
}

fn register_host(host: &str, remote: &str, credentials: bool, label: &str) -> String {
    let mut args = vec![php_string(host)];
    if !remote.is_empty() || credentials || !label.is_empty() {
        args.push(php_string(remote));
    }
    if credentials || !label.is_empty() {
        args.push(credentials.to_string());
    }
    if !label.is_empty() {
        args.push(php_string(label));
    }
    format!("CORS::registerHost({});\n", args.join(", "))
}

fn service_parameters(project: &Project) -> String {
    let title = project.text_attribute(TITLE_ATTR_NAME).filter(|t| !t.is_empty());
    let description = project
        .text_attribute(DESCRIPTION_ATTR_NAME)
        .filter(|d| !d.is_empty());
    if title.is_none() && description.is_none() {
        return String::new();
    }

    let mut out = String::from(
        "/** @var \\TASoft\\Service\\ServiceManager $SERVICES */\nglobal $SERVICES;\n",
    );
    if let Some(title) = title {
        out.push_str(&format!("$SERVICES->setParameter(\"AppTitle\", {});\n", php_string(title)));
    }
    if let Some(description) = description {
        out.push_str(&format!(
            "$SERVICES->setParameter(\"AppDescription\", {});\n",
            php_string(description)
        ));
    }
    out
}

/// Single-quoted PHP string literal
fn php_string(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::SilentLogger;
    use std::collections::BTreeMap;
    use std::path::Path;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn render(project: Project) -> String {
        let context = CompilerContext::new(project).with_logger(Rc::new(SilentLogger::new()));
        EntryPointCompiler::new("entry-point").render(&context).unwrap()
    }

    #[test]
    fn test_php_string_escapes() {
        assert_eq!(php_string(r"it's a\b"), r"'it\'s a\\b'");
    }

    #[test]
    fn test_default_classes_and_flags() {
        let script = render(Project::new("/srv/app").with_public_directory("public_html"));

        assert!(script.starts_with("<?php\n"));
        assert!(script.contains("use Skyline\\Application\\Application as Application;"));
        assert!(script.contains("use Skyline\\Kernel\\Bootstrap as Bootstrap;"));
        assert!(script.contains("define(\"SKY_DEBUG\", false);"));
        assert!(script.contains("define(\"SKY_TEST\", false);"));
        assert!(script.contains("chdir( dirname(__FILE__) . DIRECTORY_SEPARATOR . '../');"));
        assert!(script.contains("Bootstrap::getConfigurationPath('SkylineAppData');"));
        assert!(!script.contains("CORS::registerHost"));
        assert!(!script.contains("$SERVICES"));
    }

    #[test]
    fn test_script_layout() {
        let script = render(Project::new("/srv/app").with_public_directory(""));

        let expected = [
            "<?php",
            "",
            "use Skyline\\Application\\Application as Application;",
            "use Skyline\\Kernel\\Bootstrap as Bootstrap;",
            "use Skyline\\Kernel\\Service\\CORSService as CORS;",
            "",
            "define(\"SKY_DEBUG\", false);",
            "define(\"SKY_TEST\", false);",
            "",
            "require 'vendor/autoload.php';",
            "",
            "$configuration = Bootstrap::getConfigurationPath('SkylineAppData');",
            "",
            "",
            "Bootstrap::bootstrap($configuration);",
            "",
            "",
            "$app = new Application();",
            "$app->run();",
            "",
        ]
        .join("\n");
        pretty_assertions::assert_eq!(script, expected);
    }

    #[test]
    fn test_root_directive_variants() {
        let same = Project::new("/srv/app").with_public_directory("");
        assert_eq!(root_directive(&same, false), "");

        let nested = Project::new("/srv/app").with_public_directory("web/public");
        assert!(root_directive(&nested, false).contains("'../../'"));
        assert_eq!(root_directive(&nested, true), "chdir('/srv/app');\n");

        let custom = nested.with_attribute(PUB2ROOT_ATTR_NAME, "../custom/");
        assert!(root_directive(&custom, false).contains("'../custom/'"));
    }

    #[test]
    fn test_cors_registrations() {
        let mut options = BTreeMap::new();
        options.insert("remote".to_string(), AttributeValue::from("https://api.example.org"));
        options.insert("credentials".to_string(), AttributeValue::Flag(true));

        let mut hosts = BTreeMap::new();
        hosts.insert(
            "a.example.org".to_string(),
            AttributeValue::List(vec!["https://cdn.example.org".into(), "https://x.org".into()]),
        );
        hosts.insert("b.example.org".to_string(), AttributeValue::List(Vec::new()));
        hosts.insert("c.example.org".to_string(), AttributeValue::from("https://c.org"));
        hosts.insert("d.example.org".to_string(), AttributeValue::Table(options));

        let project = Project::new("/srv/app").with_attribute(HOSTS_ATTR_NAME, AttributeValue::Table(hosts));
        assert_eq!(
            cors_registrations(&project),
            "CORS::registerHost('a.example.org', 'https://cdn.example.org');\n\
             CORS::registerHost('a.example.org', 'https://x.org');\n\
             CORS::registerHost('b.example.org');\n\
             CORS::registerHost('c.example.org', 'https://c.org');\n\
             CORS::registerHost('d.example.org', 'https://api.example.org', true);\n"
        );
    }

    #[test]
    fn test_compile_writes_script_with_parameters() {
        let temp_dir = TempDir::new().unwrap();
        let project = Project::new(temp_dir.path())
            .with_public_directory("public_html")
            .with_attribute(TITLE_ATTR_NAME, "Bob's shop")
            .with_parameter("application-class", "Shop\\Application");
        let mut context = CompilerContext::new(project).with_logger(Rc::new(SilentLogger::new()));
        context.configuration_mut().debug = true;
        context.add_unit(EntryPointCompiler::new("entry-point"));

        assert!(context.compile().unwrap().is_success());

        let script = fs::read_to_string(
            Path::new(temp_dir.path()).join("public_html").join(ENTRY_POINT_FILE_NAME),
        )
        .unwrap();
        assert!(script.contains("use Shop\\Application as Application;"));
        assert!(script.contains("define(\"SKY_DEBUG\", true);"));
        assert!(script.contains("$SERVICES->setParameter(\"AppTitle\", 'Bob\\'s shop');"));
        assert!(!script.contains("AppDescription"));
    }
}
