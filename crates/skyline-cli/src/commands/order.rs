//! Order command - show the resolved compiler sequence

use super::ProjectArgs;
use anyhow::{Context, Result};

pub fn run(project: &ProjectArgs, json: bool) -> Result<()> {
    let mut context = super::load_context(project)?;
    let compilers = context
        .organized_compilers()
        .context("Failed to resolve compiler order")?;

    if json {
        let entries: Vec<serde_json::Value> = compilers
            .iter()
            .map(|c| serde_json::json!({ "id": c.id(), "dependencies": c.depends_on() }))
            .collect();
        println!("{}", serde_json::Value::Array(entries));
        return Ok(());
    }

    for (position, compiler) in compilers.iter().enumerate() {
        if compiler.depends_on().is_empty() {
            println!("{:>3}. {}", position + 1, compiler.id());
        } else {
            println!(
                "{:>3}. {} (after {})",
                position + 1,
                compiler.id(),
                compiler.depends_on().join(", ")
            );
        }
    }
    Ok(())
}
