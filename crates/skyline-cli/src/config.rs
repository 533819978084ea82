//! CLI configuration via environment variables
//!
//! Project settings live in skyline.toml; these only affect how the CLI
//! reports results.

use std::env;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Default to JSON output (SKYLINE_OUTPUT=json)
    pub default_json: bool,
    /// Disable colored output (SKYLINE_NO_COLOR=1 or NO_COLOR=1)
    pub no_color: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            default_json: env::var("SKYLINE_OUTPUT")
                .map(|v| v.to_lowercase() == "json")
                .unwrap_or(false),
            no_color: env::var("SKYLINE_NO_COLOR").is_ok() || env::var("NO_COLOR").is_ok(),
        }
    }
}
