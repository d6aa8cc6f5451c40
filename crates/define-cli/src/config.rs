//! TOML configuration shared by all commands.
//!
//! ```toml
//! [engine]
//! reference-policy = "strict"
//!
//! [save]
//! target-version = "2.1.0"
//! remove-unused-code-lists = true
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use define_core::{EngineOptions, SaveOptions};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct CliConfig {
    pub engine: EngineOptions,
    pub save: SaveOptions,
}

impl CliConfig {
    /// Read the configuration file, or the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parse config {}", path.display()))
    }
}
