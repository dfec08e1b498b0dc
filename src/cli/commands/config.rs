//! Config Command
//!
//! Usage:
//!   lessonaudit config show [-f json]
//!   lessonaudit config path
//!   lessonaudit config init [-g] [--force]

use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the merged effective configuration
pub fn show(format: &str) -> Result<()> {
    ConfigLoader::show_config(format == "json")
}

pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

/// Write a default config.toml, globally or for the current project
pub fn init(global: bool, force: bool) -> Result<()> {
    let path = if global {
        ConfigLoader::init_global(force)?
    } else {
        ConfigLoader::init_project(force)?
    };
    let out = Output::new();
    out.success("Initialized configuration");
    out.field("config", &path.display().to_string());
    Ok(())
}
