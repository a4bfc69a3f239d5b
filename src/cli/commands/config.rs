//! Config Command
//!
//! Manage framescribe configuration.
//!
//! Usage:
//!   framescribe config show [-g] [-f json]
//!   framescribe config path
//!   framescribe config init [-g] [--force]

use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show configuration
pub fn show(global: bool, format: &str) -> Result<()> {
    if !global {
        return ConfigLoader::show_config(format == "json");
    }

    match ConfigLoader::global_config_path() {
        Some(path) if path.exists() => {
            println!("# Global Config: {}\n", path.display());
            println!("{}", std::fs::read_to_string(&path)?);
        }
        Some(_) => {
            println!("No global config found.");
            println!("Run 'framescribe config init --global' to create one.");
        }
        None => println!("Cannot determine global config directory."),
    }
    Ok(())
}

/// Show configuration paths
pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

/// Initialize global configuration
pub fn init_global(force: bool) -> Result<()> {
    let path = ConfigLoader::init_global(force)?;
    Output::new().success("Initialized global configuration");
    println!("  Config: {}", path.display());
    Ok(())
}

/// Initialize project configuration in the current directory
pub fn init_project(force: bool) -> Result<()> {
    let root = std::env::current_dir()?;
    let path = ConfigLoader::init_project(&root, force)?;
    Output::new().success("Initialized project configuration");
    println!("  Config: {}", path.display());
    Ok(())
}
