//! Prompts Command
//!
//! Manage saved prompts.
//!
//! Usage:
//!   framescribe prompts list
//!   framescribe prompts show <NAME>
//!   framescribe prompts add "Describe the scene. Mention visible text." [--name scene]
//!   framescribe prompts remove <NAME>

use console::style;

use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::prompts::PromptStore;
use crate::types::Result;

fn open_store() -> Result<PromptStore> {
    let config = ConfigLoader::load()?;
    PromptStore::open(ConfigLoader::prompts_path(&config)?)
}

pub fn list() -> Result<()> {
    let store = open_store()?;
    if store.is_empty() {
        println!("No saved prompts in {}", store.path().display());
        return Ok(());
    }
    for (name, text) in store.list() {
        println!("{}", style(name).bold());
        println!("  {}", text);
    }
    Ok(())
}

pub fn show(name: &str) -> Result<()> {
    let store = open_store()?;
    println!("{}", store.require(name)?);
    Ok(())
}

pub fn add(text: &str, name: Option<&str>) -> Result<()> {
    let mut store = open_store()?;
    let saved = store.save(name, text)?;
    Output::new().success(&format!("Saved prompt '{}'", saved));
    Ok(())
}

pub fn remove(name: &str) -> Result<()> {
    let mut store = open_store()?;
    let output = Output::new();
    if store.remove(name)? {
        output.success(&format!("Removed prompt '{}'", name));
    } else {
        output.warning(&format!("No prompt named '{}'", name));
    }
    Ok(())
}
