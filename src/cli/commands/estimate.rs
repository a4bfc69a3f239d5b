//! Estimate Command
//!
//! Lists the source directory and prints the token estimate for a run,
//! without contacting the oracle.

use super::RunOverrides;
use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::pipeline::preview;
use crate::types::Result;

pub fn run(overrides: RunOverrides, format: &str) -> Result<()> {
    let config = ConfigLoader::load()?;
    let source = overrides.resolve_source()?;
    let options = overrides.run_options(&config, String::new());

    let (plan, _) = preview(&source, &options)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    let output = Output::new();
    output.header(&format!("Estimate for {}", source.display()));
    output.plan(&plan);
    Ok(())
}
