//! Plan Command
//!
//! Shows the units of work a run would dispatch, one line per image or window.

use serde_json::json;

use super::RunOverrides;
use crate::approval::WindowSummary;
use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::pipeline::preview;
use crate::types::{Result, UnitOfWork};

pub fn run(overrides: RunOverrides, format: &str) -> Result<()> {
    let config = ConfigLoader::load()?;
    let source = overrides.resolve_source()?;
    let options = overrides.run_options(&config, String::new());

    let (plan, units) = preview(&source, &options)?;
    let summaries: Vec<WindowSummary> = units.iter().map(summarize).collect();

    if format == "json" {
        let value = json!({ "plan": plan, "units": summaries });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let output = Output::new();
    output.header(&format!("Plan for {}", source.display()));
    output.plan(&plan);
    if summaries.is_empty() {
        output.warning("No images found");
    } else {
        output.windows(&summaries);
    }
    Ok(())
}

fn summarize(unit: &UnitOfWork) -> WindowSummary {
    match unit {
        UnitOfWork::Window(window) => WindowSummary::from(window),
        UnitOfWork::Single { index, .. } => WindowSummary {
            index: *index,
            start: *index,
            members: unit.names(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ImageAsset, Window};

    #[test]
    fn test_summarize_units() {
        let single = UnitOfWork::Single {
            index: 2,
            asset: ImageAsset::new("c.png"),
        };
        let summary = summarize(&single);
        assert_eq!(summary.start, 2);
        assert_eq!(summary.members, vec!["c.png"]);

        let window = UnitOfWork::Window(Window {
            index: 1,
            start: 2,
            assets: vec![ImageAsset::new("c.png"), ImageAsset::new("d.png")],
        });
        assert_eq!(summarize(&window).members, vec!["c.png", "d.png"]);
    }
}
