use console::style;

use crate::approval::WindowSummary;
use crate::types::{RunPlan, RunResult, TreatmentMode};

pub struct Output {
    quiet: bool,
}

impl Output {
    pub fn new() -> Self {
        Self { quiet: false }
    }

    /// Suppress informational lines; errors and warnings still print
    pub fn quiet(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("✓").green(), message);
        }
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        eprintln!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("ℹ").blue(), message);
        }
    }

    pub fn header(&self, message: &str) {
        if !self.quiet {
            println!("\n{}", style(message).bold().underlined());
        }
    }

    pub fn section(&self, message: &str) {
        if !self.quiet {
            println!("\n{}", style(message).bold());
            println!("{}", "─".repeat(40));
        }
    }

    /// Key/value line under a section
    pub fn field(&self, key: &str, value: impl std::fmt::Display) {
        if !self.quiet {
            println!("  {:<18} {}", style(key).dim(), value);
        }
    }

    pub fn plan(&self, plan: &RunPlan) {
        self.section("Plan");
        self.field("Mode", plan.mode);
        self.field("Detail", plan.detail);
        if plan.mode == TreatmentMode::Sequential {
            self.field("Sequence length", plan.sequence_length);
            self.field("Overlap", plan.overlap);
        }
        self.field("Images", plan.asset_count);
        self.field("Units", plan.unit_count);
        self.field("Estimated tokens", plan.estimated_cost);
    }

    pub fn windows(&self, windows: &[WindowSummary]) {
        if windows.is_empty() {
            return;
        }
        self.section("Windows");
        for window in windows {
            if !self.quiet {
                println!(
                    "  {:>4}  {}",
                    style(window.index + 1).cyan(),
                    window.members.join(", ")
                );
            }
        }
    }

    pub fn summary(&self, result: &RunResult) {
        self.section("Result");
        self.field("Status", result.status);
        self.field("Described", result.succeeded());
        self.field("Failed", result.failed());
        for record in result.records.iter().filter(|r| r.is_failed()) {
            if let Some(failure) = &record.failure {
                self.warning(&format!(
                    "{} [{}] {}",
                    record.subject.display(),
                    failure.category,
                    failure.message
                ));
            }
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
