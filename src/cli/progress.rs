//! Console rendering of run progress events.

use std::io::Write;

use console::style;
use tokio::sync::mpsc;

use crate::pipeline::{PipelineState, ProgressEvent, percent};
use crate::types::RunStatus;

/// Draws a single updating progress line from a run's event stream
pub struct ConsoleRenderer {
    quiet: bool,
    bar_width: usize,
}

impl ConsoleRenderer {
    pub fn new() -> Self {
        Self {
            quiet: false,
            bar_width: 30,
        }
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Consume events until the run's reporter goes away
    pub async fn drain(self, events: &mut mpsc::UnboundedReceiver<ProgressEvent>) {
        let mut line_open = false;

        while let Some(event) = events.recv().await {
            if self.quiet {
                continue;
            }

            match &event {
                ProgressEvent::UnitStarted { .. } | ProgressEvent::UnitFinished { .. } => {
                    if let Some(line) = self.render(&event) {
                        print!("\r\x1B[K{}", line);
                        let _ = std::io::stdout().flush();
                        line_open = true;
                    }
                }
                _ => {
                    if let Some(line) = self.render(&event) {
                        if line_open {
                            println!();
                            line_open = false;
                        }
                        println!("{}", line);
                    }
                }
            }
        }

        if line_open {
            println!();
        }
    }

    /// Text for one event, `None` for events with nothing to show
    pub fn render(&self, event: &ProgressEvent) -> Option<String> {
        match event {
            ProgressEvent::StateChanged { state } => match state {
                PipelineState::Listing => Some(format!("{} Listing images", style("→").cyan())),
                PipelineState::Estimating => {
                    Some(format!("{} Estimating cost", style("→").cyan()))
                }
                PipelineState::AwaitingApproval => {
                    Some(format!("{} Waiting for approval", style("→").cyan()))
                }
                PipelineState::Dispatching => {
                    Some(format!("{} Describing images", style("→").cyan()))
                }
                _ => None,
            },
            ProgressEvent::PlanReady { plan } => Some(format!(
                "  {} images, {} units, ~{} tokens",
                plan.asset_count, plan.unit_count, plan.estimated_cost
            )),
            ProgressEvent::UnitStarted {
                ordinal,
                total,
                label,
            } => Some(format!(
                "{} {}/{} {}",
                render_progress_bar(*ordinal, *total, self.bar_width),
                ordinal + 1,
                total,
                label
            )),
            ProgressEvent::UnitFinished {
                completed,
                total,
                subject,
                failed,
                eta_secs,
            } => {
                let marker = if *failed {
                    style("✗").red()
                } else {
                    style("✓").green()
                };
                let eta = eta_secs
                    .map(|s| format!(" ETA: {}", format_duration(s)))
                    .unwrap_or_default();
                Some(format!(
                    "{} {:>5.1}% {} {}{}",
                    render_progress_bar(*completed, *total, self.bar_width),
                    percent(*completed, *total),
                    marker,
                    subject
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    eta
                ))
            }
            ProgressEvent::Finished {
                status,
                succeeded,
                failed,
                elapsed_secs,
            } => {
                let label = match status {
                    Some(RunStatus::Completed) => style("Completed").green().bold(),
                    Some(RunStatus::Cancelled) => style("Cancelled").yellow().bold(),
                    None => style("Failed").red().bold(),
                };
                Some(format!(
                    "{} {} described, {} failed in {}",
                    label,
                    succeeded,
                    failed,
                    format_duration(*elapsed_secs)
                ))
            }
        }
    }
}

impl Default for ConsoleRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a simple progress bar
pub fn render_progress_bar(completed: usize, total: usize, width: usize) -> String {
    if total == 0 {
        return format!("[{}]", " ".repeat(width));
    }

    let progress = (completed as f32 / total as f32).min(1.0);
    let filled = (progress * width as f32) as usize;
    let empty = width.saturating_sub(filled);

    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

/// Format duration as human-readable string
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_progress_bar() {
        assert_eq!(render_progress_bar(0, 0, 4), "[    ]");
        assert_eq!(render_progress_bar(1, 2, 4), "[██░░]");
        assert_eq!(render_progress_bar(5, 2, 4), "[████]");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(7260), "2h 1m");
    }

    #[test]
    fn test_render_unit_finished() {
        let renderer = ConsoleRenderer::new();
        let line = renderer
            .render(&ProgressEvent::UnitFinished {
                completed: 1,
                total: 4,
                subject: PathBuf::from("/shots/a.png"),
                failed: false,
                eta_secs: Some(125),
            })
            .unwrap();
        assert!(line.contains("25.0%"));
        assert!(line.contains("a.png"));
        assert!(line.contains("ETA: 2m 5s"));
    }

    #[test]
    fn test_render_unit_started_counts_from_one() {
        let renderer = ConsoleRenderer::new();
        let line = renderer
            .render(&ProgressEvent::UnitStarted {
                ordinal: 0,
                total: 3,
                label: "a.png".to_string(),
            })
            .unwrap();
        assert!(line.contains(" 1/3 a.png"));
        assert!(!line.contains("0/3"));
    }

    #[test]
    fn test_render_skips_quiet_states() {
        let renderer = ConsoleRenderer::new();
        assert!(
            renderer
                .render(&ProgressEvent::StateChanged {
                    state: PipelineState::Aggregating
                })
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_drain_ends_when_sender_dropped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(ProgressEvent::StateChanged {
            state: PipelineState::Planning,
        })
        .unwrap();
        drop(tx);
        ConsoleRenderer::new().quiet(true).drain(&mut rx).await;
    }
}
