//! Describe Command
//!
//! Runs the full pipeline over a source directory and exports the result.
//!
//! Usage:
//!   framescribe describe [SOURCE] --prompt "Describe the scene."
//!   framescribe describe --mode sequential --sequence-length 4 --overlap 1 --prompt-name scene
//!   framescribe describe --yes --format markdown --output ./captions

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::RunOverrides;
use crate::approval::{AutoApprove, ChannelApprovalGate, SharedGate};
use crate::cli::approval::spawn_console_surface;
use crate::cli::progress::ConsoleRenderer;
use crate::cli::ui::Output;
use crate::config::{ConfigLoader, LastState};
use crate::export::{ExportFormat, export};
use crate::oracle::create_oracle;
use crate::pipeline::PipelineController;
use crate::types::{Result, RunStatus};

/// Describe command options
#[derive(Debug, Clone, Default)]
pub struct DescribeOptions {
    pub run: RunOverrides,
    /// Skip the approval prompt for sequential runs
    pub yes: bool,
    pub format: Option<ExportFormat>,
    /// Export directory override
    pub output: Option<PathBuf>,
    pub quiet: bool,
}

pub fn run(options: DescribeOptions) -> Result<()> {
    let rt = Runtime::new()?;
    let outcome = rt.block_on(run_async(options));
    // A pending terminal read must not keep the process alive
    rt.shutdown_timeout(Duration::from_millis(100));
    outcome
}

async fn run_async(options: DescribeOptions) -> Result<()> {
    let output = Output::quiet(options.quiet);
    let config = ConfigLoader::load()?;

    let source = options.run.resolve_source()?;
    let prompt = options.run.resolve_prompt(&config)?;
    let run_options = options.run.run_options(&config, prompt);

    let oracle = create_oracle(&config.oracle)?;

    let (gate, surface): (SharedGate, _) = if options.yes {
        (Arc::new(AutoApprove), None)
    } else {
        let (gate, prompts) = ChannelApprovalGate::new();
        (Arc::new(gate), Some(spawn_console_surface(prompts)))
    };

    let mut controller = PipelineController::new(oracle, gate, config.oracle.timeout());
    if let Some(dir) = &config.pipeline.composite_dir {
        controller = controller.with_composite_dir(dir);
    }

    output.header(&format!("Describing {}", source.display()));
    let mut handle = controller.start(&source, run_options);

    let cancel = handle.cancel_token();
    let interrupt = tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, cancel).await {
            eprintln!("Interrupted again, exiting without waiting for the current image");
            std::process::exit(130);
        }
    });

    // Ends once the run task drops its reporter
    ConsoleRenderer::new()
        .quiet(options.quiet)
        .drain(&mut handle.events)
        .await;

    let joined = handle.join().await;
    interrupt.abort();
    if let Some(surface) = surface {
        surface.abort();
    }
    let result = joined?;

    if let Err(e) = ConfigLoader::save_state(&LastState {
        last_source: Some(source.clone()),
    }) {
        warn!(error = %e, "Could not remember source directory");
    }

    output.summary(&result);

    if result.status == RunStatus::Cancelled && result.is_empty() {
        output.info("Nothing was described; no export written");
        return Ok(());
    }

    let format = options.format.unwrap_or(config.export.format);
    let dir = options
        .output
        .unwrap_or_else(|| config.export.output_dir.clone());
    let path = export(&result, format, &dir)?;
    info!(path = %path.display(), %format, "Exported descriptions");
    output.success(&format!("Saved {}", path.display()));

    Ok(())
}

/// Cancel the run on the first interrupt. Returns `true` when a second
/// interrupt arrives, `false` if the signal source goes away first.
async fn watch_interrupts<F, Fut>(mut next_signal: F, cancel: CancellationToken) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    let mut interrupts = 0;
    while next_signal().await.is_ok() {
        interrupts += 1;
        if interrupts > 1 {
            return true;
        }
        warn!("Interrupted, finishing the current image before stopping (Ctrl-C again to quit)");
        cancel.cancel();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Signal source that fires `count` times and then closes
    fn signals(count: usize) -> impl FnMut() -> std::future::Ready<std::io::Result<()>> {
        let mut left = count;
        move || {
            let result = if left > 0 {
                left -= 1;
                Ok(())
            } else {
                Err(std::io::Error::other("signal stream closed"))
            };
            std::future::ready(result)
        }
    }

    #[tokio::test]
    async fn test_first_interrupt_cancels() {
        let token = CancellationToken::new();
        let forced = watch_interrupts(signals(1), token.clone()).await;

        assert!(!forced);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_second_interrupt_forces_exit() {
        let token = CancellationToken::new();
        assert!(watch_interrupts(signals(2), token.clone()).await);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_no_interrupt_leaves_run_alone() {
        let token = CancellationToken::new();
        assert!(!watch_interrupts(signals(0), token.clone()).await);
        assert!(!token.is_cancelled());
    }
}
