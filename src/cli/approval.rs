//! Interactive approval surface for the terminal.
//!
//! Receives prompts from a [`ChannelApprovalGate`](crate::approval::ChannelApprovalGate),
//! prints the plan with every window, and asks for a y/N answer on the
//! controlling terminal.

use console::{Term, style};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use super::ui::Output;
use crate::approval::ApprovalPrompt;

/// Answer prompts until the gate is dropped
pub fn spawn_console_surface(mut prompts: mpsc::Receiver<ApprovalPrompt>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(prompt) = prompts.recv().await {
            let output = Output::new();
            output.plan(&prompt.request.plan);
            output.windows(&prompt.request.windows);

            let answer = tokio::task::spawn_blocking(ask).await;
            match answer {
                Ok(Ok(approved)) => prompt.respond(approved),
                Ok(Err(e)) => {
                    warn!(error = %e, "Cannot read approval answer");
                    prompt.decline();
                }
                Err(e) => {
                    warn!(error = %e, "Approval prompt task failed");
                    prompt.decline();
                }
            }
        }
    })
}

fn ask() -> std::io::Result<bool> {
    let term = Term::stdout();
    term.write_str(&format!(
        "\n{} ",
        style("Proceed with these windows? [y/N]").bold()
    ))?;
    let line = term.read_line()?;
    Ok(is_yes(&line))
}

/// Only an explicit yes approves
fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
