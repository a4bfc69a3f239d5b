//! Export Sink
//!
//! Writes the ordered records of a run as pretty JSON or a Markdown table,
//! into `descriptions_<timestamp>.<ext>`.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::types::{DescriptionRecord, FrameError, Result, RunResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Markdown,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Markdown => "md",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            _ => Err(format!(
                "Unknown export format: {}. Valid values: json, markdown",
                s
            )),
        }
    }
}

/// One exported row
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    subject: String,
    members: &'a [String],
    description: &'a str,
    failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'a> From<&'a DescriptionRecord> for ExportRow<'a> {
    fn from(record: &'a DescriptionRecord) -> Self {
        Self {
            subject: record.subject.display().to_string(),
            members: &record.members,
            description: &record.description,
            failed: record.is_failed(),
            error: record
                .failure
                .as_ref()
                .map(|f| format!("{}: {}", f.category, f.message)),
        }
    }
}

/// Write `result` into `dir`, returning the file written
pub fn export(result: &RunResult, format: ExportFormat, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("descriptions_{}.{}", timestamp, format.extension()));

    let content = match format {
        ExportFormat::Json => render_json(result)?,
        ExportFormat::Markdown => render_markdown(result),
    };
    fs::write(&path, content)
        .map_err(|e| FrameError::Export(format!("{}: {}", path.display(), e)))?;

    info!(path = %path.display(), records = result.records.len(), "Exported descriptions");
    Ok(path)
}

fn render_json(result: &RunResult) -> Result<String> {
    let rows: Vec<ExportRow<'_>> = result.records.iter().map(ExportRow::from).collect();
    Ok(serde_json::to_string_pretty(&rows)?)
}

fn render_markdown(result: &RunResult) -> String {
    let mut out = String::from("| # | Image | Description |\n|---|-------|-------------|\n");
    for (i, record) in result.records.iter().enumerate() {
        let description = match &record.failure {
            Some(failure) => format!("*failed ({})*", failure.category),
            None => escape_cell(&record.description),
        };
        out.push_str(&format!(
            "| {} | {} | {} |\n",
            i + 1,
            escape_cell(&record.subject.display().to_string()),
            description
        ));
    }
    out
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}
