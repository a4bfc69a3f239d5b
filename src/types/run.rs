//! Run-level types: modes, detail levels, units of work, plans and results.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::asset::{ImageAsset, Window};
use super::error::{ErrorCategory, FrameError};

// =============================================================================
// Treatment Mode & Detail Level
// =============================================================================

/// How assets are grouped into units of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TreatmentMode {
    /// Every image is described on its own
    #[default]
    Independent,
    /// Overlapping windows of images are described together
    Sequential,
}

impl fmt::Display for TreatmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreatmentMode::Independent => write!(f, "independent"),
            TreatmentMode::Sequential => write!(f, "sequential"),
        }
    }
}

impl std::str::FromStr for TreatmentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "independent" => Ok(TreatmentMode::Independent),
            "sequential" => Ok(TreatmentMode::Sequential),
            _ => Err(format!(
                "Unknown treatment mode: {}. Valid values: independent, sequential",
                s
            )),
        }
    }
}

/// Resolution hint sent to the oracle and used by the cost estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    #[default]
    Low,
    High,
    Auto,
}

impl DetailLevel {
    /// Value of the `detail` field in an image content part
    pub fn as_api_str(&self) -> &'static str {
        match self {
            DetailLevel::Low => "low",
            DetailLevel::High => "high",
            DetailLevel::Auto => "auto",
        }
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_str())
    }
}

impl std::str::FromStr for DetailLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(DetailLevel::Low),
            "high" => Ok(DetailLevel::High),
            "auto" => Ok(DetailLevel::Auto),
            _ => Err(format!(
                "Unknown detail level: {}. Valid values: low, high, auto",
                s
            )),
        }
    }
}

// =============================================================================
// Unit of Work
// =============================================================================

/// Granularity of one oracle dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOfWork {
    Single { index: usize, asset: ImageAsset },
    Window(Window),
}

impl UnitOfWork {
    pub fn assets(&self) -> &[ImageAsset] {
        match self {
            UnitOfWork::Single { asset, .. } => std::slice::from_ref(asset),
            UnitOfWork::Window(window) => &window.assets,
        }
    }

    /// Position of this unit in dispatch order
    pub fn ordinal(&self) -> usize {
        match self {
            UnitOfWork::Single { index, .. } => *index,
            UnitOfWork::Window(window) => window.index,
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.assets().iter().map(|a| a.name().to_string()).collect()
    }

    /// Short label for logs and progress output
    pub fn label(&self) -> String {
        match self {
            UnitOfWork::Single { asset, .. } => asset.name().to_string(),
            UnitOfWork::Window(window) => match (window.assets.first(), window.assets.last()) {
                (Some(first), Some(last)) if window.len() > 1 => {
                    format!("window {} ({}..{})", window.index + 1, first, last)
                }
                (Some(first), _) => format!("window {} ({})", window.index + 1, first),
                _ => format!("window {}", window.index + 1),
            },
        }
    }
}

// =============================================================================
// Description Record
// =============================================================================

/// Stage at which a unit of work failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Composition,
    Dispatch,
}

/// Why a unit produced no description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFailure {
    pub stage: FailureStage,
    pub category: ErrorCategory,
    pub message: String,
}

impl UnitFailure {
    pub fn from_error(stage: FailureStage, err: &FrameError) -> Self {
        Self {
            stage,
            category: err.category(),
            message: err.to_string(),
        }
    }
}

/// Outcome of one dispatch, immutable once created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionRecord {
    /// Image path, or composite artifact path for windows
    pub subject: PathBuf,
    /// File names of the images that were described
    pub members: Vec<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<UnitFailure>,
}

impl DescriptionRecord {
    pub fn succeeded(subject: impl Into<PathBuf>, members: Vec<String>, text: String) -> Self {
        Self {
            subject: subject.into(),
            members,
            description: text,
            failure: None,
        }
    }

    pub fn failed(subject: impl Into<PathBuf>, members: Vec<String>, failure: UnitFailure) -> Self {
        Self {
            subject: subject.into(),
            members,
            description: String::new(),
            failure: Some(failure),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

// =============================================================================
// Run Plan & Result
// =============================================================================

/// Parameters fixed before dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunPlan {
    pub mode: TreatmentMode,
    pub detail: DetailLevel,
    /// Effective window length after clamping
    pub sequence_length: usize,
    /// Effective overlap after clamping
    pub overlap: usize,
    pub asset_count: usize,
    pub unit_count: usize,
    pub estimated_cost: u64,
}

impl RunPlan {
    pub fn stride(&self) -> usize {
        self.sequence_length - self.overlap
    }
}

/// Terminal status of a run that produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Cancelled,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Aggregated output of one run, records in dispatch order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub status: RunStatus,
    pub plan: Option<RunPlan>,
    pub records: Vec<DescriptionRecord>,
}

impl RunResult {
    pub fn cancelled(plan: Option<RunPlan>) -> Self {
        Self {
            status: RunStatus::Cancelled,
            plan,
            records: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.records.iter().filter(|r| !r.is_failed()).count()
    }

    pub fn failed(&self) -> usize {
        self.records.iter().filter(|r| r.is_failed()).count()
    }
}
