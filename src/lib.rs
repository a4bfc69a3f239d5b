//! framescribe - Batch Image Captioning
//!
//! Describes every image in a directory with a vision model, either one image
//! at a time or as overlapping windows of consecutive frames.
//!
//! ## Core Features
//!
//! - **Windowed sequences**: fixed-length windows with configurable overlap
//! - **Cost estimation**: token estimate before anything is sent
//! - **Approval gating**: sequential runs wait for an explicit yes
//! - **Cooperative cancellation**: stops between images, keeps finished work
//! - **Export**: JSON or Markdown description files
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use framescribe::{AutoApprove, OracleConfig, PipelineController, RunOptions, create_oracle};
//!
//! let oracle = create_oracle(&OracleConfig::default())?;
//! let controller = PipelineController::new(oracle, Arc::new(AutoApprove), timeout);
//! let handle = controller.start("./frames", options);
//! let result = handle.join().await?;
//! ```
//!
//! ## Modules
//!
//! - [`assets`]: source directory listing
//! - [`planning`]: window planning and cost estimation
//! - [`approval`]: approval gates
//! - [`composite`]: stacked composite images for windows
//! - [`dispatch`]: per-unit oracle dispatch
//! - [`pipeline`]: run controller and progress events
//! - [`oracle`]: vision model clients

pub mod approval;
pub mod assets;
pub mod cli;
pub mod composite;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod export;
pub mod oracle;
pub mod pipeline;
pub mod planning;
pub mod prompts;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader, LastState};

// Error Types
pub use types::error::{ErrorCategory, FrameError, Result};

// Domain
pub use types::{
    AssetSequence, DescriptionRecord, DetailLevel, ImageAsset, RunPlan, RunResult, RunStatus,
    TreatmentMode, UnitOfWork, Window,
};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use approval::{
    ApprovalGate, ApprovalPrompt, ApprovalRequest, AutoApprove, AutoDecline, ChannelApprovalGate,
};
pub use pipeline::{
    PipelineController, PipelineState, ProgressEvent, RunHandle, RunOptions, preview,
};

// =============================================================================
// Oracle Re-exports
// =============================================================================

pub use oracle::{CaptionOracle, CaptionRequest, OracleConfig, SharedOracle, create_oracle};
