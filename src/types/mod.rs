pub mod asset;
pub mod error;
pub mod run;

pub use asset::{AssetSequence, ImageAsset, Window};
pub use error::{ErrorCategory, ErrorClassifier, FrameError, OracleError, Result};
pub use run::{
    DescriptionRecord, DetailLevel, FailureStage, RunPlan, RunResult, RunStatus, TreatmentMode,
    UnitFailure, UnitOfWork,
};
