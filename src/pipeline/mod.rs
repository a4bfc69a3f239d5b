//! Pipeline Controller
//!
//! Sequences one captioning run: list assets, plan units of work, estimate
//! cost, optionally wait for approval, dispatch units one by one, aggregate.
//!
//! ## Delivery
//!
//! [`PipelineController::start`] spawns the run on its own task and returns a
//! [`RunHandle`]: progress arrives on `events`, the terminal result through
//! [`RunHandle::join`]. Fatal errors (missing source, invalid stride) are
//! returned as `Err`; a declined or cancelled run is an `Ok` result with
//! status `Cancelled`.
//!
//! ## Cancellation
//!
//! Cooperative. The token is checked before each unit; an in-flight oracle
//! call runs to completion and its record is kept. Cancelling while waiting
//! for approval resolves the run immediately with no dispatch.

pub mod progress;
pub mod state;

pub use progress::{ProgressEvent, ProgressReporter, ProgressState, percent};
pub use state::PipelineState;

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::approval::{ApprovalRequest, SharedGate};
use crate::assets::AssetLister;
use crate::composite::CompositeBuilder;
use crate::constants::planning::DEFAULT_COMPOSITE_DIR;
use crate::dispatch::DescriptionDispatcher;
use crate::oracle::SharedOracle;
use crate::planning::{CostEstimator, WindowPlanner};
use crate::types::{
    AssetSequence, DetailLevel, FrameError, Result, RunPlan, RunResult, RunStatus, TreatmentMode,
    UnitOfWork,
};

/// Per-run parameters
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: TreatmentMode,
    pub detail: DetailLevel,
    /// Requested window length; clamped to at least 1
    pub sequence_length: usize,
    /// Requested overlap; clamped to at most `sequence_length - 1`
    pub overlap: usize,
    pub prompt: String,
}

/// Handle to a running pipeline
pub struct RunHandle {
    pub events: mpsc::UnboundedReceiver<ProgressEvent>,
    cancel: CancellationToken,
    handle: JoinHandle<Result<RunResult>>,
}

impl RunHandle {
    /// Request cooperative cancellation
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this run, e.g. for a Ctrl-C handler
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the terminal result
    pub async fn join(self) -> Result<RunResult> {
        self.handle
            .await
            .map_err(|e| FrameError::Pipeline(format!("run task failed: {}", e)))?
    }
}

pub struct PipelineController {
    oracle: SharedOracle,
    gate: SharedGate,
    composite_dir: Option<PathBuf>,
    timeout: Duration,
}

impl PipelineController {
    pub fn new(oracle: SharedOracle, gate: SharedGate, timeout: Duration) -> Self {
        Self {
            oracle,
            gate,
            composite_dir: None,
            timeout,
        }
    }

    /// Directory for composite artifacts. Defaults to `<source>/composites`.
    pub fn with_composite_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.composite_dir = Some(dir.into());
        self
    }

    /// Spawn a run over `source`
    pub fn start(&self, source: impl Into<PathBuf>, options: RunOptions) -> RunHandle {
        let source = source.into();
        let (reporter, events) = ProgressReporter::channel();
        let cancel = CancellationToken::new();

        let composite_dir = self
            .composite_dir
            .clone()
            .unwrap_or_else(|| source.join(DEFAULT_COMPOSITE_DIR));

        let run = Run {
            dispatcher: DescriptionDispatcher::new(
                self.oracle.clone(),
                CompositeBuilder::new(composite_dir),
                options.prompt.clone(),
                options.detail,
                self.timeout,
            ),
            oracle: self.oracle.clone(),
            gate: self.gate.clone(),
            lister: AssetLister::new(),
            reporter,
            cancel: cancel.clone(),
        };

        let handle = tokio::spawn(async move {
            let result = run.execute(&source, options).await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "Run failed");
                run.reporter.transition(PipelineState::Failed);
                run.reporter.finish(None);
            }
            result
        });

        RunHandle {
            events,
            cancel,
            handle,
        }
    }
}

/// List and plan `source` without dispatching or asking for approval
pub fn preview(source: &Path, options: &RunOptions) -> Result<(RunPlan, Vec<UnitOfWork>)> {
    let assets = AssetLister::new().list(source)?;
    let (plan, units) = plan_units(&assets, options)?;
    let estimated_cost = estimator(&plan).estimate(&assets);
    Ok((
        RunPlan {
            estimated_cost,
            ..plan
        },
        units,
    ))
}

/// Everything one spawned run owns
struct Run {
    dispatcher: DescriptionDispatcher,
    oracle: SharedOracle,
    gate: SharedGate,
    lister: AssetLister,
    reporter: ProgressReporter,
    cancel: CancellationToken,
}

impl Run {
    #[instrument(name = "run", skip_all, fields(source = %source.display(), mode = %options.mode))]
    async fn execute(&self, source: &Path, options: RunOptions) -> Result<RunResult> {
        self.reporter.transition(PipelineState::Listing);
        let assets = self.lister.list(source)?;

        self.reporter.transition(PipelineState::Planning);
        let (plan, units) = plan_units(&assets, &options)?;

        if options.mode == TreatmentMode::Sequential {
            self.reporter.transition(PipelineState::Estimating);
        }
        let estimator = estimator(&plan);
        let listed = assets.clone();
        let estimated_cost = tokio::task::spawn_blocking(move || estimator.estimate(&listed))
            .await
            .map_err(|e| FrameError::Pipeline(format!("cost estimate failed: {}", e)))?;
        let plan = RunPlan {
            estimated_cost,
            ..plan
        };
        self.reporter.plan_ready(&plan);

        info!(
            oracle = self.oracle.name(),
            model = self.oracle.model(),
            max_tokens = self.oracle.max_tokens(),
            prompt = %options.prompt,
            detail = %plan.detail,
            units = plan.unit_count,
            estimated_cost = plan.estimated_cost,
            "Querying oracle with run parameters"
        );

        if options.mode == TreatmentMode::Sequential {
            self.reporter.transition(PipelineState::AwaitingApproval);
            let windows: Vec<_> = units
                .iter()
                .filter_map(|unit| match unit {
                    UnitOfWork::Window(window) => Some(window.clone()),
                    UnitOfWork::Single { .. } => None,
                })
                .collect();
            let request = ApprovalRequest::new(plan.clone(), &windows);

            let approved = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("Run cancelled while awaiting approval");
                    false
                }
                approved = self.gate.confirm(request) => approved,
            };

            if !approved {
                info!("Plan not approved, nothing dispatched");
                self.reporter.transition(PipelineState::Cancelled);
                self.reporter.finish(Some(RunStatus::Cancelled));
                return Ok(RunResult::cancelled(Some(plan)));
            }
        }

        self.reporter.transition(PipelineState::Dispatching);
        let mut records = Vec::with_capacity(units.len());
        let mut cancelled = false;
        for unit in &units {
            if self.cancel.is_cancelled() {
                info!(
                    completed = records.len(),
                    total = units.len(),
                    "Run cancelled, stopping dispatch"
                );
                cancelled = true;
                break;
            }
            self.reporter.unit_started(unit.ordinal(), &unit.label());
            let record = self.dispatcher.dispatch(unit).await;
            self.reporter.unit_finished(&record);
            records.push(record);
        }

        self.reporter.transition(PipelineState::Aggregating);
        let status = if cancelled {
            RunStatus::Cancelled
        } else {
            RunStatus::Completed
        };
        let result = RunResult {
            status,
            plan: Some(plan),
            records,
        };

        info!(
            status = %status,
            succeeded = result.succeeded(),
            failed = result.failed(),
            "Run finished"
        );
        self.reporter.transition(match status {
            RunStatus::Completed => PipelineState::Completed,
            RunStatus::Cancelled => PipelineState::Cancelled,
        });
        self.reporter.finish(Some(status));

        Ok(result)
    }
}

/// Units of work and a plan without cost for `assets`
fn plan_units(assets: &AssetSequence, options: &RunOptions) -> Result<(RunPlan, Vec<UnitOfWork>)> {
    let (units, sequence_length, overlap) = match options.mode {
        TreatmentMode::Independent => {
            let units = assets
                .iter()
                .enumerate()
                .map(|(index, asset)| UnitOfWork::Single {
                    index,
                    asset: asset.clone(),
                })
                .collect::<Vec<_>>();
            (units, 1, 0)
        }
        TreatmentMode::Sequential => {
            let planner = WindowPlanner::clamped(options.sequence_length, options.overlap);
            let units = planner
                .plan(assets)?
                .into_iter()
                .map(UnitOfWork::Window)
                .collect::<Vec<_>>();
            (units, planner.sequence_length(), planner.overlap())
        }
    };

    let plan = RunPlan {
        mode: options.mode,
        detail: options.detail,
        sequence_length,
        overlap,
        asset_count: assets.len(),
        unit_count: units.len(),
        estimated_cost: 0,
    };
    Ok((plan, units))
}

fn estimator(plan: &RunPlan) -> CostEstimator {
    CostEstimator::new(plan.mode, plan.detail).with_window(plan.sequence_length, plan.overlap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::{ApprovalGate, AutoApprove, AutoDecline, ChannelApprovalGate};
    use crate::oracle::scripted::{Reply, ScriptedOracle};
    use crate::types::ErrorCategory;
    use async_trait::async_trait;
    use image::{Rgb, RgbImage};
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingGate {
        approve: bool,
        calls: AtomicUsize,
    }

    impl CountingGate {
        fn new(approve: bool) -> Arc<Self> {
            Arc::new(Self {
                approve,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ApprovalGate for CountingGate {
        async fn confirm(&self, _request: ApprovalRequest) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.approve
        }
    }

    fn source_with(names: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (i, name) in names.iter().enumerate() {
            // Encoding follows the extension
            RgbImage::from_pixel(4, 2 + i as u32, Rgb([i as u8 * 40, 0, 0]))
                .save(dir.path().join(name))
                .unwrap();
        }
        dir
    }

    fn options(mode: TreatmentMode, sequence_length: usize, overlap: usize) -> RunOptions {
        RunOptions {
            mode,
            detail: DetailLevel::Low,
            sequence_length,
            overlap,
            prompt: "Describe.".to_string(),
        }
    }

    fn controller(oracle: Arc<ScriptedOracle>, gate: SharedGate, dir: &Path) -> PipelineController {
        PipelineController::new(oracle, gate, Duration::from_secs(5))
            .with_composite_dir(dir.join("out"))
    }

    async fn drain(handle: &mut RunHandle) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Some(event) = handle.events.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_independent_low_three_images() {
        let dir = source_with(&["a.png", "b.png", "c.png"]);
        let oracle = Arc::new(ScriptedOracle::numbered());
        let gate = CountingGate::new(true);

        let handle = controller(oracle.clone(), gate.clone(), dir.path())
            .start(dir.path(), options(TreatmentMode::Independent, 3, 1));
        let result = handle.join().await.unwrap();

        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.records.len(), 3);
        assert_eq!(result.plan.as_ref().unwrap().estimated_cost, 255);
        assert_eq!(gate.calls(), 0);
        assert_eq!(oracle.calls(), 3);
    }

    #[tokio::test]
    async fn test_independent_low_three_jpegs() {
        let dir = source_with(&["a.jpg", "b.jpg", "c.jpg"]);
        let oracle = Arc::new(ScriptedOracle::numbered());
        let gate = CountingGate::new(true);

        let result = controller(oracle.clone(), gate.clone(), dir.path())
            .start(dir.path(), options(TreatmentMode::Independent, 3, 1))
            .join()
            .await
            .unwrap();

        assert_eq!(result.status, RunStatus::Completed);
        let members: Vec<_> = result.records.iter().map(|r| r.members[0].clone()).collect();
        assert_eq!(members, vec!["a.jpg", "b.jpg", "c.jpg"]);
        assert!(result.records.iter().all(|r| !r.is_failed()));
        assert_eq!(result.plan.unwrap().estimated_cost, 255);
        assert_eq!(gate.calls(), 0);
        assert!(
            oracle.requests()[0].images[0]
                .data_url
                .starts_with("data:image/jpeg;base64,")
        );
    }

    #[tokio::test]
    async fn test_records_follow_listing_order() {
        let dir = source_with(&["c.png", "a.png", "b.png"]);
        let oracle = Arc::new(ScriptedOracle::numbered());

        let result = controller(oracle, Arc::new(AutoApprove), dir.path())
            .start(dir.path(), options(TreatmentMode::Independent, 1, 0))
            .join()
            .await
            .unwrap();

        let members: Vec<_> = result.records.iter().map(|r| r.members[0].clone()).collect();
        assert_eq!(members, vec!["a.png", "b.png", "c.png"]);
        let texts: Vec<_> = result.records.iter().map(|r| r.description.clone()).collect();
        assert_eq!(texts, vec!["caption 0", "caption 1", "caption 2"]);
    }

    #[tokio::test]
    async fn test_single_failure_is_isolated() {
        let dir = source_with(&["a.png", "b.png", "c.png"]);
        let oracle = Arc::new(ScriptedOracle::new(vec![
            Reply::Text("first".into()),
            Reply::Fail(ErrorCategory::Transient),
            Reply::Text("third".into()),
        ]));

        let result = controller(oracle, Arc::new(AutoApprove), dir.path())
            .start(dir.path(), options(TreatmentMode::Independent, 1, 0))
            .join()
            .await
            .unwrap();

        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.records.len(), 3);
        assert!(result.records[1].is_failed());
        assert!(result.records[1].description.is_empty());
        assert_eq!(result.records[2].description, "third");
    }

    #[tokio::test]
    async fn test_sequential_windows() {
        let dir = source_with(&["1.png", "2.png", "3.png", "4.png", "5.png"]);
        let oracle = Arc::new(ScriptedOracle::numbered());
        let gate = CountingGate::new(true);

        let result = controller(oracle.clone(), gate.clone(), dir.path())
            .start(dir.path(), options(TreatmentMode::Sequential, 3, 1))
            .join()
            .await
            .unwrap();

        assert_eq!(gate.calls(), 1);
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].members, vec!["1.png", "2.png", "3.png"]);
        assert_eq!(result.records[1].members, vec!["3.png", "4.png", "5.png"]);
        assert!(result.records[0].subject.starts_with(dir.path().join("out")));

        let plan = result.plan.unwrap();
        assert_eq!(plan.unit_count, 2);
        assert_eq!(plan.estimated_cost, 2 * 85 * 3);
        assert_eq!(oracle.requests()[1].images.len(), 3);
    }

    #[tokio::test]
    async fn test_full_overlap_is_clamped() {
        let dir = source_with(&["1.png", "2.png", "3.png", "4.png"]);
        let oracle = Arc::new(ScriptedOracle::numbered());

        let result = controller(oracle, Arc::new(AutoApprove), dir.path())
            .start(dir.path(), options(TreatmentMode::Sequential, 2, 2))
            .join()
            .await
            .unwrap();

        let plan = result.plan.unwrap();
        assert_eq!(plan.overlap, 1);
        assert_eq!(plan.stride(), 1);
        assert_eq!(result.records.len(), 3);
    }

    #[tokio::test]
    async fn test_decline_makes_no_oracle_calls() {
        let dir = source_with(&["1.png", "2.png", "3.png"]);
        let oracle = Arc::new(ScriptedOracle::numbered());

        let result = controller(oracle.clone(), Arc::new(AutoDecline), dir.path())
            .start(dir.path(), options(TreatmentMode::Sequential, 2, 1))
            .join()
            .await
            .unwrap();

        assert_eq!(result.status, RunStatus::Cancelled);
        assert!(result.is_empty());
        assert!(result.plan.is_some());
        assert_eq!(oracle.calls(), 0);
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_empty_sequential_still_asks() {
        let dir = TempDir::new().unwrap();
        let oracle = Arc::new(ScriptedOracle::numbered());
        let gate = CountingGate::new(true);

        let result = controller(oracle, gate.clone(), dir.path())
            .start(dir.path(), options(TreatmentMode::Sequential, 3, 1))
            .join()
            .await
            .unwrap();

        assert_eq!(gate.calls(), 1);
        assert_eq!(result.status, RunStatus::Completed);
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let oracle = Arc::new(ScriptedOracle::numbered());

        let mut handle = controller(oracle, Arc::new(AutoApprove), dir.path()).start(
            dir.path().join("missing"),
            options(TreatmentMode::Independent, 1, 0),
        );
        let events = drain(&mut handle).await;
        let err = handle.join().await.unwrap_err();

        assert!(matches!(err, FrameError::SourceUnavailable { .. }));
        assert!(events.iter().any(|e| matches!(
            e,
            ProgressEvent::StateChanged {
                state: PipelineState::Failed
            }
        )));
        assert!(matches!(
            events.last(),
            Some(ProgressEvent::Finished { status: None, .. })
        ));
    }

    #[tokio::test]
    async fn test_cancel_before_dispatch() {
        let dir = source_with(&["a.png", "b.png"]);
        let oracle = Arc::new(ScriptedOracle::numbered());

        let handle = controller(oracle.clone(), Arc::new(AutoApprove), dir.path())
            .start(dir.path(), options(TreatmentMode::Independent, 1, 0));
        handle.cancel();
        let result = handle.join().await.unwrap();

        assert_eq!(result.status, RunStatus::Cancelled);
        assert!(result.is_empty());
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn test_cancel_keeps_in_flight_record() {
        let dir = source_with(&["a.png", "b.png", "c.png"]);
        let oracle = Arc::new(ScriptedOracle::new(vec![Reply::Slow(
            Duration::from_millis(100),
            "slow".into(),
        )]));

        let mut handle = controller(oracle.clone(), Arc::new(AutoApprove), dir.path())
            .start(dir.path(), options(TreatmentMode::Independent, 1, 0));

        while let Some(event) = handle.events.recv().await {
            if matches!(event, ProgressEvent::UnitStarted { ordinal: 0, .. }) {
                handle.cancel();
                break;
            }
        }
        let result = handle.join().await.unwrap();

        assert_eq!(result.status, RunStatus::Cancelled);
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].description, "slow");
        assert_eq!(oracle.calls(), 1);
    }

    #[tokio::test]
    async fn test_cancel_while_awaiting_approval() {
        let dir = source_with(&["a.png", "b.png"]);
        let oracle = Arc::new(ScriptedOracle::numbered());
        let (gate, mut surface) = ChannelApprovalGate::new();

        let handle = controller(oracle.clone(), Arc::new(gate), dir.path())
            .start(dir.path(), options(TreatmentMode::Sequential, 2, 0));

        let prompt = surface.recv().await.unwrap();
        assert_eq!(prompt.request.windows.len(), 1);
        handle.cancel();
        let result = handle.join().await.unwrap();
        drop(prompt);

        assert_eq!(result.status, RunStatus::Cancelled);
        assert!(result.is_empty());
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn test_progress_events_in_order() {
        let dir = source_with(&["a.png", "b.png"]);
        let oracle = Arc::new(ScriptedOracle::numbered());

        let mut handle = controller(oracle, Arc::new(AutoApprove), dir.path())
            .start(dir.path(), options(TreatmentMode::Independent, 1, 0));
        let events = drain(&mut handle).await;
        handle.join().await.unwrap();

        let states: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::StateChanged { state } => Some(*state),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![
                PipelineState::Listing,
                PipelineState::Planning,
                PipelineState::Dispatching,
                PipelineState::Aggregating,
                PipelineState::Completed,
            ]
        );

        let completed: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::UnitFinished {
                    completed, total, ..
                } => Some((*completed, *total)),
                _ => None,
            })
            .collect();
        assert_eq!(completed, vec![(1, 2), (2, 2)]);
    }

    #[test]
    fn test_preview_plans_without_dispatch() {
        let dir = source_with(&["1.png", "2.png", "3.png", "4.png", "5.png"]);

        let (plan, units) = preview(dir.path(), &options(TreatmentMode::Sequential, 3, 1)).unwrap();

        assert_eq!(units.len(), 2);
        assert_eq!(plan.estimated_cost, 510);
        assert!(!dir.path().join("composites").exists());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_records_follow_sorted_listing(
            created in Just(vec!["e.png", "b.jpg", "d.png", "a.jpg", "c.png"]).prop_shuffle(),
            sequential in any::<bool>(),
        ) {
            let dir = source_with(&created);
            let mut sorted: Vec<String> = created.iter().map(|n| n.to_string()).collect();
            sorted.sort();

            let mode = if sequential {
                TreatmentMode::Sequential
            } else {
                TreatmentMode::Independent
            };
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let result = rt
                .block_on(async {
                    controller(
                        Arc::new(ScriptedOracle::numbered()),
                        Arc::new(AutoApprove),
                        dir.path(),
                    )
                    .start(dir.path(), options(mode, 2, 1))
                    .join()
                    .await
                })
                .unwrap();

            let expected: Vec<Vec<String>> = match mode {
                TreatmentMode::Independent => sorted.iter().map(|n| vec![n.clone()]).collect(),
                TreatmentMode::Sequential => sorted.windows(2).map(<[String]>::to_vec).collect(),
            };
            let members: Vec<Vec<String>> =
                result.records.iter().map(|r| r.members.clone()).collect();
            prop_assert_eq!(result.status, RunStatus::Completed);
            prop_assert_eq!(members, expected);
        }
    }
}
