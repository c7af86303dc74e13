//! Study orchestration: the single-writer control loop that drives the
//! propose → admit → dispatch → score → observe cycle until the trial
//! budget is exhausted or the study is cancelled.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use at_search::{FingerprintTracker, ParameterSpace, ParzenSampler, RandomSampler, Sampler};
use at_types::{
    Configuration, FailedTrialPolicy, FailureReason, Fingerprint, ScoredTrial, StudyConfig,
    StudyError, Trial, TrialStatus,
};

use crate::client::{SimulationClient, SimulationRequest};
use crate::executor::{TrialExecutor, TrialOutcome};
use crate::objective::ObjectiveEvaluator;

/// Lifecycle phase of a study run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudyPhase {
    Idle,
    Running,
    Completed,
    Cancelled,
}

/// Why the control loop stopped issuing new proposals.
#[derive(Debug)]
enum StopReason {
    BudgetReached,
    TimeBudgetExhausted,
    SpaceExhausted,
    Cancelled,
    Fatal(StudyError),
}

/// Handle for cancelling a running study from another task.
#[derive(Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Signal the control loop to stop issuing new proposals and drain
    /// in-flight trials.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Final result surface handed off at termination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyReport {
    pub study_id: Uuid,
    pub study_name: String,
    pub phase: StudyPhase,
    /// Best scored trial, drawn only from successful trials.
    pub best: Option<ScoredTrial>,
    /// Full trial history, in dispatch order.
    pub trials: Vec<Trial>,
    pub completed: usize,
    pub failed: usize,
    pub elapsed: Duration,
    /// Present when the study ended on a fatal condition.
    pub error: Option<String>,
}

/// Bookkeeping owned exclusively by the control loop.
#[derive(Default)]
struct StudyState {
    trials: HashMap<Fingerprint, Trial>,
    fingerprints_by_id: HashMap<Uuid, Fingerprint>,
    retries_left: HashMap<Uuid, usize>,
    dispatched: usize,
    in_flight: usize,
    completed: usize,
    failed: usize,
    consecutive_failures: usize,
    best: Option<ScoredTrial>,
}

/// Orchestrates one search run.
///
/// All mutations to the search state (trial table, tracker, sampler model,
/// running best) happen on the control loop; workers only produce immutable
/// outcomes onto the completion channel.
pub struct StudyController {
    config: StudyConfig,
    space: ParameterSpace,
    sampler: Box<dyn Sampler>,
    fallback: RandomSampler,
    tracker: FingerprintTracker,
    evaluator: ObjectiveEvaluator,
    executor: TrialExecutor,
    completions: mpsc::UnboundedReceiver<TrialOutcome>,
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
    state: StudyState,
    phase: StudyPhase,
    /// Sticky: set once no unseen configuration can be found.
    exhausted: bool,
    draining: bool,
}

impl StudyController {
    /// Build a controller. Validates the configuration up front; nothing is
    /// dispatched until [`run`](Self::run).
    pub fn new(
        config: StudyConfig,
        space: ParameterSpace,
        client: Arc<dyn SimulationClient>,
    ) -> Result<Self, StudyError> {
        config.validate()?;
        if space.is_empty() {
            return Err(StudyError::Config("parameter space is empty".into()));
        }

        let sampler: Box<dyn Sampler> = Box::new(ParzenSampler::new(
            config.sampler_seed,
            config.random_bootstrap_count,
        ));
        // Decorrelate the fallback stream from the sampler's.
        let fallback = RandomSampler::new(config.sampler_seed.map(|s| s.wrapping_add(1)));

        let (executor, completions) =
            TrialExecutor::new(client, config.concurrency_limit, config.trial_timeout);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let evaluator = ObjectiveEvaluator::from_config(&config.objective);

        Ok(Self {
            config,
            space,
            sampler,
            fallback,
            tracker: FingerprintTracker::new(),
            evaluator,
            executor,
            completions,
            cancel_tx: Arc::new(cancel_tx),
            cancel_rx,
            state: StudyState::default(),
            phase: StudyPhase::Idle,
            exhausted: false,
            draining: false,
        })
    }

    /// Swap in a different sampler (e.g. pure random for baselines).
    pub fn with_sampler(mut self, sampler: Box<dyn Sampler>) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: Arc::clone(&self.cancel_tx),
        }
    }

    pub fn phase(&self) -> StudyPhase {
        self.phase
    }

    /// Drive the study to termination and hand back the report.
    pub async fn run(mut self) -> StudyReport {
        let started_at = Instant::now();
        let deadline = self.config.time_budget.map(|d| started_at + d);
        self.phase = StudyPhase::Running;
        info!(
            study = %self.config.study_name,
            region = %self.config.region,
            budget = self.config.trial_budget,
            concurrency = self.config.concurrency_limit,
            sampler = self.sampler.name(),
            "study started"
        );

        let stop = self.control_loop(deadline).await;

        match &stop {
            StopReason::Cancelled => {
                info!(study = %self.config.study_name, "cancellation requested, draining in-flight trials");
                self.drain().await;
                self.phase = StudyPhase::Cancelled;
            }
            StopReason::Fatal(err) => {
                error!(study = %self.config.study_name, error = %err, "study aborted");
                self.drain().await;
                self.phase = StudyPhase::Cancelled;
            }
            StopReason::TimeBudgetExhausted => {
                info!(study = %self.config.study_name, "time budget exhausted, draining in-flight trials");
                self.drain().await;
                self.phase = StudyPhase::Completed;
            }
            StopReason::BudgetReached | StopReason::SpaceExhausted => {
                self.phase = StudyPhase::Completed;
            }
        }

        let error = match stop {
            StopReason::Fatal(err) => Some(err.to_string()),
            _ => None,
        };

        let mut trials: Vec<Trial> = self.state.trials.into_values().collect();
        trials.sort_by_key(|t| t.number);

        info!(
            study = %self.config.study_name,
            phase = ?self.phase,
            completed = self.state.completed,
            failed = self.state.failed,
            best_score = self.state.best.as_ref().map(|b| b.score),
            "study finished"
        );

        StudyReport {
            study_id: self.config.id,
            study_name: self.config.study_name,
            phase: self.phase,
            best: self.state.best,
            trials,
            completed: self.state.completed,
            failed: self.state.failed,
            elapsed: started_at.elapsed(),
            error,
        }
    }

    /// The single-writer loop. Returns the reason new proposals stopped.
    async fn control_loop(&mut self, deadline: Option<Instant>) -> StopReason {
        loop {
            if *self.cancel_rx.borrow() {
                return StopReason::Cancelled;
            }

            self.top_up().await;

            let quota_met = self.state.dispatched >= self.config.trial_budget;
            if (quota_met || self.exhausted) && self.state.in_flight == 0 {
                return if quota_met {
                    StopReason::BudgetReached
                } else {
                    StopReason::SpaceExhausted
                };
            }

            tokio::select! {
                maybe_outcome = self.completions.recv() => {
                    match maybe_outcome {
                        Some(outcome) => {
                            if let Some(fatal) = self.handle_outcome(outcome).await {
                                return StopReason::Fatal(fatal);
                            }
                        }
                        // The executor holds the sender for the study's
                        // lifetime; losing it mid-run is a bug, not a
                        // normal completion.
                        None => {
                            return StopReason::Fatal(StudyError::Internal(
                                "completion channel closed with trials outstanding".into(),
                            ))
                        }
                    }
                }
                _ = self.cancel_rx.changed() => {
                    return StopReason::Cancelled;
                }
                _ = wait_deadline(deadline) => {
                    return StopReason::TimeBudgetExhausted;
                }
            }
        }
    }

    /// Launch new trials while budget and pool room remain.
    async fn top_up(&mut self) {
        while !self.exhausted
            && self.state.dispatched < self.config.trial_budget
            && self.state.in_flight < self.config.concurrency_limit
        {
            match self.propose_unique() {
                Some((config, fp)) => self.launch(config, fp).await,
                None => {
                    warn!(
                        admitted = self.tracker.len(),
                        "no unseen configuration found, finishing early"
                    );
                    self.exhausted = true;
                }
            }
        }
    }

    /// Pull proposals from the sampler until one passes deduplication, up to
    /// the retry bound; then force uniform random fallback proposals to
    /// escape a degenerate sampler. `None` means the space is effectively
    /// exhausted.
    fn propose_unique(&mut self) -> Option<(Configuration, Fingerprint)> {
        if let Some(cardinality) = self.space.cardinality() {
            if self.tracker.len() as u64 >= cardinality {
                return None;
            }
        }

        for _ in 0..=self.config.max_duplicate_retries {
            match self.sampler.propose(&self.space) {
                Ok(config) => {
                    let (fp, admitted) = self.tracker.admit(&config);
                    if admitted {
                        return Some((config, fp));
                    }
                }
                Err(err) => {
                    warn!(error = %err, "discarding out-of-domain proposal");
                }
            }
        }

        warn!(
            retries = self.config.max_duplicate_retries,
            "sampler kept proposing duplicates, forcing random fallback"
        );
        for _ in 0..64 {
            if let Ok(config) = self.fallback.propose(&self.space) {
                let (fp, admitted) = self.tracker.admit(&config);
                if admitted {
                    return Some((config, fp));
                }
            }
        }
        None
    }

    async fn launch(&mut self, config: Configuration, fp: Fingerprint) {
        let mut trial = Trial::new(self.state.dispatched, config, fp.clone());
        trial.mark_running();
        let trial_id = trial.id;
        let request = self.request_for(&trial.configuration);

        self.state.fingerprints_by_id.insert(trial_id, fp.clone());
        self.state
            .retries_left
            .insert(trial_id, self.config.max_trial_retries);
        self.state.trials.insert(fp, trial);
        self.state.dispatched += 1;
        self.state.in_flight += 1;

        self.executor.submit(trial_id, request).await;
    }

    fn request_for(&self, config: &Configuration) -> SimulationRequest {
        SimulationRequest {
            strategy_expression: self.config.strategy_expression.clone(),
            region: self.config.region,
            configuration: config.clone(),
        }
    }

    /// Merge one asynchronous result into the search state. Returns a fatal
    /// error when the service is deemed unreachable.
    async fn handle_outcome(&mut self, outcome: TrialOutcome) -> Option<StudyError> {
        self.state.in_flight = self.state.in_flight.saturating_sub(1);

        let Some(fp) = self.state.fingerprints_by_id.get(&outcome.trial_id).cloned() else {
            warn!(trial_id = %outcome.trial_id, "outcome for unknown trial dropped");
            return None;
        };

        match outcome.outcome {
            Ok(raw) => {
                let scored = self.evaluator.score(&raw);
                match scored {
                    Ok(score) => {
                        let Some(trial) = self.state.trials.get_mut(&fp) else {
                            return None;
                        };
                        trial.mark_completed(raw);
                        let trial_snapshot = trial.clone();
                        self.state.completed += 1;
                        self.state.consecutive_failures = 0;
                        self.sampler.observe(&trial_snapshot.configuration, score);
                        self.update_best(trial_snapshot, score);
                        None
                    }
                    Err(score_err) => {
                        // A result we cannot score is a failed trial, not a crash.
                        self.record_failure(
                            &fp,
                            outcome.trial_id,
                            FailureReason::IncompleteResult(score_err.to_string()),
                        )
                        .await
                    }
                }
            }
            Err(reason) => self.record_failure(&fp, outcome.trial_id, reason).await,
        }
    }

    async fn record_failure(
        &mut self,
        fp: &Fingerprint,
        trial_id: Uuid,
        reason: FailureReason,
    ) -> Option<StudyError> {
        let remaining = self.state.retries_left.get(&trial_id).copied().unwrap_or(0);
        let can_retry =
            !self.draining && reason != FailureReason::Cancelled && remaining > 0;

        if can_retry {
            self.state.retries_left.insert(trial_id, remaining - 1);
            let Some(trial) = self.state.trials.get(fp) else {
                return None;
            };
            warn!(
                trial = trial.number,
                reason = %reason,
                remaining = remaining - 1,
                "trial failed, resubmitting"
            );
            let request = self.request_for(&trial.configuration);
            self.state.in_flight += 1;
            self.executor.submit(trial_id, request).await;
            return None;
        }

        let Some(trial) = self.state.trials.get_mut(fp) else {
            return None;
        };
        warn!(trial = trial.number, reason = %reason, "trial failed");
        trial.mark_failed(reason);
        let config = trial.configuration.clone();
        self.state.failed += 1;
        self.state.consecutive_failures += 1;

        if let FailedTrialPolicy::Penalize { score } = self.config.failed_trial_policy {
            self.sampler.observe(&config, score);
        }

        if self.state.consecutive_failures >= self.config.max_consecutive_failures {
            return Some(StudyError::ServiceUnreachable {
                consecutive_failures: self.state.consecutive_failures,
            });
        }
        None
    }

    /// Running-best update: strict improvement only, so ties keep the
    /// earlier-found trial.
    fn update_best(&mut self, trial: Trial, score: f64) {
        let improved = match &self.state.best {
            None => true,
            Some(best) => score > best.score,
        };
        if improved {
            info!(trial = trial.number, score, "new best trial");
            self.state.best = Some(ScoredTrial { trial, score });
        }
    }

    /// Wait (bounded by the drain timeout) for in-flight trials to finish;
    /// whatever remains is marked cancelled.
    async fn drain(&mut self) {
        self.draining = true;
        let deadline = Instant::now() + self.config.drain_timeout;

        while self.state.in_flight > 0 {
            match tokio::time::timeout_at(deadline, self.completions.recv()).await {
                Ok(Some(outcome)) => {
                    // Fatal conditions no longer matter; we are stopping anyway.
                    let _ = self.handle_outcome(outcome).await;
                }
                Ok(None) | Err(_) => break,
            }
        }

        let mut abandoned = 0;
        for trial in self.state.trials.values_mut() {
            if !trial.is_terminal() {
                trial.mark_failed(FailureReason::Cancelled);
                self.state.failed += 1;
                abandoned += 1;
            }
        }
        self.state.in_flight = 0;
        if abandoned > 0 {
            warn!(abandoned, "trials still outstanding at drain deadline");
        }
    }
}

async fn wait_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Trials in `report` that reached a terminal state, by status.
pub fn terminal_counts(report: &StudyReport) -> (usize, usize) {
    let completed = report
        .trials
        .iter()
        .filter(|t| t.status == TrialStatus::Completed)
        .count();
    let failed = report
        .trials
        .iter()
        .filter(|t| t.status == TrialStatus::Failed)
        .count();
    (completed, failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubSimulationClient;
    use at_types::{metric, RawResult, Region};
    use std::collections::HashSet;

    fn settings_space() -> ParameterSpace {
        ParameterSpace::new()
            .add_categorical("universe", ["TOP3000", "TOP1000", "TOP500"])
            .add_categorical("neutralization", ["INDUSTRY", "MARKET", "SECTOR"])
            .add_int("delay", 0, 1)
            .add_categorical("maxTrade", ["ON", "OFF"])
    }

    fn tiny_space() -> ParameterSpace {
        ParameterSpace::new().add_categorical("universe", ["TOP3000", "TOP1000", "TOP500"])
    }

    fn base_config() -> StudyConfig {
        StudyConfig::new("test_study", "liabilities / assets", Region::Usa).with_seed(42)
    }

    fn success_with_sharpe(sharpe: f64) -> Result<RawResult, FailureReason> {
        Ok(RawResult::new()
            .with_metric(metric::SHARPE, sharpe)
            .with_metric(metric::FITNESS, 1.0))
    }

    #[tokio::test]
    async fn budget_termination_with_exact_trial_count() {
        let config = base_config().with_trial_budget(20);
        let client = Arc::new(StubSimulationClient::constant(1.5, 1.2));
        let controller = StudyController::new(config, settings_space(), client).unwrap();

        let report = controller.run().await;
        assert_eq!(report.phase, StudyPhase::Completed);
        assert_eq!(report.completed, 20);
        assert_eq!(report.failed, 0);
        assert_eq!(report.trials.len(), 20);
        assert!(report.best.is_some());
        assert!(report.error.is_none());
    }

    #[tokio::test]
    async fn admitted_trials_never_share_a_fingerprint() {
        let config = base_config().with_trial_budget(100);
        let client = Arc::new(StubSimulationClient::constant(1.0, 1.0));
        let controller = StudyController::new(config, tiny_space(), client).unwrap();

        let report = controller.run().await;
        // The 3-point space is exhausted long before the budget; once
        // exhausted, the tracker rejects every further repeat and the study
        // completes early.
        assert_eq!(report.phase, StudyPhase::Completed);
        assert_eq!(report.trials.len(), 3);

        let fingerprints: HashSet<_> =
            report.trials.iter().map(|t| t.fingerprint.clone()).collect();
        assert_eq!(fingerprints.len(), 3);
    }

    #[tokio::test]
    async fn best_trial_is_the_running_maximum() {
        let sharpes = [1.0, 3.0, 2.0];
        let client = Arc::new(StubSimulationClient::new(move |call, _| {
            success_with_sharpe(sharpes[call])
        }));
        let config = base_config()
            .with_trial_budget(3)
            .with_concurrency_limit(1);
        let controller = StudyController::new(config, tiny_space(), client).unwrap();

        let report = controller.run().await;
        assert_eq!(report.completed, 3);
        let best = report.best.unwrap();
        assert_eq!(best.score, 3.0);
        assert_eq!(best.trial.number, 1);
    }

    #[tokio::test]
    async fn tied_scores_keep_the_earliest_trial() {
        let client = Arc::new(StubSimulationClient::constant(1.5, 1.2));
        let config = base_config()
            .with_trial_budget(3)
            .with_concurrency_limit(1);
        let controller = StudyController::new(config, tiny_space(), client).unwrap();

        let report = controller.run().await;
        assert_eq!(report.completed, 3);
        assert_eq!(report.best.unwrap().trial.number, 0);
    }

    #[tokio::test]
    async fn failures_are_isolated_and_budget_fully_accounted() {
        // Every 3rd call fails; the study must still reach Completed with
        // the whole budget accounted for and the best drawn from successes.
        let client = Arc::new(StubSimulationClient::new(|call, _| {
            if call % 3 == 2 {
                Err(FailureReason::Transient("stub outage".into()))
            } else {
                success_with_sharpe(1.0 + call as f64 * 0.01)
            }
        }));
        let config = base_config()
            .with_trial_budget(12)
            .with_concurrency_limit(1);
        let controller = StudyController::new(config, settings_space(), client).unwrap();

        let report = controller.run().await;
        assert_eq!(report.phase, StudyPhase::Completed);
        assert_eq!(report.completed + report.failed, 12);
        assert_eq!(report.failed, 4);

        let (completed, failed) = terminal_counts(&report);
        assert_eq!(completed, report.completed);
        assert_eq!(failed, report.failed);

        let best = report.best.unwrap();
        assert_eq!(best.trial.status, TrialStatus::Completed);
    }

    #[tokio::test]
    async fn consecutive_failures_abort_the_study() {
        let client = Arc::new(StubSimulationClient::new(|_, _| {
            Err::<RawResult, _>(FailureReason::Transient("connection refused".into()))
        }));
        let config = base_config().with_trial_budget(100);
        let controller = StudyController::new(config, settings_space(), client).unwrap();

        let report = controller.run().await;
        assert_eq!(report.phase, StudyPhase::Cancelled);
        assert!(report.error.as_deref().unwrap().contains("unreachable"));
        assert_eq!(report.completed, 0);
        assert!(report.failed >= 10);
        assert!(report.best.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_drains_and_marks_outstanding_trials() {
        let client = Arc::new(
            StubSimulationClient::constant(1.0, 1.0).with_latency(Duration::from_secs(3600)),
        );
        let config = base_config()
            .with_trial_budget(8)
            .with_concurrency_limit(4);
        let controller = StudyController::new(config, settings_space(), client).unwrap();
        let handle = controller.cancel_handle();

        let study = tokio::spawn(controller.run());
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();

        let report = study.await.unwrap();
        assert_eq!(report.phase, StudyPhase::Cancelled);
        assert_eq!(report.completed, 0);
        assert_eq!(report.failed, 4);
        assert!(report
            .trials
            .iter()
            .all(|t| t.failure == Some(FailureReason::Cancelled)));
        assert!(report.best.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn time_budget_completes_the_study() {
        let client = Arc::new(
            StubSimulationClient::constant(1.2, 1.0).with_latency(Duration::from_secs(60)),
        );
        let config = base_config()
            .with_trial_budget(100)
            .with_concurrency_limit(2)
            .with_time_budget(Duration::from_secs(150));
        let controller = StudyController::new(config, settings_space(), client).unwrap();

        let report = controller.run().await;
        assert_eq!(report.phase, StudyPhase::Completed);
        // Two batches of two fit inside the time budget.
        assert!(report.completed >= 2);
        assert!(report.completed < 100);
        assert!(report.best.is_some());
    }

    #[tokio::test]
    async fn failed_trial_is_retried_up_to_the_bound() {
        let client = Arc::new(StubSimulationClient::new(|call, _| {
            if call < 2 {
                Err(FailureReason::Transient("warming up".into()))
            } else {
                success_with_sharpe(1.0)
            }
        }));
        let mut config = base_config()
            .with_trial_budget(1)
            .with_concurrency_limit(1);
        config.max_trial_retries = 2;
        let service: Arc<dyn SimulationClient> = client.clone();
        let controller = StudyController::new(config, tiny_space(), service).unwrap();

        let report = controller.run().await;
        assert_eq!(report.completed, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn incomplete_result_becomes_a_failed_trial() {
        // Result arrives but lacks the fitness metric the evaluator needs.
        let client = Arc::new(StubSimulationClient::new(|_, _| {
            Ok(RawResult::new().with_metric(metric::SHARPE, 2.0))
        }));
        let mut config = base_config()
            .with_trial_budget(3)
            .with_concurrency_limit(1);
        config.max_consecutive_failures = 100;
        let controller = StudyController::new(config, tiny_space(), client).unwrap();

        let report = controller.run().await;
        assert_eq!(report.phase, StudyPhase::Completed);
        assert_eq!(report.failed, 3);
        assert!(report.trials.iter().all(|t| matches!(
            t.failure,
            Some(FailureReason::IncompleteResult(_))
        )));
        assert!(report.best.is_none());
    }

    #[tokio::test]
    async fn closed_completion_channel_is_an_internal_error() {
        let client = Arc::new(StubSimulationClient::constant(1.0, 1.0));
        let mut controller =
            StudyController::new(base_config(), tiny_space(), client).unwrap();

        // Swap in a completion channel whose sender is already gone while a
        // trial is nominally outstanding.
        let (tx, rx) = mpsc::unbounded_channel();
        drop(tx);
        controller.completions = rx;
        controller.state.dispatched = controller.config.trial_budget;
        controller.state.in_flight = 1;

        let stop = controller.control_loop(None).await;
        assert!(matches!(
            stop,
            StopReason::Fatal(StudyError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn rejects_empty_parameter_space() {
        let client = Arc::new(StubSimulationClient::constant(1.0, 1.0));
        let result = StudyController::new(base_config(), ParameterSpace::new(), client);
        assert!(matches!(result, Err(StudyError::Config(_))));
    }

    #[tokio::test]
    async fn rejects_invalid_study_config() {
        let client = Arc::new(StubSimulationClient::constant(1.0, 1.0));
        let config = base_config().with_trial_budget(0);
        assert!(StudyController::new(config, settings_space(), client).is_err());
    }

    #[tokio::test]
    async fn request_carries_expression_and_region() {
        let client = Arc::new(StubSimulationClient::constant(1.0, 1.0));
        let config = base_config().with_trial_budget(2);
        let service: Arc<dyn SimulationClient> = client.clone();
        let controller = StudyController::new(config, tiny_space(), service).unwrap();
        controller.run().await;

        let requests = client.recorded_requests();
        assert!(!requests.is_empty());
        assert!(requests
            .iter()
            .all(|r| r.strategy_expression == "liabilities / assets" && r.region == Region::Usa));
    }
}

