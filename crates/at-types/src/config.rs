//! Study configuration surface.
//!
//! The full set of knobs consumed at study start. Everything is explicit and
//! validated up front; unknown or malformed options are rejected before any
//! trial is dispatched.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::errors::StudyError;

/// Target market region for the strategy simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Region {
    Usa,
    Europe,
    Asia,
    China,
    Global,
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Usa => write!(f, "USA"),
            Self::Europe => write!(f, "EUR"),
            Self::Asia => write!(f, "ASI"),
            Self::China => write!(f, "CHN"),
            Self::Global => write!(f, "GLB"),
        }
    }
}

/// Primary performance metric the objective evaluator computes before the
/// overfitting penalty is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BaseMetric {
    /// `sharpe * fitness`.
    SharpeFitness,
    /// `(returns - turnover * 252 * cost) / drawdown` with cost in basis
    /// points of notional per unit turnover.
    NetCalmar { cost_bps: f64 },
}

impl Default for BaseMetric {
    fn default() -> Self {
        Self::SharpeFitness
    }
}

/// Knobs for the overfitting penalty term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveConfig {
    /// Scales the total penalty subtracted from the base metric.
    pub overfitting_penalty_weight: f64,
    /// Self-correlation level above which the correlation penalty activates.
    pub correlation_cutoff: f64,
    /// Minimum acceptable sub-period performance-consistency ratio.
    pub min_subperiod_stability: f64,
    pub base_metric: BaseMetric,
}

impl Default for ObjectiveConfig {
    fn default() -> Self {
        Self {
            overfitting_penalty_weight: 0.5,
            correlation_cutoff: 0.7,
            min_subperiod_stability: 0.6,
            base_metric: BaseMetric::default(),
        }
    }
}

/// What to do with a failed trial's slot in the search history.
///
/// Either way the failure counts toward the trial budget and never enters
/// best-selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FailedTrialPolicy {
    /// Feed the sampler a fixed (finite, strongly negative) score so the
    /// model learns to avoid the region.
    Penalize { score: f64 },
    /// Do not feed the sampler anything for the failed configuration.
    Exclude,
}

impl Default for FailedTrialPolicy {
    fn default() -> Self {
        Self::Penalize { score: -1.0e6 }
    }
}

/// Top-level configuration for one search run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyConfig {
    pub id: Uuid,
    pub study_name: String,

    /// The analyst-supplied strategy expression to simulate.
    pub strategy_expression: String,
    pub region: Region,

    /// Number of trials (completed + failed) before the study terminates.
    pub trial_budget: usize,

    /// Maximum concurrent in-flight simulations.
    pub concurrency_limit: usize,

    /// Seed for the sampler. `None` seeds from the OS.
    pub sampler_seed: Option<u64>,

    /// Uniform-random proposals before the model-guided phase begins.
    pub random_bootstrap_count: usize,

    /// Re-proposals tolerated when the sampler emits duplicates, before a
    /// uniform random fallback is forced.
    pub max_duplicate_retries: usize,

    /// Per-trial simulation deadline.
    pub trial_timeout: Duration,

    /// Wall-clock budget for the whole study. `None` = unlimited.
    pub time_budget: Option<Duration>,

    /// Resubmissions of a failed configuration before the failure is
    /// recorded. 0 = never retry.
    pub max_trial_retries: usize,

    /// Consecutive trial failures before the service is declared
    /// unreachable and the study cancels itself.
    pub max_consecutive_failures: usize,

    pub failed_trial_policy: FailedTrialPolicy,

    /// How long cancellation waits for in-flight trials to finish.
    pub drain_timeout: Duration,

    pub objective: ObjectiveConfig,
}

impl StudyConfig {
    pub fn new(study_name: impl Into<String>, strategy_expression: impl Into<String>, region: Region) -> Self {
        Self {
            id: Uuid::new_v4(),
            study_name: study_name.into(),
            strategy_expression: strategy_expression.into(),
            region,
            trial_budget: 100,
            concurrency_limit: 4,
            sampler_seed: None,
            random_bootstrap_count: 10,
            max_duplicate_retries: 8,
            trial_timeout: Duration::from_secs(300),
            time_budget: None,
            max_trial_retries: 0,
            max_consecutive_failures: 10,
            failed_trial_policy: FailedTrialPolicy::default(),
            drain_timeout: Duration::from_secs(30),
            objective: ObjectiveConfig::default(),
        }
    }

    pub fn with_trial_budget(mut self, n: usize) -> Self {
        self.trial_budget = n;
        self
    }

    pub fn with_concurrency_limit(mut self, n: usize) -> Self {
        self.concurrency_limit = n;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.sampler_seed = Some(seed);
        self
    }

    pub fn with_random_bootstrap_count(mut self, n: usize) -> Self {
        self.random_bootstrap_count = n;
        self
    }

    pub fn with_trial_timeout(mut self, timeout: Duration) -> Self {
        self.trial_timeout = timeout;
        self
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    pub fn with_objective(mut self, objective: ObjectiveConfig) -> Self {
        self.objective = objective;
        self
    }

    pub fn with_failed_trial_policy(mut self, policy: FailedTrialPolicy) -> Self {
        self.failed_trial_policy = policy;
        self
    }

    /// Validate the whole surface before any trial is dispatched.
    pub fn validate(&self) -> Result<(), StudyError> {
        if self.strategy_expression.trim().is_empty() {
            return Err(StudyError::Config("strategy_expression is empty".into()));
        }
        if self.trial_budget == 0 {
            return Err(StudyError::Config("trial_budget must be at least 1".into()));
        }
        if !(1..=16).contains(&self.concurrency_limit) {
            return Err(StudyError::Config(format!(
                "concurrency_limit must be in 1..=16, got {}",
                self.concurrency_limit
            )));
        }
        if self.trial_timeout.is_zero() {
            return Err(StudyError::Config("trial_timeout must be positive".into()));
        }
        if self.max_consecutive_failures == 0 {
            return Err(StudyError::Config(
                "max_consecutive_failures must be at least 1".into(),
            ));
        }
        if self.objective.overfitting_penalty_weight < 0.0
            || !self.objective.overfitting_penalty_weight.is_finite()
        {
            return Err(StudyError::Config(format!(
                "overfitting_penalty_weight must be finite and non-negative, got {}",
                self.objective.overfitting_penalty_weight
            )));
        }
        if !(0.0..=1.0).contains(&self.objective.correlation_cutoff) {
            return Err(StudyError::Config(format!(
                "correlation_cutoff must be in [0, 1], got {}",
                self.objective.correlation_cutoff
            )));
        }
        if let FailedTrialPolicy::Penalize { score } = self.failed_trial_policy {
            if !score.is_finite() {
                return Err(StudyError::Config(
                    "failed-trial penalty score must be finite".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> StudyConfig {
        StudyConfig::new("lev", "liabilities / assets", Region::Usa)
    }

    #[test]
    fn defaults_are_valid() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn builder_chain() {
        let config = base_config()
            .with_trial_budget(20)
            .with_concurrency_limit(8)
            .with_seed(42)
            .with_time_budget(Duration::from_secs(3600));
        assert_eq!(config.trial_budget, 20);
        assert_eq!(config.concurrency_limit, 8);
        assert_eq!(config.sampler_seed, Some(42));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_empty_expression() {
        let mut config = base_config();
        config.strategy_expression = "  ".into();
        assert!(matches!(config.validate(), Err(StudyError::Config(_))));
    }

    #[test]
    fn rejects_zero_budget() {
        let config = base_config().with_trial_budget(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_excessive_concurrency() {
        let config = base_config().with_concurrency_limit(64);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_negative_penalty_weight() {
        let mut config = base_config();
        config.objective.overfitting_penalty_weight = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_finite_failure_score() {
        let config = base_config().with_failed_trial_policy(FailedTrialPolicy::Penalize {
            score: f64::NEG_INFINITY,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn region_display_codes() {
        assert_eq!(Region::Usa.to_string(), "USA");
        assert_eq!(Region::Global.to_string(), "GLB");
    }
}
