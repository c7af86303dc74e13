//! Configurations, fingerprints, and trial lifecycle tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// A concrete value assigned to one tunable parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    Int(i64),
    Float(f64),
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

/// One candidate assignment of values to all tunable parameters.
///
/// Backed by a `BTreeMap` so iteration order (and therefore the canonical
/// JSON encoding) is independent of construction order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Configuration(BTreeMap<String, ParamValue>);

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion. Configurations are treated as immutable once
    /// fingerprinted or submitted.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical JSON encoding: sorted keys, normalized value representation.
    /// This is the fingerprint pre-image.
    pub fn canonical_json(&self) -> String {
        // BTreeMap serialization is already key-sorted.
        serde_json::to_string(&self.0).unwrap_or_default()
    }
}

/// Deterministic digest identifying a [`Configuration`] for deduplication.
///
/// Two configurations with identical semantic values yield identical
/// fingerprints regardless of construction order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub String);

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Well-known metric names in a [`RawResult`].
pub mod metric {
    pub const SHARPE: &str = "sharpe";
    pub const FITNESS: &str = "fitness";
    pub const RETURNS: &str = "returns";
    pub const DRAWDOWN: &str = "drawdown";
    pub const TURNOVER: &str = "turnover";
    /// Correlation to previously accepted strategies (overfitting signal).
    pub const SELF_CORRELATION: &str = "self_correlation";
    /// Worst sub-period performance as a fraction of the full-period figure.
    pub const SUBPERIOD_MIN_RATIO: &str = "subperiod_min_ratio";
}

/// Outcome of a single server-side validation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckResult {
    Pass,
    Fail,
    Warning,
}

/// A named server-side validation check attached to a simulation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub name: String,
    pub result: CheckResult,
}

/// Raw metrics returned by the simulation service.
///
/// Opaque to the sampler; consumed by the objective evaluator. Metrics are
/// keyed by the names in [`metric`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawResult {
    /// Server-assigned simulation id, when the service reports one.
    pub simulation_id: Option<String>,
    pub metrics: HashMap<String, f64>,
    pub checks: Vec<CheckOutcome>,
}

impl RawResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metric(mut self, name: &str, value: f64) -> Self {
        self.metrics.insert(name.to_string(), value);
        self
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    /// Names of checks that failed server-side.
    pub fn failed_checks(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|c| c.result == CheckResult::Fail)
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// Why a trial failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FailureReason {
    /// The simulation exceeded the per-trial deadline.
    Timeout,
    /// The service rejected the configuration.
    ServiceRejected(String),
    /// A transient service or transport error.
    Transient(String),
    /// The result arrived but lacked metrics the evaluator needs.
    IncompleteResult(String),
    /// The study was cancelled before the trial finished.
    Cancelled,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::ServiceRejected(msg) => write!(f, "rejected by service: {msg}"),
            Self::Transient(msg) => write!(f, "transient error: {msg}"),
            Self::IncompleteResult(msg) => write!(f, "incomplete result: {msg}"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Lifecycle state of a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// One attempted evaluation of a [`Configuration`] against the simulation
/// service. Terminal states are sticky: once completed or failed, later
/// transitions are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub id: Uuid,
    pub number: usize,
    pub configuration: Configuration,
    pub fingerprint: Fingerprint,
    pub status: TrialStatus,
    pub result: Option<RawResult>,
    pub failure: Option<FailureReason>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Trial {
    pub fn new(number: usize, configuration: Configuration, fingerprint: Fingerprint) -> Self {
        Self {
            id: Uuid::new_v4(),
            number,
            configuration,
            fingerprint,
            status: TrialStatus::Pending,
            result: None,
            failure: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, TrialStatus::Completed | TrialStatus::Failed)
    }

    pub fn mark_running(&mut self) {
        if self.is_terminal() {
            return;
        }
        self.status = TrialStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_completed(&mut self, result: RawResult) {
        if self.is_terminal() {
            return;
        }
        self.status = TrialStatus::Completed;
        self.finished_at = Some(Utc::now());
        self.result = Some(result);
    }

    pub fn mark_failed(&mut self, reason: FailureReason) {
        if self.is_terminal() {
            return;
        }
        self.status = TrialStatus::Failed;
        self.finished_at = Some(Utc::now());
        self.failure = Some(reason);
    }
}

/// A completed trial plus its scalar fitness score. Higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTrial {
    pub trial: Trial,
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_json_is_order_independent() {
        let a = Configuration::new()
            .with("universe", "TOP3000")
            .with("delay", 1i64)
            .with("neutralization", "INDUSTRY");
        let b = Configuration::new()
            .with("neutralization", "INDUSTRY")
            .with("universe", "TOP3000")
            .with("delay", 1i64);
        assert_eq!(a.canonical_json(), b.canonical_json());
    }

    #[test]
    fn canonical_json_distinguishes_values() {
        let a = Configuration::new().with("delay", 0i64);
        let b = Configuration::new().with("delay", 1i64);
        assert_ne!(a.canonical_json(), b.canonical_json());
    }

    #[test]
    fn trial_lifecycle() {
        let config = Configuration::new().with("maxTrade", "ON");
        let mut trial = Trial::new(0, config, Fingerprint("abc".into()));
        assert_eq!(trial.status, TrialStatus::Pending);

        trial.mark_running();
        assert_eq!(trial.status, TrialStatus::Running);
        assert!(trial.started_at.is_some());

        let raw = RawResult::new().with_metric(metric::SHARPE, 1.4);
        trial.mark_completed(raw);
        assert_eq!(trial.status, TrialStatus::Completed);
        assert!(trial.finished_at.is_some());
    }

    #[test]
    fn terminal_states_are_sticky() {
        let mut trial = Trial::new(0, Configuration::new(), Fingerprint("x".into()));
        trial.mark_failed(FailureReason::Timeout);
        assert_eq!(trial.status, TrialStatus::Failed);

        trial.mark_completed(RawResult::new());
        assert_eq!(trial.status, TrialStatus::Failed);
        assert!(trial.result.is_none());
        assert_eq!(trial.failure, Some(FailureReason::Timeout));
    }

    #[test]
    fn raw_result_failed_checks() {
        let mut raw = RawResult::new();
        raw.checks.push(CheckOutcome {
            name: "LOW_SHARPE".into(),
            result: CheckResult::Fail,
        });
        raw.checks.push(CheckOutcome {
            name: "CONCENTRATED_WEIGHT".into(),
            result: CheckResult::Pass,
        });
        assert_eq!(raw.failed_checks(), vec!["LOW_SHARPE"]);
    }

    #[test]
    fn trial_serialization_round_trip() {
        let config = Configuration::new().with("universe", "TOP500").with("delay", 1i64);
        let trial = Trial::new(3, config, Fingerprint("deadbeef".into()));
        let json = serde_json::to_string(&trial).unwrap();
        let back: Trial = serde_json::from_str(&json).unwrap();
        assert_eq!(trial, back);
    }
}
