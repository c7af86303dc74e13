//! Objective evaluation: raw simulation metrics to a single fitness scalar.
//!
//! The evaluator computes a primary performance metric and subtracts a
//! weighted overfitting penalty. Higher is better. The penalty's functional
//! form is a pluggable strategy ([`OverfitSignal`]); the shipped forms are a
//! hinge above a self-correlation cutoff and a shortfall below a sub-period
//! stability floor.

use at_types::{metric, BaseMetric, ObjectiveConfig, RawResult, ScoreError};

/// One overfitting signal. `penalty` returns a non-negative deduction,
/// strictly increasing in the underlying signal wherever it is active, and
/// zero when the signal's metric is absent.
pub trait OverfitSignal: Send + Sync {
    fn name(&self) -> &str;
    fn penalty(&self, raw: &RawResult) -> f64;
}

/// Penalizes correlation to previously accepted strategies above a cutoff.
pub struct CorrelationPenalty {
    pub cutoff: f64,
}

impl OverfitSignal for CorrelationPenalty {
    fn name(&self) -> &str {
        "self_correlation"
    }

    fn penalty(&self, raw: &RawResult) -> f64 {
        match raw.metric(metric::SELF_CORRELATION) {
            Some(corr) if corr > self.cutoff => {
                let span = (1.0 - self.cutoff).max(f64::EPSILON);
                (corr - self.cutoff) / span
            }
            _ => 0.0,
        }
    }
}

/// Penalizes unstable performance across sub-periods: the shortfall of the
/// worst sub-period ratio below the configured floor.
pub struct StabilityPenalty {
    pub min_ratio: f64,
}

impl OverfitSignal for StabilityPenalty {
    fn name(&self) -> &str {
        "subperiod_stability"
    }

    fn penalty(&self, raw: &RawResult) -> f64 {
        match raw.metric(metric::SUBPERIOD_MIN_RATIO) {
            Some(ratio) if ratio < self.min_ratio => self.min_ratio - ratio,
            _ => 0.0,
        }
    }
}

/// Converts a [`RawResult`] into the scalar fitness the sampler and the
/// best-trial comparison use.
pub struct ObjectiveEvaluator {
    base: BaseMetric,
    penalty_weight: f64,
    signals: Vec<Box<dyn OverfitSignal>>,
}

impl ObjectiveEvaluator {
    pub fn from_config(config: &ObjectiveConfig) -> Self {
        Self {
            base: config.base_metric,
            penalty_weight: config.overfitting_penalty_weight,
            signals: vec![
                Box::new(CorrelationPenalty {
                    cutoff: config.correlation_cutoff,
                }),
                Box::new(StabilityPenalty {
                    min_ratio: config.min_subperiod_stability,
                }),
            ],
        }
    }

    /// Replace the shipped penalty strategies.
    pub fn with_signals(mut self, signals: Vec<Box<dyn OverfitSignal>>) -> Self {
        self.signals = signals;
        self
    }

    /// Score a raw result. Fails if a required metric is absent or the
    /// computation degenerates; the returned score is always finite.
    pub fn score(&self, raw: &RawResult) -> Result<f64, ScoreError> {
        let base = match self.base {
            BaseMetric::SharpeFitness => {
                let sharpe = require(raw, metric::SHARPE)?;
                let fitness = require(raw, metric::FITNESS)?;
                sharpe * fitness
            }
            BaseMetric::NetCalmar { cost_bps } => {
                let returns = require(raw, metric::RETURNS)?;
                let turnover = require(raw, metric::TURNOVER)?;
                let drawdown = require(raw, metric::DRAWDOWN)?;
                // 252 trading days; cost quoted in basis points per unit turnover.
                (returns - turnover * 252.0 * cost_bps / 10_000.0) / drawdown
            }
        };
        if !base.is_finite() {
            return Err(ScoreError::NonFiniteMetric {
                name: "base_metric".into(),
                value: base,
            });
        }

        let penalty: f64 = self.signals.iter().map(|s| s.penalty(raw)).sum();
        let score = base - self.penalty_weight * penalty;
        if !score.is_finite() {
            return Err(ScoreError::NonFiniteMetric {
                name: "score".into(),
                value: score,
            });
        }
        Ok(score)
    }
}

fn require(raw: &RawResult, name: &str) -> Result<f64, ScoreError> {
    let value = raw
        .metric(name)
        .ok_or_else(|| ScoreError::MissingMetric { name: name.into() })?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ScoreError::NonFiniteMetric {
            name: name.into(),
            value,
        })
    }
}
