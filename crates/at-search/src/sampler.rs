//! Proposal generators: seeded random search and a TPE-style Parzen sampler.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use at_types::{Configuration, DomainError};

use crate::space::{Domain, ParameterSpace};

/// Common trait for proposal generators.
///
/// Implementations must be deterministic given a fixed seed and a fixed
/// observation history, and their model state must depend only on the
/// multiset of observations, never on arrival order.
pub trait Sampler: Send {
    /// Propose the next configuration to evaluate.
    fn propose(&mut self, space: &ParameterSpace) -> Result<Configuration, DomainError>;

    /// Report a completed (configuration, score) pair. Higher scores are
    /// better.
    fn observe(&mut self, config: &Configuration, score: f64);

    /// Human-readable sampler name.
    fn name(&self) -> &str;
}

/// Draw one uniform configuration from the space.
fn sample_uniform(space: &ParameterSpace, rng: &mut StdRng) -> Vec<f64> {
    space
        .dimensions
        .iter()
        .map(|dim| match &dim.domain {
            Domain::Categorical { choices } => rng.random_range(0..choices.len()) as f64,
            Domain::Int { low, high } => rng.random_range(*low..=*high) as f64,
            Domain::Float { low, high } => rng.random_range(*low..=*high),
        })
        .collect()
}

// ---- Random search ----

/// Independent uniform sampling. Also serves as the bootstrap and
/// duplicate-escape fallback for the model-guided sampler.
#[derive(Debug)]
pub struct RandomSampler {
    rng: StdRng,
}

impl RandomSampler {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        Self { rng }
    }
}

impl Sampler for RandomSampler {
    fn propose(&mut self, space: &ParameterSpace) -> Result<Configuration, DomainError> {
        let vector = sample_uniform(space, &mut self.rng);
        space.decode(&vector)
    }

    fn observe(&mut self, _config: &Configuration, _score: f64) {}

    fn name(&self) -> &str {
        "random"
    }
}

// ---- Parzen (TPE-style) sampler ----

/// Sequential model-based sampler in the TPE family.
///
/// Completed observations are split at the `gamma` quantile into good and
/// bad groups (maximization: good = top fraction). Each dimension is
/// modelled independently: smoothed counts for categorical dimensions,
/// boxcar Parzen windows for numeric ones. Candidates are drawn from the
/// good model and the one maximizing the good/bad log-density ratio wins.
///
/// The first `bootstrap` proposals are uniform to build initial model data.
/// Runs of identical proposals are capped: after `max_consecutive` repeats
/// of the same configuration the next draw is forced uniform, so a sharply
/// peaked model cannot pin the study to one point.
pub struct ParzenSampler {
    gamma: f64,
    bootstrap: usize,
    n_candidates: usize,
    max_consecutive: usize,
    observations: Vec<(Configuration, f64)>,
    last_key: Option<String>,
    streak: usize,
    rng: StdRng,
}

impl ParzenSampler {
    pub fn new(seed: Option<u64>, bootstrap: usize) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        Self {
            gamma: 0.25,
            bootstrap,
            n_candidates: 24,
            max_consecutive: 4,
            observations: Vec::new(),
            last_key: None,
            streak: 0,
            rng,
        }
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        assert!(gamma > 0.0 && gamma < 1.0, "gamma must be in (0, 1)");
        self.gamma = gamma;
        self
    }

    pub fn with_candidates(mut self, n: usize) -> Self {
        self.n_candidates = n.max(1);
        self
    }

    /// Longest run of identical proposals tolerated before a uniform draw
    /// is forced.
    pub fn with_max_consecutive(mut self, n: usize) -> Self {
        self.max_consecutive = n.max(1);
        self
    }

    pub fn observation_count(&self) -> usize {
        self.observations.len()
    }

    /// Encode the history against `space` and split it into (good, bad)
    /// column matrices. Observations that no longer fit the space are
    /// skipped. The history is re-sorted deterministically first, so the
    /// split depends only on the multiset of observations.
    fn split_history(&self, space: &ParameterSpace) -> Option<(Vec<Vec<f64>>, Vec<Vec<f64>>)> {
        let mut encoded: Vec<(Vec<f64>, f64, String)> = self
            .observations
            .iter()
            .filter_map(|(config, score)| {
                space
                    .encode(config)
                    .ok()
                    .map(|v| (v, *score, config.canonical_json()))
            })
            .collect();
        if encoded.len() < 2 {
            return None;
        }

        encoded.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.2.cmp(&b.2))
        });

        let n_good = ((encoded.len() as f64 * self.gamma).ceil() as usize)
            .max(1)
            .min(encoded.len() - 1);

        let good = encoded[..n_good].iter().map(|(v, _, _)| v.clone()).collect();
        let bad = encoded[n_good..].iter().map(|(v, _, _)| v.clone()).collect();
        Some((good, bad))
    }

    /// Sample one candidate value for dimension `d` from the good group.
    fn sample_dim(&mut self, domain: &Domain, good: &[Vec<f64>], d: usize) -> f64 {
        let idx = self.rng.random_range(0..good.len());
        let center = good[idx][d];
        match domain {
            Domain::Categorical { .. } => center,
            Domain::Int { low, high } => {
                let bw = bandwidth(*low as f64, *high as f64, good.len());
                let v = self.rng.random_range(center - bw..=center + bw).round();
                v.clamp(*low as f64, *high as f64)
            }
            Domain::Float { low, high } => {
                let bw = bandwidth(*low, *high, good.len());
                let v = self.rng.random_range(center - bw..=center + bw);
                v.clamp(*low, *high)
            }
        }
    }

    /// Log of the density of `value` in dimension `d` under `group`.
    fn log_density(domain: &Domain, group: &[Vec<f64>], d: usize, value: f64) -> f64 {
        match domain {
            Domain::Categorical { choices } => {
                let hits = group.iter().filter(|v| v[d] == value).count();
                // Add-one smoothing keeps unseen levels reachable.
                let p = (hits as f64 + 1.0) / (group.len() as f64 + choices.len() as f64);
                p.ln()
            }
            Domain::Int { .. } | Domain::Float { .. } => {
                let (low, high) = numeric_bounds(domain);
                let bw = bandwidth(low, high, group.len());
                let hits = group.iter().filter(|v| (v[d] - value).abs() <= bw).count();
                // Boxcar mixture with a uniform floor over the range.
                let range = (high - low).max(f64::MIN_POSITIVE);
                let density = hits as f64 / (group.len() as f64 * 2.0 * bw) + 0.5 / range;
                density.ln()
            }
        }
    }
}

fn numeric_bounds(domain: &Domain) -> (f64, f64) {
    match domain {
        Domain::Int { low, high } => (*low as f64, *high as f64),
        Domain::Float { low, high } => (*low, *high),
        Domain::Categorical { choices } => (0.0, choices.len().saturating_sub(1) as f64),
    }
}

/// Parzen window half-width: shrinks as the group grows.
fn bandwidth(low: f64, high: f64, n: usize) -> f64 {
    let range = (high - low).max(f64::MIN_POSITIVE);
    range / (1.0 + (n as f64).sqrt())
}

impl ParzenSampler {
    /// Best-of-`n_candidates` draw from the good model, ranked by the
    /// good/bad log-density ratio.
    fn model_vector(&mut self, space: &ParameterSpace, good: &[Vec<f64>], bad: &[Vec<f64>]) -> Vec<f64> {
        let dims: Vec<Domain> = space.dimensions.iter().map(|p| p.domain.clone()).collect();
        let mut best: Option<(Vec<f64>, f64)> = None;

        for _ in 0..self.n_candidates {
            let candidate: Vec<f64> = dims
                .iter()
                .enumerate()
                .map(|(d, domain)| self.sample_dim(domain, good, d))
                .collect();

            let ratio: f64 = dims
                .iter()
                .enumerate()
                .map(|(d, domain)| {
                    Self::log_density(domain, good, d, candidate[d])
                        - Self::log_density(domain, bad, d, candidate[d])
                })
                .sum();

            match &best {
                Some((_, best_ratio)) if ratio <= *best_ratio => {}
                _ => best = Some((candidate, ratio)),
            }
        }

        match best {
            Some((vector, ratio)) => {
                tracing::debug!(
                    observations = self.observations.len(),
                    log_ratio = ratio,
                    "model-guided proposal"
                );
                vector
            }
            None => sample_uniform(space, &mut self.rng),
        }
    }

    /// Cap runs of identical proposals. Once `proposal` has been emitted
    /// `max_consecutive` times in a row, draw uniformly until a different
    /// configuration turns up (bounded tries; a one-point space keeps the
    /// repeat).
    fn break_repeat_run(
        &mut self,
        space: &ParameterSpace,
        proposal: Configuration,
    ) -> Result<Configuration, DomainError> {
        let mut config = proposal;
        let mut key = config.canonical_json();

        if self.streak >= self.max_consecutive && self.last_key.as_deref() == Some(key.as_str()) {
            tracing::debug!(streak = self.streak, "proposal run capped, forcing uniform draw");
            for _ in 0..8 {
                let candidate = space.decode(&sample_uniform(space, &mut self.rng))?;
                let candidate_key = candidate.canonical_json();
                if candidate_key != key {
                    config = candidate;
                    key = candidate_key;
                    break;
                }
            }
        }

        if self.last_key.as_deref() == Some(key.as_str()) {
            self.streak += 1;
        } else {
            self.last_key = Some(key);
            self.streak = 1;
        }
        Ok(config)
    }
}

impl Sampler for ParzenSampler {
    fn propose(&mut self, space: &ParameterSpace) -> Result<Configuration, DomainError> {
        let vector = if self.observations.len() < self.bootstrap {
            sample_uniform(space, &mut self.rng)
        } else {
            match self.split_history(space) {
                Some((good, bad)) => self.model_vector(space, &good, &bad),
                None => sample_uniform(space, &mut self.rng),
            }
        };
        let proposal = space.decode(&vector)?;
        self.break_repeat_run(space, proposal)
    }

    fn observe(&mut self, config: &Configuration, score: f64) {
        self.observations.push((config.clone(), score));
    }

    fn name(&self) -> &str {
        "parzen"
    }
}
