//! # at-study
//!
//! Study orchestration for AlphaTune: the simulation-service seam, the
//! concurrent trial executor, objective scoring with overfitting penalties,
//! and the single-writer study controller.

mod client;
mod executor;
mod objective;
mod stub;
mod study;

pub use client::{SimulationClient, SimulationRequest};
pub use executor::{TrialExecutor, TrialOutcome};
pub use objective::{CorrelationPenalty, ObjectiveEvaluator, OverfitSignal, StabilityPenalty};
pub use stub::{StubResponder, StubSimulationClient};
pub use study::{terminal_counts, CancelHandle, StudyController, StudyPhase, StudyReport};
