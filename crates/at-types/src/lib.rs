//! # at-types
//!
//! Core types and data structures for AlphaTune: configurations and their
//! fingerprints, trial lifecycle tracking, raw simulation results, the study
//! configuration surface, and the error taxonomy shared across the workspace.

pub mod config;
pub mod errors;
pub mod trial;

pub use config::{BaseMetric, FailedTrialPolicy, ObjectiveConfig, Region, StudyConfig};
pub use errors::{DomainError, ScoreError, StudyError};
pub use trial::{
    metric, CheckOutcome, CheckResult, Configuration, FailureReason, Fingerprint, ParamValue,
    RawResult, ScoredTrial, Trial, TrialStatus,
};
