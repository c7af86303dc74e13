use thiserror::Error;

/// Umbrella error for a study run.
#[derive(Error, Debug)]
pub enum StudyError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Score error: {0}")]
    Score(#[from] ScoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Simulation service unreachable after {consecutive_failures} consecutive failures")]
    ServiceUnreachable { consecutive_failures: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// A proposed or decoded configuration violates the parameter space.
///
/// Fatal to that proposal only, never to the study: the controller discards
/// the configuration and requests a replacement.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Unknown parameter: {name}")]
    UnknownParameter { name: String },

    #[error("Unknown choice for {name}: {value}")]
    UnknownChoice { name: String, value: String },

    #[error("Value for {name} out of range: {value} not in [{low}, {high}]")]
    OutOfRange {
        name: String,
        value: String,
        low: String,
        high: String,
    },

    #[error("Configuration is missing parameter: {name}")]
    MissingParameter { name: String },

    #[error("Encoded vector has wrong length: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Value for {name} has wrong type: expected {expected}")]
    TypeMismatch { name: String, expected: String },
}

/// A completed simulation result cannot be scored.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoreError {
    #[error("Required metric missing from simulation result: {name}")]
    MissingMetric { name: String },

    #[error("Metric {name} is not finite: {value}")]
    NonFiniteMetric { name: String, value: f64 },
}
