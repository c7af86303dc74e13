//! # at-search
//!
//! Search space definitions, configuration fingerprinting, and sampling
//! strategies for AlphaTune.
//!
//! Provides the tunable-dimension declarations ([`ParameterSpace`]), the
//! atomic visited-set ([`FingerprintTracker`]), and the proposal generators
//! ([`RandomSampler`], [`ParzenSampler`]).

mod fingerprint;
mod sampler;
mod space;

pub use fingerprint::{fingerprint_of, FingerprintTracker};
pub use sampler::{ParzenSampler, RandomSampler, Sampler};
pub use space::{Domain, ParameterDef, ParameterSpace};
