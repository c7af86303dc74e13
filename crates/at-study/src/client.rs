//! Capability seam for the external simulation service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use at_types::{Configuration, FailureReason, RawResult, Region};

/// One fully specified simulation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    /// The analyst-supplied strategy expression.
    pub strategy_expression: String,
    pub region: Region,
    /// The candidate settings under evaluation.
    pub configuration: Configuration,
}

/// The simulation service interface.
///
/// Implementations may talk to a real simulation API or run scripted
/// responses locally (see [`crate::stub::StubSimulationClient`]). The core
/// depends only on this request/response contract, never on transport
/// details.
#[async_trait]
pub trait SimulationClient: Send + Sync {
    /// Submit a configuration and await its performance metrics.
    ///
    /// Service-side problems (rejected configuration, transient error) come
    /// back as a [`FailureReason`], not a panic: a single failed simulation
    /// is never fatal to the study.
    async fn simulate(&self, request: SimulationRequest) -> Result<RawResult, FailureReason>;
}
