//! Scripted in-process simulation client for tests and dry runs.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use at_types::{metric, FailureReason, RawResult};

use crate::client::{SimulationClient, SimulationRequest};

/// Response function: receives the zero-based call index and the request.
pub type StubResponder =
    dyn Fn(usize, &SimulationRequest) -> Result<RawResult, FailureReason> + Send + Sync;

/// Deterministic stand-in for the simulation service.
///
/// Responses come from a user-supplied function of (call index, request),
/// optionally delayed by an artificial latency. Every request is recorded
/// so tests can assert on what was submitted.
pub struct StubSimulationClient {
    responder: Box<StubResponder>,
    latency: Option<Duration>,
    calls: AtomicUsize,
    requests: Mutex<Vec<SimulationRequest>>,
}

impl StubSimulationClient {
    pub fn new(
        responder: impl Fn(usize, &SimulationRequest) -> Result<RawResult, FailureReason>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            latency: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A client that always succeeds with the given sharpe and fitness.
    pub fn constant(sharpe: f64, fitness: f64) -> Self {
        Self::new(move |_, _| {
            Ok(RawResult::new()
                .with_metric(metric::SHARPE, sharpe)
                .with_metric(metric::FITNESS, fitness))
        })
    }

    /// Delay every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of simulate calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Snapshot of every request received so far.
    pub fn recorded_requests(&self) -> Vec<SimulationRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl SimulationClient for StubSimulationClient {
    async fn simulate(&self, request: SimulationRequest) -> Result<RawResult, FailureReason> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        (self.responder)(call, &request)
    }
}
