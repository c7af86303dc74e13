//! Concurrent trial dispatch with a bounded worker pool.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use at_types::{FailureReason, RawResult};

use crate::client::{SimulationClient, SimulationRequest};

/// Completion message produced by a worker.
///
/// Workers never touch shared search state; the control loop consumes these
/// off the completion channel and does all bookkeeping itself.
#[derive(Debug)]
pub struct TrialOutcome {
    pub trial_id: Uuid,
    pub outcome: Result<RawResult, FailureReason>,
    pub elapsed: Duration,
}

/// Runs simulations concurrently, bounded by a worker-pool size, and
/// delivers results asynchronously on the completion channel.
///
/// The pool semaphore is the system's only backpressure: when the service
/// is slow the pool saturates and `submit` awaits, throttling the caller.
pub struct TrialExecutor {
    client: Arc<dyn SimulationClient>,
    pool: Arc<Semaphore>,
    timeout: Duration,
    completions: mpsc::UnboundedSender<TrialOutcome>,
}

impl TrialExecutor {
    /// Create an executor and the receiving half of its completion channel.
    pub fn new(
        client: Arc<dyn SimulationClient>,
        concurrency_limit: usize,
        timeout: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<TrialOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let executor = Self {
            client,
            pool: Arc::new(Semaphore::new(concurrency_limit.max(1))),
            timeout,
            completions: tx,
        };
        (executor, rx)
    }

    /// Dispatch one trial. Awaits a pool slot, then runs the simulation on a
    /// worker task under the per-trial timeout. Returns once the trial is in
    /// flight.
    pub async fn submit(&self, trial_id: Uuid, request: SimulationRequest) {
        let Ok(permit) = Arc::clone(&self.pool).acquire_owned().await else {
            // The pool is never closed while the executor is alive.
            return;
        };

        let client = Arc::clone(&self.client);
        let completions = self.completions.clone();
        let timeout = self.timeout;

        tokio::spawn(async move {
            let start = Instant::now();
            let outcome = match tokio::time::timeout(timeout, client.simulate(request)).await {
                Ok(result) => result,
                Err(_) => Err(FailureReason::Timeout),
            };
            drop(permit);

            debug!(%trial_id, ok = outcome.is_ok(), "trial worker finished");
            // The receiver only drops once the study is over; a send failure
            // then is harmless.
            let _ = completions.send(TrialOutcome {
                trial_id,
                outcome,
                elapsed: start.elapsed(),
            });
        });
    }

    /// Pool slots currently free.
    pub fn available_slots(&self) -> usize {
        self.pool.available_permits()
    }
}
