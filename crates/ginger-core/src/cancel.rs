//! Per-request cancellation and deadlines
//!
//! Only the GENERATING stage waits on the network, so that is the only stage
//! that observes these. A token can be cloned and fired from any task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// Cooperative cancellation token
#[derive(Debug, Clone)]
pub struct CancellationToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    /// Create a new cancellation token (not cancelled)
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request cancellation; wakes every waiter
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `cancel` has been called (immediately if it already was)
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this can only return Ok
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Caller controls for a single insight request
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub cancel: Option<CancellationToken>,
    /// Upper bound on time spent in GENERATING
    pub deadline: Option<Duration>,
}

impl RequestOptions {
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}
