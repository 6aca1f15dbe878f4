//! Periodic driver: the outer loop that calls [`EvictionManager::synchronize`]
//! on a fixed interval until told to stop.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::manager::EvictionManager;

/// Run `manager.synchronize()` every `period` until `shutdown` resolves.
///
/// Each iteration is wrapped in its own tracing span so a slow or
/// panicking cycle is attributable. A cycle that runs past `period` does
/// not delay the next one by more than the overrun; the sleep is always
/// computed from the start of the current iteration, not from when it
/// finished.
pub async fn run(manager: Arc<EvictionManager>, period: Duration, mut shutdown: tokio::sync::oneshot::Receiver<()>) {
    info!(?period, "eviction manager driver starting");

    let mut iteration_no: u64 = 0;
    loop {
        iteration_no += 1;
        let start = tokio::time::Instant::now();

        run_iteration(&manager, iteration_no);

        let sleep_until = start + period;
        tokio::select! {
            _ = tokio::time::sleep_until(sleep_until) => {}
            _ = &mut shutdown => {
                info!("eviction manager driver stopping");
                return;
            }
        }
    }
}

#[instrument(skip_all, fields(iteration_no))]
fn run_iteration(manager: &EvictionManager, iteration_no: u64) {
    let _ = iteration_no;
    manager.synchronize();
}

/// Spawn [`run`] on the current tokio runtime, returning a handle that
/// stops the driver when dropped or explicitly signaled.
pub struct DriverHandle {
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    join: tokio::task::JoinHandle<()>,
}

impl DriverHandle {
    pub fn spawn(manager: Arc<EvictionManager>, period: Duration) -> Self {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let join = tokio::spawn(run(manager, period, rx));
        DriverHandle {
            shutdown: Some(tx),
            join,
        }
    }

    /// Signal the driver to stop and wait for its current iteration to finish.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.join.await {
            warn!("eviction manager driver task panicked: {e}");
        }
    }
}
