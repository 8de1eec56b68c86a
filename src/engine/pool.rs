//! Polling loops: one per running worker, joined on shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::model::worker::WorkerId;

use super::Kitchen;

impl Kitchen {
    /// Start the polling loop for one worker.
    pub fn start_worker(&self, id: WorkerId) -> Result<()> {
        super::require_runtime()?;

        let mut registry = self.registry.lock();
        let slot = registry
            .slots
            .get_mut(&id)
            .ok_or(Error::UnknownWorker(id))?;
        if !slot.worker.active {
            return Err(Error::WorkerInactive(id));
        }
        if slot.is_running() {
            return Err(Error::LoopRunning(id));
        }

        let alive = Arc::new(AtomicBool::new(true));
        slot.alive = Some(Arc::clone(&alive));
        let lease = slot.lease.clone();
        let stop = self.pool.lock().clone();

        self.loops
            .spawn(run_loop(self.clone(), id, lease, stop, AliveGuard(alive)));
        Ok(())
    }

    /// Start loops for up to `n` active workers that are not running yet,
    /// in registration order. Returns how many were started.
    pub fn start_pool(&self, n: usize) -> usize {
        let candidates: Vec<WorkerId> = self
            .registry
            .lock()
            .ordered()
            .into_iter()
            .filter(|slot| slot.worker.active && !slot.is_running())
            .take(n)
            .map(|slot| slot.worker.id)
            .collect();

        let mut started = 0;
        for id in candidates {
            match self.start_worker(id) {
                Ok(()) => started += 1,
                Err(e) => warn!(worker_id = %id, error = %e, "failed to start worker"),
            }
        }

        if started < n {
            warn!(requested = n, started, "fewer workers available than requested");
        }
        info!(started, "worker pool started");
        started
    }

    /// Stop every polling loop and wait until all of them have exited.
    ///
    /// Serving timers already running are left to finish. Loops may be
    /// started again afterwards.
    pub async fn stop_pool(&self) {
        info!("stopping worker pool");
        let stop = self.pool.lock().clone();
        stop.cancel();

        self.loops.close();
        self.loops.wait().await;

        *self.pool.lock() = self.root.child_token();
        self.loops.reopen();
        info!("worker pool stopped");
    }

    /// Tear the kitchen down: stop all loops and cancel pending serving
    /// timers. Cancelled orders stay `InProgress` in the store and are
    /// picked up again by [`recover`](Self::recover) on the next start.
    pub async fn shutdown(&self) {
        self.root.cancel();
        self.stop_pool().await;

        self.timers.close();
        self.timers.wait().await;
        info!("kitchen shut down");
    }
}

/// Clears the liveness flag when the loop ends, however it ends.
struct AliveGuard(Arc<AtomicBool>);

impl Drop for AliveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

async fn run_loop(
    kitchen: Kitchen,
    worker_id: WorkerId,
    lease: CancellationToken,
    stop: CancellationToken,
    _alive: AliveGuard,
) {
    info!(worker_id = %worker_id, "worker loop started");
    let backoff = kitchen.config.poll_interval;

    let reason = loop {
        if stop.is_cancelled() {
            break "pool stopped";
        }
        if lease.is_cancelled() {
            break "worker removed";
        }

        match kitchen.accept_serving(worker_id) {
            Ok((_order, serving)) => {
                // One order at a time: wait for this one before taking the next.
                tokio::select! {
                    _ = stop.cancelled() => break "pool stopped",
                    _ = lease.cancelled() => break "worker removed",
                    _ = serving => {}
                }
            }
            Err(e) => {
                if !e.is_nothing_to_do() {
                    warn!(worker_id = %worker_id, error = %e, "accept failed");
                }
                tokio::select! {
                    _ = stop.cancelled() => break "pool stopped",
                    _ = lease.cancelled() => break "worker removed",
                    _ = tokio::time::sleep(backoff) => {}
                }
            }
        }
    };

    info!(worker_id = %worker_id, reason, "worker loop stopped");
}
