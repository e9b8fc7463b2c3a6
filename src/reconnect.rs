use std::sync::Arc;

use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, trace};

use crate::{packer::Packer, transport::Shared};

/// Periodically retries every neighbor currently queued in
/// `needs_reconnect`.
///
/// Each tick snapshots the queue, then fires one detached connect attempt
/// per neighbor and waits for all of them to finish before sleeping again
/// — a tick never starts while the previous one still has attempts
/// in flight. The attempts themselves are spawned rather than run inline so
/// that aborting this loop's own task (on shutdown) cannot cut one off
/// mid-connect; each attempt re-checks `is_running` before touching shared
/// state, so a connect that completes after shutdown has already begun
/// closes the socket instead of resurrecting a table entry.
pub(crate) fn spawn<P: Packer>(shared: Arc<Shared<P>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(shared.config.reconnection_interval).await;

            let pending: Vec<_> = shared.state.read().needs_reconnect.iter().cloned().collect();
            if pending.is_empty() {
                trace!("reconnection tick, nothing queued");
                continue;
            }
            debug!("reconnection tick, {} neighbor(s) queued", pending.len());

            let mut attempts = JoinSet::new();
            for neighbor in pending {
                let shared = shared.clone();
                attempts.spawn(async move { attempt(&shared, neighbor).await });
            }
            while attempts.join_next().await.is_some() {}
        }
    })
}

async fn attempt<P: Packer>(shared: &Arc<Shared<P>>, neighbor: crate::neighbor::Neighbor) {
    if !shared.state.read().run.is_running() {
        return;
    }
    let transport = crate::transport::Transport { shared: shared.clone() };
    match transport.try_connect(&neighbor).await {
        Ok(()) => {
            shared.state.write().needs_reconnect.remove(&neighbor);
            debug!("reconnected to {neighbor}");
        }
        Err(err) => {
            // stays queued; the next tick retries it
            debug!("reconnection attempt to {neighbor} failed, still queued: {err}");
        }
    }
}
