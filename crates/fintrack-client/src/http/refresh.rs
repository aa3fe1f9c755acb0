//! Single-flight coordination of access-token refresh.
//!
//! The first request to see a 401 becomes the leader and performs the one
//! refresh call; every request that sees a 401 while it runs parks a
//! continuation in a FIFO queue. Settling clears the in-progress flag and
//! drains the whole queue under the same lock, so the queue is never
//! non-empty while the flag is clear.

use crate::error::ClientError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::oneshot;

/// Failure shared by the leader and every waiter of one refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshFailure {
    pub status: Option<u16>,
    pub message: String,
}

impl RefreshFailure {
    pub(crate) fn abandoned() -> Self {
        Self { status: None, message: "refresh abandoned before completion".to_string() }
    }
}

impl From<RefreshFailure> for ClientError {
    fn from(f: RefreshFailure) -> Self {
        ClientError::RefreshFailed { status: f.status, message: f.message }
    }
}

/// New access token, or the failure every caller receives.
pub type RefreshOutcome = Result<String, RefreshFailure>;

#[derive(Default)]
struct RefreshState {
    in_progress: bool,
    waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

/// Refresh flag plus pending continuations, owned by one client instance.
#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

/// Role handed out by [`RefreshCoordinator::join`].
pub(crate) enum RefreshTicket<'a> {
    /// Perform the refresh and settle the guard.
    Leader(RefreshGuard<'a>),
    /// Wait for the leader's outcome.
    Waiter(oneshot::Receiver<RefreshOutcome>),
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_refreshing(&self) -> bool {
        self.state.lock().in_progress
    }

    /// Number of continuations parked behind the current refresh.
    pub fn pending(&self) -> usize {
        self.state.lock().waiters.len()
    }

    /// Check-and-set of the in-progress flag in one critical section.
    pub(crate) fn join(&self) -> RefreshTicket<'_> {
        let mut state = self.state.lock();
        if state.in_progress {
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            tracing::debug!("Refresh in flight, queued request ({} waiting)", state.waiters.len());
            RefreshTicket::Waiter(rx)
        } else {
            state.in_progress = true;
            RefreshTicket::Leader(RefreshGuard { coordinator: self, settled: false })
        }
    }

    fn settle(&self, outcome: &RefreshOutcome) -> usize {
        let waiters = {
            let mut state = self.state.lock();
            state.in_progress = false;
            std::mem::take(&mut state.waiters)
        };
        let count = waiters.len();
        for waiter in waiters {
            // A waiter whose caller was dropped has nobody to notify.
            let _ = waiter.send(outcome.clone());
        }
        count
    }
}

/// Await a leader's outcome from the waiter side.
pub(crate) async fn wait_for_refresh(rx: oneshot::Receiver<RefreshOutcome>) -> RefreshOutcome {
    rx.await.unwrap_or_else(|_| Err(RefreshFailure::abandoned()))
}

/// Leadership of one refresh. Dropping it unsettled (panic, cancelled future)
/// still clears the flag and fails every waiter.
pub(crate) struct RefreshGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl RefreshGuard<'_> {
    pub(crate) fn settle(mut self, outcome: &RefreshOutcome) {
        self.settled = true;
        let released = self.coordinator.settle(outcome);
        match outcome {
            Ok(_) => tracing::debug!("Refresh succeeded, released {} queued request(s)", released),
            Err(e) => tracing::debug!(
                "Refresh failed, rejected {} queued request(s): {}",
                released,
                e.message
            ),
        }
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("Refresh leader dropped without settling");
            self.coordinator.settle(&Err(RefreshFailure::abandoned()));
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn leader(coordinator: &RefreshCoordinator) -> RefreshGuard<'_> {
        match coordinator.join() {
            RefreshTicket::Leader(guard) => guard,
            RefreshTicket::Waiter(_) => panic!("expected leader"),
        }
    }

    fn waiter(coordinator: &RefreshCoordinator) -> oneshot::Receiver<RefreshOutcome> {
        match coordinator.join() {
            RefreshTicket::Waiter(rx) => rx,
            RefreshTicket::Leader(_) => panic!("expected waiter"),
        }
    }

    #[tokio::test]
    async fn test_only_one_leader_and_all_waiters_get_token() {
        let coordinator = RefreshCoordinator::new();
        let guard = leader(&coordinator);
        let first = waiter(&coordinator);
        let second = waiter(&coordinator);
        assert!(coordinator.is_refreshing());
        assert_eq!(coordinator.pending(), 2);

        guard.settle(&Ok("tok2".to_string()));

        assert!(!coordinator.is_refreshing());
        assert_eq!(coordinator.pending(), 0);
        assert_eq!(wait_for_refresh(first).await, Ok("tok2".to_string()));
        assert_eq!(wait_for_refresh(second).await, Ok("tok2".to_string()));
    }

    #[tokio::test]
    async fn test_failure_rejects_every_waiter() {
        let coordinator = RefreshCoordinator::new();
        let guard = leader(&coordinator);
        let rxs: Vec<_> = (0..3).map(|_| waiter(&coordinator)).collect();

        let failure = RefreshFailure { status: Some(401), message: "expired".to_string() };
        guard.settle(&Err(failure.clone()));

        for rx in rxs {
            assert_eq!(wait_for_refresh(rx).await, Err(failure.clone()));
        }
    }

    #[tokio::test]
    async fn test_dropped_leader_clears_flag() {
        let coordinator = RefreshCoordinator::new();
        let rx = {
            let _guard = leader(&coordinator);
            waiter(&coordinator)
        };

        assert!(!coordinator.is_refreshing());
        assert_eq!(wait_for_refresh(rx).await, Err(RefreshFailure::abandoned()));
        // next 401 elects a fresh leader
        let _next = leader(&coordinator);
    }
}
