//! Bound on concurrently in-flight API requests, shared by all clones of a client.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{JiraError, Result};

/// Gate every request passes through. Worklog fan-out can issue one request per issue,
/// so the gate keeps the number of open requests at or below `limit`.
#[derive(Clone, Debug)]
pub struct RequestGate {
    limit: usize,
    permits: Arc<Semaphore>,
}

impl RequestGate {
    /// Creates a gate admitting at most `limit` concurrent requests.
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            permits: Arc::new(Semaphore::new(limit)),
        }
    }

    /// Waits for a free slot. The slot is released when the permit is dropped.
    pub async fn enter(&self) -> Result<OwnedSemaphorePermit> {
        self.permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|err| JiraError::Other(err.to_string()))
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::RequestGate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn limit_is_clamped_to_one() {
        let gate = RequestGate::new(0);
        assert_eq!(gate.limit(), 1);
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test]
    async fn permit_is_returned_on_drop() {
        let gate = RequestGate::new(2);
        let permit = gate.enter().await.expect("slot");
        assert_eq!(gate.available(), 1);
        drop(permit);
        assert_eq!(gate.available(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_holders_never_exceed_limit() {
        let gate = RequestGate::new(2);
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let gate = gate.clone();
            let current = current.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                let _permit = gate.enter().await.expect("slot");
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                current.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.expect("task");
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
