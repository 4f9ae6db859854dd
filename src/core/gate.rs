use crate::utils::error::{BackupError, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Counting admission gate shared by the workers of one fan-out phase.
///
/// A permit is held for the whole unit of work and released on drop, so it
/// is returned on every exit path including errors and early returns.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
}

impl AdmissionGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity.max(1))),
        }
    }

    /// Waits for a free slot, giving up when the run is cancelled.
    pub async fn admit(&self, cancel: &CancellationToken) -> Result<OwnedSemaphorePermit> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BackupError::Cancelled),
            permit = self.semaphore.clone().acquire_owned() => {
                permit.map_err(|_| BackupError::Cancelled)
            }
        }
    }
}

/// Races a blocking call against the run's cancellation signal.
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BackupError::Cancelled),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_gate_limits_outstanding_permits() {
        let gate = AdmissionGate::new(2);
        let cancel = CancellationToken::new();

        let first = gate.admit(&cancel).await.unwrap();
        let _second = gate.admit(&cancel).await.unwrap();

        let third = tokio::time::timeout(Duration::from_millis(20), gate.admit(&cancel)).await;
        assert!(third.is_err(), "third permit must wait for a release");

        drop(first);
        assert!(gate.admit(&cancel).await.is_ok());
    }

    #[tokio::test]
    async fn test_admit_returns_cancelled_while_waiting() {
        let gate = AdmissionGate::new(1);
        let cancel = CancellationToken::new();
        let _held = gate.admit(&cancel).await.unwrap();

        let waiter = {
            let gate = gate.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { gate.admit(&cancel).await })
        };
        cancel.cancel();

        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(BackupError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancellable_aborts_pending_call() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result: Result<()> = cancellable(&cancel, std::future::pending()).await;
        assert!(matches!(result, Err(BackupError::Cancelled)));
    }
}
