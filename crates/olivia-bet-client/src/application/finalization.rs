//! # Finalization Waiter
//!
//! Bounds the wait for a computation's callback.

use std::sync::Arc;
use std::time::Duration;

use solana_program::pubkey::Pubkey;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::domain::{BetClientError, Commitment, ComputationOffset, FinalizationSignature};
use crate::metrics;
use crate::ports::ComputationFinalizer;

/// Waits for finalization with a timeout.
pub struct FinalizationWaiter {
    finalizer: Arc<dyn ComputationFinalizer>,
    timeout: Duration,
}

impl FinalizationWaiter {
    /// Create a waiter.
    pub fn new(finalizer: Arc<dyn ComputationFinalizer>, timeout: Duration) -> Self {
        Self { finalizer, timeout }
    }

    /// Configured bound.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait for `offset` to finalize.
    ///
    /// # Errors
    ///
    /// `FinalizationTimeout` once the bound elapses; `FinalizationRejected`
    /// only when the network reports the computation failed, carrying its
    /// reason. A transport failure while waiting becomes
    /// `FinalizationInterrupted`, which leaves the outcome open.
    pub async fn await_finalization(
        &self,
        offset: ComputationOffset,
        program_id: &Pubkey,
        commitment: Commitment,
    ) -> Result<FinalizationSignature, BetClientError> {
        let started = Instant::now();
        let waited = tokio::time::timeout(
            self.timeout,
            self.finalizer
                .await_finalization(offset, program_id, commitment),
        )
        .await;

        match waited {
            Ok(Ok(signature)) => {
                let elapsed = started.elapsed();
                metrics::record_finalization_duration(elapsed.as_secs_f64());
                info!(
                    computation_offset = %offset,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "[bet-client] computation finalized"
                );
                Ok(signature)
            }
            Ok(Err(BetClientError::FinalizationRejected { reason, .. })) => {
                warn!(computation_offset = %offset, %reason, "[bet-client] computation rejected");
                Err(BetClientError::FinalizationRejected { offset, reason })
            }
            Ok(Err(BetClientError::FinalizationInterrupted { reason, .. })) => {
                warn!(computation_offset = %offset, %reason, "[bet-client] lost track of computation");
                Err(BetClientError::FinalizationInterrupted { offset, reason })
            }
            Ok(Err(e @ BetClientError::Rpc(_))) => {
                warn!(computation_offset = %offset, error = %e, "[bet-client] lost track of computation");
                Err(BetClientError::FinalizationInterrupted {
                    offset,
                    reason: e.to_string(),
                })
            }
            Ok(Err(other)) => {
                warn!(computation_offset = %offset, error = %other, "[bet-client] finalization failed");
                Err(other)
            }
            Err(_) => {
                warn!(
                    computation_offset = %offset,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "[bet-client] finalization timed out"
                );
                Err(BetClientError::FinalizationTimeout {
                    offset,
                    timeout: self.timeout,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Never;

    #[async_trait]
    impl ComputationFinalizer for Never {
        async fn await_finalization(
            &self,
            _offset: ComputationOffset,
            _program_id: &Pubkey,
            _commitment: Commitment,
        ) -> Result<FinalizationSignature, BetClientError> {
            std::future::pending().await
        }
    }

    struct Disconnects;

    #[async_trait]
    impl ComputationFinalizer for Disconnects {
        async fn await_finalization(
            &self,
            _offset: ComputationOffset,
            _program_id: &Pubkey,
            _commitment: Commitment,
        ) -> Result<FinalizationSignature, BetClientError> {
            Err(BetClientError::Rpc("websocket closed".to_string()))
        }
    }

    struct Refuses;

    #[async_trait]
    impl ComputationFinalizer for Refuses {
        async fn await_finalization(
            &self,
            offset: ComputationOffset,
            _program_id: &Pubkey,
            _commitment: Commitment,
        ) -> Result<FinalizationSignature, BetClientError> {
            Err(BetClientError::FinalizationRejected {
                offset,
                reason: "circuit aborted".to_string(),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_not_early_not_late() {
        let waiter = FinalizationWaiter::new(Arc::new(Never), Duration::from_secs(5));
        let start = Instant::now();
        let result = waiter
            .await_finalization(ComputationOffset::new(1), &Pubkey::new_unique(), Commitment::Confirmed)
            .await;
        assert!(matches!(result, Err(BetClientError::FinalizationTimeout { .. })));
        assert!(start.elapsed() >= Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(6));
    }

    #[tokio::test]
    async fn test_dropped_connection_stays_retryable() {
        let waiter = FinalizationWaiter::new(Arc::new(Disconnects), Duration::from_secs(5));
        let result = waiter
            .await_finalization(ComputationOffset::new(2), &Pubkey::new_unique(), Commitment::Finalized)
            .await;
        match result {
            Err(e @ BetClientError::FinalizationInterrupted { .. }) => {
                assert!(e.is_retryable_flow());
                assert_ne!(e.headline(), "Computation rejected by the network");
                assert!(e.to_string().contains("websocket closed"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reported_failure_is_rejection_with_reason() {
        let waiter = FinalizationWaiter::new(Arc::new(Refuses), Duration::from_secs(5));
        let result = waiter
            .await_finalization(ComputationOffset::new(3), &Pubkey::new_unique(), Commitment::Finalized)
            .await;
        let err = result.unwrap_err();
        assert!(!err.is_retryable_flow());
        match err {
            BetClientError::FinalizationRejected { offset, reason } => {
                assert_eq!(offset, ComputationOffset::new(3));
                assert_eq!(reason, "circuit aborted");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
