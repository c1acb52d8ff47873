//! # Key Fetcher
//!
//! Bounded fixed-delay retrieval of the MXE public key, with a
//! session-scoped cache passed explicitly through [`ClientContext`].

use std::sync::Arc;

use parking_lot::RwLock;
use solana_program::pubkey::Pubkey;
use tracing::{debug, info, warn};

use crate::algorithms::RetryPolicy;
use crate::domain::{BetClientError, ErrorKind, NetworkPublicKey};
use crate::metrics;
use crate::ports::MxeKeySource;

/// Read-mostly cache of the MXE key for one provider session.
///
/// Concurrent fills are harmless: every fetch returns the same key.
#[derive(Clone, Debug, Default)]
pub struct NetworkKeyCache(Arc<RwLock<Option<NetworkPublicKey>>>);

impl NetworkKeyCache {
    /// Cached key, if any.
    pub fn get(&self) -> Option<NetworkPublicKey> {
        *self.0.read()
    }

    /// Store a key.
    pub fn set(&self, key: NetworkPublicKey) {
        *self.0.write() = Some(key);
    }

    /// Forget the key, e.g. when the session changes.
    pub fn clear(&self) {
        *self.0.write() = None;
    }
}

/// Session context passed through the call chain.
#[derive(Clone, Debug)]
pub struct ClientContext {
    /// Prediction market program.
    pub program_id: Pubkey,
    /// Cluster used for computations.
    pub cluster_offset: u32,
    /// MXE key cache.
    pub key_cache: NetworkKeyCache,
}

impl ClientContext {
    /// Fresh context with an empty cache.
    pub fn new(program_id: Pubkey, cluster_offset: u32) -> Self {
        Self {
            program_id,
            cluster_offset,
            key_cache: NetworkKeyCache::default(),
        }
    }
}

/// Fetches the MXE key with bounded retry.
pub struct KeyFetcher {
    source: Arc<dyn MxeKeySource>,
    policy: RetryPolicy,
}

impl KeyFetcher {
    /// Create a fetcher.
    pub fn new(source: Arc<dyn MxeKeySource>, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    /// Retry policy in use.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Key from the context cache, fetching and caching it on a miss.
    pub async fn fetch_cached(
        &self,
        context: &ClientContext,
    ) -> Result<NetworkPublicKey, BetClientError> {
        if let Some(key) = context.key_cache.get() {
            debug!("[bet-client] MXE key cache hit");
            return Ok(key);
        }
        let key = self.fetch(&context.program_id).await?;
        context.key_cache.set(key);
        Ok(key)
    }

    /// Fetch the key, bypassing any cache.
    ///
    /// Makes at most `max_attempts` calls and sleeps `delay` between them,
    /// never after the last one.
    ///
    /// # Errors
    ///
    /// `KeyUnavailable` once the attempts are exhausted. Cryptographic
    /// errors from the source are returned immediately.
    pub async fn fetch(&self, program_id: &Pubkey) -> Result<NetworkPublicKey, BetClientError> {
        let max = self.policy.max_attempts;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.source.fetch_public_key(program_id).await {
                Ok(Some(key)) => {
                    metrics::record_key_fetch("ok");
                    info!(attempt, "[bet-client] MXE public key fetched");
                    return Ok(key);
                }
                Ok(None) => {
                    metrics::record_key_fetch("unavailable");
                    warn!(attempt, max, "[bet-client] MXE public key not available yet");
                }
                Err(e) if e.kind() == ErrorKind::Cryptographic => {
                    metrics::record_key_fetch("invalid");
                    return Err(e);
                }
                Err(e) => {
                    metrics::record_key_fetch("error");
                    warn!(attempt, max, error = %e, "[bet-client] MXE public key fetch failed");
                }
            }

            if !self.policy.should_retry(attempt) {
                return Err(BetClientError::KeyUnavailable { attempts: attempt });
            }
            tokio::time::sleep(self.policy.delay).await;
        }
    }
}
