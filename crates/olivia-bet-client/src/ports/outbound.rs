//! # Outbound Ports
//!
//! Traits for the wallet-backed network, the MPC runtime and its key.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use solana_program::instruction::Instruction;
use solana_program::pubkey::Pubkey;

use crate::domain::{
    BetClientError, Commitment, ComputationOffset, FinalizationSignature, NetworkPublicKey,
    SubmissionFailure, TransactionSignature,
};

/// Source of the MXE x25519 public key - outbound port.
#[async_trait]
pub trait MxeKeySource: Send + Sync {
    /// Current key for `program_id`, or `None` while it is not published yet.
    async fn fetch_public_key(
        &self,
        program_id: &Pubkey,
    ) -> Result<Option<NetworkPublicKey>, BetClientError>;
}

/// Wallet-backed transaction submission - outbound port.
///
/// Implementations sign with the connected wallet as fee payer.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    /// Whether the network connection is up.
    fn is_connected(&self) -> bool {
        true
    }

    /// Sign, send and confirm a single-instruction transaction.
    async fn submit(
        &self,
        instruction: Instruction,
        payer: &Pubkey,
        commitment: Commitment,
    ) -> Result<TransactionSignature, SubmissionFailure>;
}

/// Completion of off-chain computations - outbound port.
#[async_trait]
pub trait ComputationFinalizer: Send + Sync {
    /// Resolve once the computation's callback has landed.
    ///
    /// Unbounded; callers apply their own timeout.
    async fn await_finalization(
        &self,
        offset: ComputationOffset,
        program_id: &Pubkey,
        commitment: Commitment,
    ) -> Result<FinalizationSignature, BetClientError>;
}

/// On-chain account existence - outbound port.
#[async_trait]
pub trait AccountProbe: Send + Sync {
    /// Whether an account exists at `address`.
    async fn account_exists(&self, address: &Pubkey) -> Result<bool, BetClientError>;

    /// Whether the computation definition at `address` has been finalized.
    ///
    /// `None` when the adapter cannot read the runtime's account layout.
    async fn comp_def_finalized(&self, _address: &Pubkey) -> Result<Option<bool>, BetClientError> {
        Ok(None)
    }
}

/// Accounts owned by the MPC runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfrastructureAccount {
    /// MXE account of a program.
    Mxe,
    /// Mempool of a program's MXE.
    Mempool,
    /// Executing pool of a program's MXE.
    ExecutingPool,
    /// Computation account for one offset.
    Computation(ComputationOffset),
    /// Computation definition for a circuit offset.
    ComputationDefinition(u32),
    /// Cluster for a cluster offset.
    Cluster(u32),
    /// Runtime fee pool.
    FeePool,
    /// Runtime clock.
    Clock,
    /// Signer PDA of the calling program.
    Signer,
}

/// Address rules of the MPC runtime - outbound port.
///
/// The runtime owns its seed layout; this crate only asks.
pub trait InfrastructureAddresses: Send + Sync {
    /// Program id of the runtime itself.
    fn runtime_program_id(&self) -> Pubkey;

    /// Address of `account` as used by `program_id`.
    fn address_of(
        &self,
        program_id: &Pubkey,
        account: InfrastructureAccount,
    ) -> Result<Pubkey, BetClientError>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Key source that errors or stays empty for a number of calls.
#[derive(Debug)]
pub struct MockKeySource {
    /// Key returned once available.
    pub key: NetworkPublicKey,
    /// Calls that return `None` before the key appears.
    pub unavailable_calls: u32,
    /// Return an RPC error instead of `None` while unavailable.
    pub fail_with_error: bool,
    pub(crate) calls: AtomicU32,
}

impl MockKeySource {
    /// Key available after `unavailable_calls` empty answers.
    pub fn new(key: NetworkPublicKey, unavailable_calls: u32) -> Self {
        Self {
            key,
            unavailable_calls,
            fail_with_error: false,
            calls: AtomicU32::new(0),
        }
    }

    /// Calls made so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MxeKeySource for MockKeySource {
    async fn fetch_public_key(
        &self,
        _program_id: &Pubkey,
    ) -> Result<Option<NetworkPublicKey>, BetClientError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.unavailable_calls {
            if self.fail_with_error {
                return Err(BetClientError::Rpc("Mock failure".to_string()));
            }
            return Ok(None);
        }
        Ok(Some(self.key))
    }
}
