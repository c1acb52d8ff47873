//! # Domain Entities
//!
//! The `SubmissionAttempt` aggregate and the values it collects along the way.

use serde::Serialize;
use solana_program::pubkey::Pubkey;
use uuid::Uuid;

use super::status::SubmissionStatus;
use super::value_objects::{
    BetAmount, Ciphertext, ComputationOffset, FinalizationSignature, MarketId, Nonce, Prediction,
    TransactionSignature, X25519_KEY_LEN,
};

/// Output of encrypting a prediction for the MXE.
///
/// Only public values: the private key and shared secret are gone by the
/// time this exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedPrediction {
    /// Encrypted `[prediction ? 1 : 0]`.
    pub ciphertext: Ciphertext,
    /// Ephemeral x25519 public key, so the MXE can re-derive the secret.
    pub public_key: [u8; X25519_KEY_LEN],
    /// Nonce used for this encryption, sent in the clear.
    pub nonce: Nonce,
}

/// Every account a `place_bet` instruction references.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DerivedAddressSet {
    /// Market account, `["market", market_id]`.
    pub market: Pubkey,
    /// Bet account, `["bet", market_id, bettor]`.
    pub bet: Pubkey,
    /// Program signer PDA used for CPI into the MPC runtime.
    pub sign_pda: Pubkey,
    /// MXE account of the program.
    pub mxe: Pubkey,
    /// Mempool account.
    pub mempool: Pubkey,
    /// Executing pool account.
    pub executing_pool: Pubkey,
    /// Computation account keyed by the computation offset.
    pub computation: Pubkey,
    /// Computation definition of the `place_bet` circuit.
    pub comp_def: Pubkey,
    /// Cluster account.
    pub cluster: Pubkey,
    /// MPC runtime fee pool.
    pub fee_pool: Pubkey,
    /// MPC runtime clock.
    pub clock: Pubkey,
}

impl DerivedAddressSet {
    /// Labelled entries for display and debugging.
    pub fn entries(&self) -> [(&'static str, Pubkey); 11] {
        [
            ("market", self.market),
            ("bet", self.bet),
            ("sign_pda", self.sign_pda),
            ("mxe", self.mxe),
            ("mempool", self.mempool),
            ("executing_pool", self.executing_pool),
            ("computation", self.computation),
            ("comp_def", self.comp_def),
            ("cluster", self.cluster),
            ("fee_pool", self.fee_pool),
            ("clock", self.clock),
        ]
    }
}

/// Base58 view of a [`DerivedAddressSet`] for the presentation layer.
#[derive(Clone, Debug, Serialize)]
pub struct AddressReport(pub Vec<(String, String)>);

impl From<&DerivedAddressSet> for AddressReport {
    fn from(set: &DerivedAddressSet) -> Self {
        Self(
            set.entries()
                .iter()
                .map(|(label, key)| ((*label).to_string(), key.to_string()))
                .collect(),
        )
    }
}

/// User's confirmed bet, before any protocol work.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BetRequest {
    /// YES / NO.
    pub prediction: Prediction,
    /// Amount in SOL as entered.
    pub amount_sol: f64,
    /// Target market.
    pub market_id: MarketId,
}

/// Aggregate root for one user action.
///
/// Created on confirmation, mutated only by the orchestrator, discarded
/// after a terminal status. Each attempt owns its own keypair, nonce and
/// offset; nothing is carried over to the next attempt.
#[derive(Clone, Debug)]
pub struct SubmissionAttempt {
    /// Correlation id for logs and status reports.
    pub id: Uuid,
    /// Protected value.
    pub prediction: Prediction,
    /// Validated amount.
    pub amount: BetAmount,
    /// Target market.
    pub market_id: MarketId,
    /// Wallet placing the bet.
    pub bettor: Pubkey,
    /// Encryption output, once produced.
    pub encrypted: Option<EncryptedPrediction>,
    /// Correlation id of the off-chain computation.
    pub computation_offset: Option<ComputationOffset>,
    /// Accounts referenced by the instruction.
    pub addresses: Option<DerivedAddressSet>,
    /// Signature of the `place_bet` transaction.
    pub transaction_signature: Option<TransactionSignature>,
    /// Signature of the finalizing callback.
    pub finalization_signature: Option<FinalizationSignature>,
    /// Current stage.
    pub status: SubmissionStatus,
}

impl SubmissionAttempt {
    /// Start a new attempt.
    pub fn new(bettor: Pubkey, prediction: Prediction, amount: BetAmount, market_id: MarketId) -> Self {
        Self {
            id: Uuid::new_v4(),
            prediction,
            amount,
            market_id,
            bettor,
            encrypted: None,
            computation_offset: None,
            addresses: None,
            transaction_signature: None,
            finalization_signature: None,
            status: SubmissionStatus::Idle,
        }
    }
}

/// Result of a finished attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BetReceipt {
    /// Attempt id.
    pub attempt_id: Uuid,
    /// Market the bet went to.
    pub market_id: MarketId,
    /// Computation correlation id.
    pub computation_offset: ComputationOffset,
    /// `place_bet` transaction.
    pub transaction_signature: TransactionSignature,
    /// Finalizing callback.
    pub finalization_signature: FinalizationSignature,
    /// Accounts used.
    pub addresses: DerivedAddressSet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_attempt_is_idle_and_empty() {
        let attempt = SubmissionAttempt::new(
            Pubkey::new_unique(),
            Prediction::new(true),
            BetAmount::from_lamports(10).unwrap(),
            MarketId::new(1),
        );
        assert_eq!(attempt.status, SubmissionStatus::Idle);
        assert!(attempt.encrypted.is_none());
        assert!(attempt.computation_offset.is_none());
    }

    #[test]
    fn test_attempt_ids_differ() {
        let bettor = Pubkey::new_unique();
        let amount = BetAmount::from_lamports(10).unwrap();
        let a = SubmissionAttempt::new(bettor, Prediction::new(true), amount, MarketId::new(1));
        let b = SubmissionAttempt::new(bettor, Prediction::new(true), amount, MarketId::new(1));
        assert_ne!(a.id, b.id);
    }
}
