//! # Domain Errors
//!
//! Error taxonomy for confidential bet submission.
//!
//! Every failure ends up in the single status object, so each variant
//! carries a message that is fit for display as-is.

use std::time::Duration;

use thiserror::Error;

use super::value_objects::ComputationOffset;

/// Failure reported by the network when submitting a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionFailure {
    /// Payer cannot cover the bet amount plus fees.
    #[error("insufficient funds")]
    InsufficientFunds,

    /// Account the instruction tries to create already exists.
    #[error("account already in use")]
    AccountAlreadyInUse,

    /// Preflight simulation rejected the transaction.
    #[error("simulation failed: {0}")]
    SimulationFailure(String),

    /// Any other rejection by the cluster.
    #[error("transaction rejected: {0}")]
    Rejected(String),
}

impl SubmissionFailure {
    /// Classify a raw RPC error message.
    pub fn from_rpc_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("insufficient funds") || lower.contains("insufficient lamports") {
            Self::InsufficientFunds
        } else if lower.contains("already in use") {
            Self::AccountAlreadyInUse
        } else if lower.contains("simulation failed") {
            Self::SimulationFailure(message.to_string())
        } else {
            Self::Rejected(message.to_string())
        }
    }
}

/// Error class, used to decide on retries and on how to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Detected before any I/O. Never retried.
    Precondition,
    /// Key not yet published, RPC timeouts. Retried with bounded backoff.
    TransientInfrastructure,
    /// Malformed key material or cipher failure. Never retried.
    Cryptographic,
    /// Transaction rejected by the network.
    Submission,
    /// Computation timed out or was rejected by the MXE.
    Finalization,
    /// Local misconfiguration.
    Configuration,
}

/// Bet client error types.
#[derive(Debug, Error)]
pub enum BetClientError {
    /// No wallet connected.
    #[error("Wallet not connected")]
    WalletNotConnected,

    /// Program interface (IDL) not loaded.
    #[error("Program interface not loaded")]
    InterfaceNotLoaded,

    /// Not connected to the network.
    #[error("Not connected to network")]
    NetworkUnavailable,

    /// Bet amount is not a positive finite number.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// MXE public key could not be fetched.
    #[error("MXE public key unavailable after {attempts} attempts")]
    KeyUnavailable {
        /// Attempts made before giving up
        attempts: u32,
    },

    /// Supplied public key is not usable for key agreement.
    #[error("Key agreement failed: {0}")]
    KeyAgreementFailure(String),

    /// Prediction could not be encrypted.
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Transaction submission failed.
    #[error("Submission failed: {0}")]
    Submission(#[from] SubmissionFailure),

    /// Computation did not finalize within the bound.
    #[error("Computation {offset} not finalized within {timeout:?}")]
    FinalizationTimeout {
        /// Computation being awaited
        offset: ComputationOffset,
        /// Bound that elapsed
        timeout: Duration,
    },

    /// Computation network reported a failure.
    #[error("Computation {offset} rejected: {reason}")]
    FinalizationRejected {
        /// Computation that failed
        offset: ComputationOffset,
        /// Reason reported by the network
        reason: String,
    },

    /// Lost track of the computation before it resolved; outcome unknown.
    #[error("Computation {offset} not tracked to completion: {reason}")]
    FinalizationInterrupted {
        /// Computation being awaited
        offset: ComputationOffset,
        /// Transport failure that ended the wait
        reason: String,
    },

    /// No program address could be found for the seeds.
    #[error("Address derivation failed for seed '{0}'")]
    AddressDerivation(String),

    /// Transport-level RPC failure.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// IDL present but unusable.
    #[error("Invalid program interface: {0}")]
    InvalidInterface(String),

    /// Configuration rejected.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl BetClientError {
    /// Taxonomy class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::WalletNotConnected
            | Self::InterfaceNotLoaded
            | Self::NetworkUnavailable
            | Self::InvalidAmount(_) => ErrorKind::Precondition,
            Self::KeyUnavailable { .. } | Self::Rpc(_) => ErrorKind::TransientInfrastructure,
            Self::KeyAgreementFailure(_) | Self::EncryptionFailed(_) => ErrorKind::Cryptographic,
            Self::Submission(_) => ErrorKind::Submission,
            Self::FinalizationTimeout { .. }
            | Self::FinalizationRejected { .. }
            | Self::FinalizationInterrupted { .. } => ErrorKind::Finalization,
            Self::AddressDerivation(_) | Self::InvalidInterface(_) | Self::Config(_) => {
                ErrorKind::Configuration
            }
        }
    }

    /// Whether starting the whole flow again can reasonably succeed.
    ///
    /// A rejected computation fails identically on identical inputs; a
    /// timeout, a dropped connection or an exhausted transient error may not.
    pub fn is_retryable_flow(&self) -> bool {
        matches!(
            self,
            Self::FinalizationTimeout { .. }
                | Self::FinalizationInterrupted { .. }
                | Self::KeyUnavailable { .. }
                | Self::Rpc(_)
        )
    }

    /// Short message shown in the status object's `message` field.
    pub fn headline(&self) -> &'static str {
        match self {
            Self::WalletNotConnected => "Wallet not connected",
            Self::InterfaceNotLoaded => "Program IDL not loaded",
            Self::NetworkUnavailable => "Not connected to Solana network",
            Self::InvalidAmount(_) => "Invalid bet amount",
            Self::KeyAgreementFailure(_) | Self::EncryptionFailed(_) => {
                "Failed to encrypt prediction"
            }
            Self::FinalizationTimeout { .. } => "Computation finalization timed out",
            Self::FinalizationRejected { .. } => "Computation rejected by the network",
            Self::FinalizationInterrupted { .. } => "Lost track of computation finalization",
            _ => "Failed to place bet",
        }
    }
}
