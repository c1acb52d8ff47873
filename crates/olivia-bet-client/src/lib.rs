//! # Olivia Bet Client
//!
//! Client-side protocol for placing confidential bets on the Olivia
//! prediction market.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! A bet's direction (YES / NO) must stay hidden from everyone except the
//! Arcium MXE cluster that settles the market:
//! - x25519 key agreement with the MXE public key, fresh keys per attempt
//! - the prediction encrypted as one 32-byte AES-256-CTR block under a key
//!   derived from the shared secret with HKDF-SHA256
//! - deterministic program-derived addresses for every referenced account
//! - one `place_bet` transaction, then a bounded wait for the computation
//!   callback
//!
//! Every stage is published on a single observable status object.
//!
//! ## Submission Flow
//!
//! ```text
//! idle -> encrypting -> signing -> submitting -> waiting -> success
//!             |            |            |           |
//!             +------------+------------+-----------+-----> error
//! ```
//!
//! ## Module Structure
//!
//! ```text
//! olivia-bet-client/
//! ├── domain/          # Prediction, MarketId, SubmissionAttempt, status, errors
//! ├── algorithms/      # Key agreement, cipher, PDAs, instruction encoding, retry
//! ├── ports/           # BetClientApi, MxeKeySource, TransactionSubmitter, ...
//! ├── adapters/        # Arcium address layout, JSON-RPC probe, simulated network
//! ├── application/     # BetSubmissionService, KeyFetcher, FinalizationWaiter
//! ├── config.rs        # BetClientConfig
//! └── metrics.rs       # Prometheus metrics (feature = "metrics")
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod ports;

// Re-exports
pub use adapters::{
    ArciumAddressing, ComputationEvent, FinalizationMode, InMemoryMxe, PoolTotals,
    RpcAccountProbe, SimulatedArciumNetwork,
};
pub use algorithms::{
    comp_def_offset, encrypt_prediction, AesCtrCipher, Cipher, EncryptionKeypair,
    InstructionBuilder, PlaceBetArgs, ProgramInterface, RetryPolicy,
};
pub use application::{
    derive_address_set, BetClientDeps, BetSubmissionService, ClientContext,
    InfrastructureInitializer, InitOutcome, InitTarget, PlanEntry, StatusBoard,
    SubmissionHandle,
};
pub use config::{BetClientConfig, KeyFetchConfig};
pub use domain::{
    AddressReport, BetAmount, BetClientError, BetReceipt, BetRequest, CircuitName, Commitment,
    ComputationOffset, DerivedAddressSet, EncryptedPrediction, ErrorKind, MarketId,
    NetworkPublicKey, OrderSide, Prediction, StatusReport, SubmissionFailure, SubmissionStatus,
    LAMPORTS_PER_SOL,
};
pub use ports::{
    AccountProbe, BetClientApi, ComputationFinalizer, InfrastructureAccount,
    InfrastructureAddresses, MxeKeySource, TransactionSubmitter,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
