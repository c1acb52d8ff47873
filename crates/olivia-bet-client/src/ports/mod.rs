//! # Ports Module
//!
//! Hexagonal boundaries of the bet client.

pub mod inbound;
pub mod outbound;

pub use inbound::BetClientApi;
pub use outbound::{
    AccountProbe, ComputationFinalizer, InfrastructureAccount, InfrastructureAddresses,
    MockKeySource, MxeKeySource, TransactionSubmitter,
};
