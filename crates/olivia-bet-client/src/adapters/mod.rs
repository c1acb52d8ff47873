//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implementations of the outbound ports.

mod arcium_addressing;
mod in_memory_mxe;
mod rpc_probe;
mod simulated_network;

pub use arcium_addressing::{ArciumAddressing, DEFAULT_ARCIUM_PROGRAM_ID};
pub use in_memory_mxe::InMemoryMxe;
pub use rpc_probe::{AccountSnapshot, RpcAccountProbe};
pub use simulated_network::{
    ComputationEvent, FinalizationMode, PoolTotals, SimulatedArciumNetwork,
    DEFAULT_EVENT_CAPACITY,
};
