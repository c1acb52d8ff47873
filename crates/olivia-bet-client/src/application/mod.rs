//! # Application Layer
//!
//! Orchestration of a bet submission and the infrastructure it relies on.

pub mod addresses;
pub mod finalization;
pub mod initializer;
pub mod key_fetcher;
pub mod service;
pub mod status_board;

pub use addresses::derive_address_set;
pub use finalization::FinalizationWaiter;
pub use initializer::{InfrastructureInitializer, InitOutcome, InitTarget, PlanEntry};
pub use key_fetcher::{ClientContext, KeyFetcher, NetworkKeyCache};
pub use service::{BetClientDeps, BetSubmissionService, SubmissionHandle};
pub use status_board::{Generation, StatusBoard};
