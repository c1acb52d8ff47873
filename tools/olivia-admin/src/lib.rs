//! # Olivia Admin
//!
//! Operator CLI for the confidential bet client.
//!
//! ```text
//! olivia-admin [--config olivia.toml] [--rpc-url URL] [--json] <command>
//!
//!   addresses   derived account set for a market / bettor / computation
//!   probe       getAccountInfo on the MXE, runtime pools and comp defs
//!   init-plan   what an idempotent initialization would create or finalize
//!   demo        one bet through the simulated network, every transition
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod commands;
pub mod error;

pub use cli::{Args, Command};
pub use error::AdminError;
