//! Subcommand implementations.
//!
//! Each command returns a serializable report whose `Display` impl is the
//! text output.

pub mod addresses;
pub mod demo;
pub mod init_plan;
pub mod probe;

pub use addresses::{derive_addresses, AddressesReport};
pub use demo::{run_demo, DemoOutcome, DemoReport};
pub use init_plan::{plan_with, run_init_plan, PlanAction, PlanReport};
pub use probe::{probe_targets, run_probe, ProbeReport};
