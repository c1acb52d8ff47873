//! # Domain Module
//!
//! Core types for confidential bet submission.

pub mod entities;
pub mod errors;
pub mod invariants;
pub mod secure_key;
pub mod status;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use secure_key::CipherKey;
pub use status::*;
pub use value_objects::*;
