//! # Algorithms Module
//!
//! Cryptography, address derivation and instruction encoding.

pub mod address;
pub mod cipher;
pub mod instruction;
pub mod key_agreement;
pub mod offset;
pub mod retry;

pub use address::{
    comp_def_offset, derive_bet_address, derive_market_address, find_address, BET_SEED,
    MARKET_SEED,
};
pub use cipher::{encrypt_prediction, encrypt_prediction_with, AesCtrCipher, Cipher};
pub use instruction::{
    anchor_discriminator, comp_def_init_instruction, FinalizeCompDefArgs, InstructionBuilder,
    PlaceBetArgs, ProgramInterface, FINALIZE_COMP_DEF_INSTRUCTION, PLACE_BET_INSTRUCTION,
};
pub use key_agreement::{cipher_key_from_agreement, EncryptionKeypair, CIPHER_KEY_INFO};
pub use offset::{generate_computation_offset, OffsetGenerator, RandomOffsetGenerator};
pub use retry::RetryPolicy;
