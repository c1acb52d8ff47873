//! # Program Address Derivation
//!
//! Market and bet accounts of the prediction market program, plus the
//! computation-definition offset of a circuit.

use sha2::{Digest, Sha256};
use solana_program::pubkey::Pubkey;

use crate::domain::{BetClientError, CircuitName, MarketId};

/// Seed prefix of market accounts.
pub const MARKET_SEED: &[u8] = b"market";

/// Seed prefix of bet accounts.
pub const BET_SEED: &[u8] = b"bet";

/// Find a program address, failing instead of panicking when no bump works.
pub fn find_address(
    seeds: &[&[u8]],
    program_id: &Pubkey,
    label: &str,
) -> Result<Pubkey, BetClientError> {
    Pubkey::try_find_program_address(seeds, program_id)
        .map(|(address, _bump)| address)
        .ok_or_else(|| BetClientError::AddressDerivation(label.to_string()))
}

/// `["market", market_id_le]` under the program.
pub fn derive_market_address(
    program_id: &Pubkey,
    market_id: MarketId,
) -> Result<Pubkey, BetClientError> {
    find_address(&[MARKET_SEED, &market_id.to_le_bytes()], program_id, "market")
}

/// `["bet", market_id_le, bettor]` under the program.
pub fn derive_bet_address(
    program_id: &Pubkey,
    market_id: MarketId,
    bettor: &Pubkey,
) -> Result<Pubkey, BetClientError> {
    find_address(
        &[BET_SEED, &market_id.to_le_bytes(), bettor.as_ref()],
        program_id,
        "bet",
    )
}

/// First four bytes of `sha256(circuit_name)`, read little-endian.
pub fn comp_def_offset(circuit: CircuitName) -> u32 {
    let digest = Sha256::digest(circuit.as_str().as_bytes());
    u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
}
