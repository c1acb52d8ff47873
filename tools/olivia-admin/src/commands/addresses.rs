//! `addresses`: the full account set of a `place_bet` instruction.

use std::fmt;

use olivia_bet_client::algorithms::generate_computation_offset;
use olivia_bet_client::{
    derive_address_set, AddressReport, ArciumAddressing, BetClientConfig, ClientContext,
    ComputationOffset, MarketId,
};
use serde::Serialize;
use solana_program::pubkey::Pubkey;

use crate::AdminError;

/// Derived accounts for one market, bettor and computation.
#[derive(Debug, Clone, Serialize)]
pub struct AddressesReport {
    /// Prediction market program.
    pub program_id: String,
    /// Market.
    pub market_id: u64,
    /// Bettor wallet.
    pub bettor: String,
    /// Computation offset the set was derived for.
    pub computation_offset: u64,
    /// Label / address pairs.
    pub accounts: AddressReport,
}

/// Derive every account `place_bet` would reference.
pub fn derive_addresses(
    config: &BetClientConfig,
    market_id: MarketId,
    bettor: Pubkey,
    offset: Option<u64>,
) -> Result<AddressesReport, AdminError> {
    let context = ClientContext::new(config.program_pubkey()?, config.cluster_offset);
    let runtime = ArciumAddressing::new(config.arcium_program_pubkey()?);
    let offset = offset
        .map(ComputationOffset::new)
        .unwrap_or_else(generate_computation_offset);

    let set = derive_address_set(&runtime, &context, market_id, &bettor, offset)?;
    Ok(AddressesReport {
        program_id: context.program_id.to_string(),
        market_id: market_id.value(),
        bettor: bettor.to_string(),
        computation_offset: offset.value(),
        accounts: AddressReport::from(&set),
    })
}

impl fmt::Display for AddressesReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "program            {}", self.program_id)?;
        writeln!(f, "market_id          {}", self.market_id)?;
        writeln!(f, "bettor             {}", self.bettor)?;
        writeln!(f, "computation_offset {}", self.computation_offset)?;
        writeln!(f)?;
        for (label, address) in &self.accounts.0 {
            writeln!(f, "{label:<18} {address}")?;
        }
        Ok(())
    }
}
