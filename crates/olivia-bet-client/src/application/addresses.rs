//! Assembly of the full account set for one bet.

use solana_program::pubkey::Pubkey;

use super::key_fetcher::ClientContext;
use crate::algorithms::{comp_def_offset, derive_bet_address, derive_market_address};
use crate::domain::{BetClientError, CircuitName, ComputationOffset, DerivedAddressSet, MarketId};
use crate::ports::{InfrastructureAccount, InfrastructureAddresses};

/// Every address `place_bet` needs. Pure: no network access.
pub fn derive_address_set(
    infra: &dyn InfrastructureAddresses,
    context: &ClientContext,
    market_id: MarketId,
    bettor: &Pubkey,
    offset: ComputationOffset,
) -> Result<DerivedAddressSet, BetClientError> {
    let program = &context.program_id;
    let runtime = |account| infra.address_of(program, account);

    Ok(DerivedAddressSet {
        market: derive_market_address(program, market_id)?,
        bet: derive_bet_address(program, market_id, bettor)?,
        sign_pda: runtime(InfrastructureAccount::Signer)?,
        mxe: runtime(InfrastructureAccount::Mxe)?,
        mempool: runtime(InfrastructureAccount::Mempool)?,
        executing_pool: runtime(InfrastructureAccount::ExecutingPool)?,
        computation: runtime(InfrastructureAccount::Computation(offset))?,
        comp_def: runtime(InfrastructureAccount::ComputationDefinition(comp_def_offset(
            CircuitName::PlaceBet,
        )))?,
        cluster: runtime(InfrastructureAccount::Cluster(context.cluster_offset))?,
        fee_pool: runtime(InfrastructureAccount::FeePool)?,
        clock: runtime(InfrastructureAccount::Clock)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ArciumAddressing;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_address_set_is_deterministic(market in any::<u64>(), offset in any::<u64>(), bettor in any::<[u8; 32]>()) {
            let infra = ArciumAddressing::default();
            let context = ClientContext::new(Pubkey::new_from_array([9; 32]), 0);
            let bettor = Pubkey::new_from_array(bettor);
            let a = derive_address_set(&infra, &context, MarketId::new(market), &bettor, ComputationOffset::new(offset)).unwrap();
            let b = derive_address_set(&infra, &context, MarketId::new(market), &bettor, ComputationOffset::new(offset)).unwrap();
            prop_assert_eq!(a, b);
        }
    }

    #[test]
    fn test_cluster_offset_changes_cluster_only() {
        let infra = ArciumAddressing::default();
        let program = Pubkey::new_unique();
        let bettor = Pubkey::new_unique();
        let a = derive_address_set(
            &infra,
            &ClientContext::new(program, 0),
            MarketId::new(1),
            &bettor,
            ComputationOffset::new(1),
        )
        .unwrap();
        let b = derive_address_set(
            &infra,
            &ClientContext::new(program, 1),
            MarketId::new(1),
            &bettor,
            ComputationOffset::new(1),
        )
        .unwrap();
        assert_ne!(a.cluster, b.cluster);
        assert_eq!(a.mxe, b.mxe);
        assert_eq!(a.bet, b.bet);
    }
}
