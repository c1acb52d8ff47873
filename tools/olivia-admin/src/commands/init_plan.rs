//! `init-plan`: what an idempotent initialization would do, without doing it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use olivia_bet_client::domain::TransactionSignature;
use olivia_bet_client::{
    AccountProbe, ArciumAddressing, BetClientConfig, ClientContext, Commitment,
    InfrastructureInitializer, MarketId, ProgramInterface, RpcAccountProbe, SubmissionFailure,
    TransactionSubmitter,
};
use serde::Serialize;
use solana_program::instruction::Instruction;
use solana_program::pubkey::Pubkey;

use crate::AdminError;

/// Planned step for one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    /// Exists; nothing to do.
    Skip,
    /// Missing; the initializer would create and finalize it.
    Create,
    /// Created but not finalized; the initializer would finalize it.
    Finalize,
    /// Missing and created elsewhere; must exist first.
    Prerequisite,
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Skip => "skip",
            Self::Create => "create",
            Self::Finalize => "finalize",
            Self::Prerequisite => "prerequisite",
        })
    }
}

/// One planned account.
#[derive(Debug, Clone, Serialize)]
pub struct PlanRow {
    /// Account kind.
    pub target: String,
    /// Base58 address.
    pub address: String,
    /// What would happen.
    pub action: PlanAction,
}

/// Result of `init-plan`.
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    /// Accounts in plan order.
    pub rows: Vec<PlanRow>,
}

impl PlanReport {
    /// Accounts the initializer would create.
    pub fn pending_creations(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.action == PlanAction::Create)
            .count()
    }

    /// Existing definitions the initializer would finalize.
    pub fn pending_finalizations(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.action == PlanAction::Finalize)
            .count()
    }
}

/// Refuses every submission; plans never send transactions.
struct DryRunSubmitter;

#[async_trait]
impl TransactionSubmitter for DryRunSubmitter {
    async fn submit(
        &self,
        _instruction: Instruction,
        _payer: &Pubkey,
        _commitment: Commitment,
    ) -> Result<TransactionSignature, SubmissionFailure> {
        Err(SubmissionFailure::Rejected(
            "dry run: init-plan never submits".to_string(),
        ))
    }
}

/// Build the plan against any account probe.
pub async fn plan_with(
    probe: Arc<dyn AccountProbe>,
    config: &BetClientConfig,
    markets: &[MarketId],
) -> Result<PlanReport, AdminError> {
    let program = config.program_pubkey()?;
    let initializer = InfrastructureInitializer::new(
        probe,
        Arc::new(DryRunSubmitter),
        Arc::new(ArciumAddressing::new(config.arcium_program_pubkey()?)),
        ClientContext::new(program, config.cluster_offset),
        ProgramInterface::derived(Some(program)),
        config.commitment,
    );

    let rows = initializer
        .plan(markets)
        .await?
        .into_iter()
        .map(|entry| PlanRow {
            target: entry.target.to_string(),
            address: entry.address.to_string(),
            action: match (entry.exists, entry.creatable) {
                (true, _) if entry.needs_finalization() => PlanAction::Finalize,
                (true, _) => PlanAction::Skip,
                (false, true) => PlanAction::Create,
                (false, false) => PlanAction::Prerequisite,
            },
        })
        .collect();
    Ok(PlanReport { rows })
}

/// Build the plan against `config.rpc_url`.
pub async fn run_init_plan(
    config: &BetClientConfig,
    markets: &[MarketId],
) -> Result<PlanReport, AdminError> {
    let probe = RpcAccountProbe::new(config.rpc_url.clone(), config.commitment)?;
    plan_with(Arc::new(probe), config, markets).await
}

impl fmt::Display for PlanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            writeln!(f, "{:<13} {:<34} {}", row.action, row.target, row.address)?;
        }
        write!(
            f,
            "{} account(s) to create, {} to finalize",
            self.pending_creations(),
            self.pending_finalizations()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use olivia_bet_client::{
        comp_def_offset, CircuitName, InfrastructureAccount, InfrastructureAddresses,
        SimulatedArciumNetwork,
    };

    #[tokio::test]
    async fn test_fresh_deployment_plan() {
        let config = BetClientConfig::default();
        let network = Arc::new(SimulatedArciumNetwork::new());
        let plan = plan_with(network, &config, &[MarketId::new(5)]).await.unwrap();

        assert_eq!(plan.rows[0].target, "mxe");
        assert_eq!(plan.rows[0].action, PlanAction::Prerequisite);
        assert_eq!(plan.pending_creations(), 3);
        assert_eq!(plan.rows[4].action, PlanAction::Prerequisite);
    }

    #[tokio::test]
    async fn test_existing_accounts_skipped() {
        let config = BetClientConfig::default();
        let network = Arc::new(SimulatedArciumNetwork::new());
        let runtime = ArciumAddressing::new(config.arcium_program_pubkey().unwrap());
        let mxe = runtime
            .address_of(&config.program_pubkey().unwrap(), InfrastructureAccount::Mxe)
            .unwrap();
        network.insert_account(mxe);

        let plan = plan_with(network, &config, &[]).await.unwrap();
        assert_eq!(plan.rows[0].action, PlanAction::Skip);
        assert!(plan.to_string().ends_with("3 account(s) to create, 0 to finalize"));
    }

    #[tokio::test]
    async fn test_unfinalized_comp_def_planned_for_finalization() {
        let config = BetClientConfig::default();
        let network = Arc::new(SimulatedArciumNetwork::new());
        let program = config.program_pubkey().unwrap();
        let runtime = ArciumAddressing::new(config.arcium_program_pubkey().unwrap());
        network.insert_account(runtime.address_of(&program, InfrastructureAccount::Mxe).unwrap());
        let place_bet = runtime
            .address_of(
                &program,
                InfrastructureAccount::ComputationDefinition(comp_def_offset(CircuitName::PlaceBet)),
            )
            .unwrap();
        network.insert_account(place_bet);

        let plan = plan_with(network, &config, &[]).await.unwrap();
        let row = plan.rows.iter().find(|r| r.address == place_bet.to_string()).unwrap();
        assert_eq!(row.action, PlanAction::Finalize);
        assert_eq!(plan.pending_creations(), 2);
        assert_eq!(plan.pending_finalizations(), 1);
    }
}
