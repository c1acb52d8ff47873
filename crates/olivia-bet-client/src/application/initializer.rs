//! # Infrastructure Initializer
//!
//! Idempotent setup of the accounts a bet depends on.
//!
//! Every creation instruction is preceded by an existence probe, so running
//! the initializer twice is harmless. A computation definition is only usable
//! once the runtime has finalized it, so creation is followed by
//! finalization, and a definition left unfinalized by an earlier run is
//! finalized on the next one. The MXE and markets are only probed:
//! the MXE is created by the MPC runtime tooling and markets by the market
//! creation flow.

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use solana_program::pubkey::Pubkey;
use tracing::{info, warn};

use super::key_fetcher::ClientContext;
use crate::algorithms::{
    comp_def_offset, derive_market_address, InstructionBuilder, ProgramInterface,
};
use crate::domain::{
    BetClientError, CircuitName, Commitment, MarketId, SubmissionFailure, TransactionSignature,
};
use crate::ports::{
    AccountProbe, InfrastructureAccount, InfrastructureAddresses, TransactionSubmitter,
};

/// Account the initializer cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum InitTarget {
    /// MXE account of the program.
    Mxe,
    /// Computation definition of a circuit.
    CompDef(CircuitName),
    /// Market account.
    Market(MarketId),
}

impl fmt::Display for InitTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mxe => f.write_str("mxe"),
            Self::CompDef(circuit) => write!(f, "comp_def:{circuit}"),
            Self::Market(id) => write!(f, "market:{id}"),
        }
    }
}

/// Result of initializing one computation definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    /// Created by this run, then finalized.
    Created {
        /// `init_<circuit>_comp_def` transaction.
        init: TransactionSignature,
        /// Finalization transaction; `None` if another run finalized first.
        finalize: Option<TransactionSignature>,
    },
    /// Present but unfinalized; finalized by this run.
    Finalized(TransactionSignature),
    /// Present and finalized, or its state is unreadable; nothing sent.
    AlreadyInitialized,
}

/// One line of an initialization plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    /// What the account is.
    pub target: InitTarget,
    /// Where it lives.
    #[serde(serialize_with = "serialize_pubkey")]
    pub address: Pubkey,
    /// Whether it exists already.
    pub exists: bool,
    /// Whether this initializer can create it.
    pub creatable: bool,
    /// Finalization state of an existing computation definition, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalized: Option<bool>,
}

impl PlanEntry {
    /// Exists but the runtime has not finalized it yet.
    pub fn needs_finalization(&self) -> bool {
        self.exists && self.finalized == Some(false)
    }
}

fn serialize_pubkey<S: serde::Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(key)
}

/// Creates missing computation definitions and reports the rest.
pub struct InfrastructureInitializer {
    probe: Arc<dyn AccountProbe>,
    submitter: Arc<dyn TransactionSubmitter>,
    addresses: Arc<dyn InfrastructureAddresses>,
    builder: InstructionBuilder,
    context: ClientContext,
    commitment: Commitment,
}

impl InfrastructureInitializer {
    /// Create an initializer for the program in `context`.
    pub fn new(
        probe: Arc<dyn AccountProbe>,
        submitter: Arc<dyn TransactionSubmitter>,
        addresses: Arc<dyn InfrastructureAddresses>,
        context: ClientContext,
        interface: ProgramInterface,
        commitment: Commitment,
    ) -> Self {
        let builder = InstructionBuilder::new(
            context.program_id,
            addresses.runtime_program_id(),
            interface,
        );
        Self {
            probe,
            submitter,
            addresses,
            builder,
            context,
            commitment,
        }
    }

    fn address_of(&self, target: InitTarget) -> Result<Pubkey, BetClientError> {
        let program = &self.context.program_id;
        match target {
            InitTarget::Mxe => self.addresses.address_of(program, InfrastructureAccount::Mxe),
            InitTarget::CompDef(circuit) => self.addresses.address_of(
                program,
                InfrastructureAccount::ComputationDefinition(comp_def_offset(circuit)),
            ),
            InitTarget::Market(id) => derive_market_address(program, id),
        }
    }

    /// Probe the MXE, every comp-def and `markets` without sending anything.
    pub async fn plan(&self, markets: &[MarketId]) -> Result<Vec<PlanEntry>, BetClientError> {
        let targets = std::iter::once(InitTarget::Mxe)
            .chain(CircuitName::ALL.iter().map(|c| InitTarget::CompDef(*c)))
            .chain(markets.iter().map(|m| InitTarget::Market(*m)));

        let mut plan = Vec::new();
        for target in targets {
            let address = self.address_of(target)?;
            let exists = self.probe.account_exists(&address).await?;
            let is_comp_def = matches!(target, InitTarget::CompDef(_));
            let finalized = if is_comp_def && exists {
                self.probe.comp_def_finalized(&address).await?
            } else {
                None
            };
            plan.push(PlanEntry {
                target,
                address,
                exists,
                creatable: is_comp_def,
                finalized,
            });
        }
        Ok(plan)
    }

    /// Create and finalize the computation definition of `circuit`,
    /// skipping whatever is already done.
    ///
    /// # Errors
    ///
    /// `Config` if the MXE account is missing, since the definition
    /// cannot be created without it. Submission failures other than a
    /// concurrent creation or finalization are returned as-is.
    pub async fn init_comp_def(
        &self,
        circuit: CircuitName,
        payer: &Pubkey,
    ) -> Result<InitOutcome, BetClientError> {
        let comp_def = self.address_of(InitTarget::CompDef(circuit))?;
        if self.probe.account_exists(&comp_def).await? {
            return self.settle_existing(circuit, payer, &comp_def).await;
        }

        let mxe = self.address_of(InitTarget::Mxe)?;
        if !self.probe.account_exists(&mxe).await? {
            return Err(BetClientError::Config(format!(
                "MXE account {mxe} does not exist; deploy the MXE before initializing {circuit}"
            )));
        }

        let instruction = self.builder.init_comp_def(circuit, payer, &mxe, &comp_def);
        let init = match self.submitter.submit(instruction, payer, self.commitment).await {
            Ok(signature) => {
                info!(
                    circuit = %circuit,
                    signature = %signature,
                    "[bet-client] comp def initialized"
                );
                signature
            }
            Err(SubmissionFailure::AccountAlreadyInUse) => {
                if !self.probe.account_exists(&comp_def).await? {
                    return Err(SubmissionFailure::AccountAlreadyInUse.into());
                }
                info!(circuit = %circuit, "[bet-client] comp def created concurrently");
                return self.settle_existing(circuit, payer, &comp_def).await;
            }
            Err(e) => {
                warn!(circuit = %circuit, error = %e, "[bet-client] comp def initialization failed");
                return Err(e.into());
            }
        };

        let finalize = self.finalize(circuit, payer, &comp_def).await?;
        Ok(InitOutcome::Created { init, finalize })
    }

    async fn settle_existing(
        &self,
        circuit: CircuitName,
        payer: &Pubkey,
        comp_def: &Pubkey,
    ) -> Result<InitOutcome, BetClientError> {
        match self.probe.comp_def_finalized(comp_def).await? {
            Some(false) => {
                info!(circuit = %circuit, "[bet-client] comp def exists but is not finalized");
                Ok(match self.finalize(circuit, payer, comp_def).await? {
                    Some(signature) => InitOutcome::Finalized(signature),
                    None => InitOutcome::AlreadyInitialized,
                })
            }
            finalized => {
                info!(
                    circuit = %circuit,
                    address = %comp_def,
                    finalized = ?finalized,
                    "[bet-client] comp def already initialized"
                );
                Ok(InitOutcome::AlreadyInitialized)
            }
        }
    }

    /// `None` when the submission failed because someone else finalized first.
    async fn finalize(
        &self,
        circuit: CircuitName,
        payer: &Pubkey,
        comp_def: &Pubkey,
    ) -> Result<Option<TransactionSignature>, BetClientError> {
        let instruction = self.builder.finalize_comp_def(circuit, payer, comp_def)?;
        match self.submitter.submit(instruction, payer, self.commitment).await {
            Ok(signature) => {
                info!(
                    circuit = %circuit,
                    signature = %signature,
                    "[bet-client] comp def finalized"
                );
                Ok(Some(signature))
            }
            Err(e) => {
                if self.probe.comp_def_finalized(comp_def).await? == Some(true) {
                    info!(circuit = %circuit, "[bet-client] comp def finalized concurrently");
                    return Ok(None);
                }
                warn!(circuit = %circuit, error = %e, "[bet-client] comp def finalization failed");
                Err(e.into())
            }
        }
    }

    /// Initialize every circuit concurrently.
    pub async fn init_all_comp_defs(
        &self,
        payer: &Pubkey,
    ) -> Vec<(CircuitName, Result<InitOutcome, BetClientError>)> {
        let results = join_all(
            CircuitName::ALL
                .iter()
                .map(|circuit| self.init_comp_def(*circuit, payer)),
        )
        .await;
        CircuitName::ALL.iter().copied().zip(results).collect()
    }
}
