//! Seed layout of the Arcium runtime accounts.

use std::str::FromStr;

use solana_program::pubkey::Pubkey;

use crate::algorithms::find_address;
use crate::domain::BetClientError;
use crate::ports::{InfrastructureAccount, InfrastructureAddresses};

/// Default Arcium program id.
pub const DEFAULT_ARCIUM_PROGRAM_ID: &str = "BKck65TgoKRokMjQM3datB9oRwJ8rAj2jxPXvHXUvcL6";

const MXE_SEED: &[u8] = b"MXEAccount";
const MEMPOOL_SEED: &[u8] = b"Mempool";
const EXECPOOL_SEED: &[u8] = b"Execpool";
const COMPUTATION_SEED: &[u8] = b"ComputationAccount";
const COMP_DEF_SEED: &[u8] = b"ComputationDefinitionAccount";
const CLUSTER_SEED: &[u8] = b"Cluster";
const FEE_POOL_SEED: &[u8] = b"FeePool";
const CLOCK_SEED: &[u8] = b"ClockAccount";
const SIGNER_SEED: &[u8] = b"SignerAccount";

/// Derives runtime accounts with the Arcium seed table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArciumAddressing {
    runtime_program_id: Pubkey,
}

impl ArciumAddressing {
    /// Addressing under a specific runtime program.
    pub fn new(runtime_program_id: Pubkey) -> Self {
        Self { runtime_program_id }
    }

    /// Addressing from a base58 runtime program id.
    pub fn from_base58(program_id: &str) -> Result<Self, BetClientError> {
        Pubkey::from_str(program_id)
            .map(Self::new)
            .map_err(|e| BetClientError::Config(format!("arcium_program_id: {e}")))
    }
}

impl Default for ArciumAddressing {
    fn default() -> Self {
        // Constant is a valid base58 key.
        Self::new(Pubkey::from_str(DEFAULT_ARCIUM_PROGRAM_ID).unwrap_or_default())
    }
}

impl InfrastructureAddresses for ArciumAddressing {
    fn runtime_program_id(&self) -> Pubkey {
        self.runtime_program_id
    }

    fn address_of(
        &self,
        program_id: &Pubkey,
        account: InfrastructureAccount,
    ) -> Result<Pubkey, BetClientError> {
        let runtime = &self.runtime_program_id;
        let program = program_id.as_ref();
        match account {
            InfrastructureAccount::Mxe => find_address(&[MXE_SEED, program], runtime, "mxe"),
            InfrastructureAccount::Mempool => {
                find_address(&[MEMPOOL_SEED, program], runtime, "mempool")
            }
            InfrastructureAccount::ExecutingPool => {
                find_address(&[EXECPOOL_SEED, program], runtime, "executing_pool")
            }
            InfrastructureAccount::Computation(offset) => find_address(
                &[COMPUTATION_SEED, program, &offset.to_le_bytes()],
                runtime,
                "computation",
            ),
            InfrastructureAccount::ComputationDefinition(offset) => find_address(
                &[COMP_DEF_SEED, program, &offset.to_le_bytes()],
                runtime,
                "comp_def",
            ),
            InfrastructureAccount::Cluster(offset) => {
                find_address(&[CLUSTER_SEED, &offset.to_le_bytes()], runtime, "cluster")
            }
            InfrastructureAccount::FeePool => find_address(&[FEE_POOL_SEED], runtime, "fee_pool"),
            InfrastructureAccount::Clock => find_address(&[CLOCK_SEED], runtime, "clock"),
            InfrastructureAccount::Signer => find_address(&[SIGNER_SEED], program_id, "sign_pda"),
        }
    }
}
