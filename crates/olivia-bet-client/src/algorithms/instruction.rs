//! # Instruction Encoding
//!
//! Program interface (Anchor IDL) loading and construction of the
//! `place_bet` and computation-definition instructions, plus the runtime's
//! `finalize_computation_definition`.
//!
//! ## Wire Format
//!
//! ```text
//! data = discriminator[8] || borsh(args)
//! ```
//!
//! The discriminator comes from the IDL when present, otherwise
//! `sha256("global:<name>")[..8]`.

use std::collections::HashMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use solana_program::instruction::{AccountMeta, Instruction};
use solana_program::pubkey::Pubkey;
use solana_program::system_program;

use super::address::comp_def_offset;
use crate::domain::{
    BetClientError, CircuitName, DerivedAddressSet, EncryptedPrediction, X25519_KEY_LEN,
    CIPHERTEXT_LEN,
};

/// Name of the bet instruction.
pub const PLACE_BET_INSTRUCTION: &str = "place_bet";

/// Runtime instruction that seals a computation definition for execution.
pub const FINALIZE_COMP_DEF_INSTRUCTION: &str = "finalize_computation_definition";

/// Discriminator length in bytes.
pub const DISCRIMINATOR_LEN: usize = 8;

#[derive(Debug, Deserialize)]
struct IdlDocument {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    instructions: Vec<IdlInstruction>,
}

#[derive(Debug, Deserialize)]
struct IdlInstruction {
    name: String,
    #[serde(default)]
    discriminator: Option<Vec<u8>>,
}

/// Instruction names and discriminators of the prediction market program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramInterface {
    address: Option<Pubkey>,
    discriminators: HashMap<String, [u8; DISCRIMINATOR_LEN]>,
}

impl ProgramInterface {
    /// Parse an Anchor IDL document.
    ///
    /// # Errors
    ///
    /// `InvalidInterface` for malformed JSON, a bad discriminator or
    /// address, or a missing `place_bet` instruction.
    pub fn from_idl_json(json: &str) -> Result<Self, BetClientError> {
        let doc: IdlDocument = serde_json::from_str(json)
            .map_err(|e| BetClientError::InvalidInterface(e.to_string()))?;

        let address = doc
            .address
            .as_deref()
            .map(|s| {
                s.parse::<Pubkey>()
                    .map_err(|e| BetClientError::InvalidInterface(format!("address {s}: {e}")))
            })
            .transpose()?;

        let mut discriminators = HashMap::with_capacity(doc.instructions.len());
        for ix in doc.instructions {
            let disc = match ix.discriminator {
                Some(bytes) => <[u8; DISCRIMINATOR_LEN]>::try_from(bytes.as_slice()).map_err(
                    |_| {
                        BetClientError::InvalidInterface(format!(
                            "instruction {} has a {}-byte discriminator",
                            ix.name,
                            bytes.len()
                        ))
                    },
                )?,
                None => anchor_discriminator(&ix.name),
            };
            discriminators.insert(ix.name, disc);
        }

        if !discriminators.contains_key(PLACE_BET_INSTRUCTION) {
            return Err(BetClientError::InvalidInterface(format!(
                "missing instruction {PLACE_BET_INSTRUCTION}"
            )));
        }

        Ok(Self {
            address,
            discriminators,
        })
    }

    /// Interface with derived discriminators for the known instructions.
    pub fn derived(address: Option<Pubkey>) -> Self {
        let names = std::iter::once(PLACE_BET_INSTRUCTION)
            .chain(CircuitName::ALL.iter().map(|c| comp_def_init_instruction(*c)));
        Self {
            address,
            discriminators: names
                .map(|name| (name.to_string(), anchor_discriminator(name)))
                .collect(),
        }
    }

    /// Program address declared by the IDL, if any.
    pub fn address(&self) -> Option<Pubkey> {
        self.address
    }

    /// Discriminator for `name`, falling back to the Anchor derivation.
    pub fn discriminator(&self, name: &str) -> [u8; DISCRIMINATOR_LEN] {
        self.discriminators
            .get(name)
            .copied()
            .unwrap_or_else(|| anchor_discriminator(name))
    }

    /// Whether the IDL declares `name`.
    pub fn has_instruction(&self, name: &str) -> bool {
        self.discriminators.contains_key(name)
    }
}

/// `sha256("global:<name>")[..8]`.
pub fn anchor_discriminator(name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let digest = Sha256::digest(format!("global:{name}").as_bytes());
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    out
}

/// Instruction that creates the computation definition of `circuit`.
pub const fn comp_def_init_instruction(circuit: CircuitName) -> &'static str {
    match circuit {
        CircuitName::InitializeMarket => "init_initialize_market_comp_def",
        CircuitName::PlaceBet => "init_place_bet_comp_def",
        CircuitName::DistributeRewards => "init_distribute_rewards_comp_def",
    }
}

/// Borsh arguments of `place_bet`, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct PlaceBetArgs {
    /// Computation correlation id.
    pub computation_offset: u64,
    /// Target market.
    pub market_id: u64,
    /// Lamports.
    pub amount: u64,
    /// Encrypted prediction element.
    pub encrypted_prediction: [u8; CIPHERTEXT_LEN],
    /// Ephemeral x25519 public key.
    pub pub_key: [u8; X25519_KEY_LEN],
    /// Nonce as a little-endian integer.
    pub nonce: u128,
}

impl PlaceBetArgs {
    /// Arguments for an encrypted prediction.
    pub fn new(
        computation_offset: u64,
        market_id: u64,
        amount: u64,
        encrypted: &EncryptedPrediction,
    ) -> Self {
        Self {
            computation_offset,
            market_id,
            amount,
            encrypted_prediction: *encrypted.ciphertext.as_bytes(),
            pub_key: encrypted.public_key,
            nonce: encrypted.nonce.to_u128_le(),
        }
    }
}

/// Borsh arguments of the runtime's `finalize_computation_definition`.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct FinalizeCompDefArgs {
    /// Circuit offset, see [`comp_def_offset`].
    pub comp_offset: u32,
    /// Program owning the definition.
    pub mxe_program: [u8; 32],
}

/// Builds instructions against one program and one MPC runtime.
#[derive(Debug, Clone)]
pub struct InstructionBuilder {
    program_id: Pubkey,
    arcium_program_id: Pubkey,
    interface: ProgramInterface,
}

impl InstructionBuilder {
    /// Create a builder.
    pub fn new(program_id: Pubkey, arcium_program_id: Pubkey, interface: ProgramInterface) -> Self {
        Self {
            program_id,
            arcium_program_id,
            interface,
        }
    }

    /// Program the instructions target.
    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    /// `place_bet` with the full account list.
    ///
    /// # Errors
    ///
    /// `InvalidInterface` if argument serialization fails.
    pub fn place_bet(
        &self,
        bettor: &Pubkey,
        addresses: &DerivedAddressSet,
        args: &PlaceBetArgs,
    ) -> Result<Instruction, BetClientError> {
        let mut data = self.interface.discriminator(PLACE_BET_INSTRUCTION).to_vec();
        args.serialize(&mut data)
            .map_err(|e| BetClientError::InvalidInterface(e.to_string()))?;

        let accounts = vec![
            AccountMeta::new(*bettor, true),
            AccountMeta::new(addresses.sign_pda, false),
            AccountMeta::new_readonly(addresses.mxe, false),
            AccountMeta::new(addresses.mempool, false),
            AccountMeta::new(addresses.executing_pool, false),
            AccountMeta::new(addresses.computation, false),
            AccountMeta::new_readonly(addresses.comp_def, false),
            AccountMeta::new(addresses.cluster, false),
            AccountMeta::new(addresses.fee_pool, false),
            AccountMeta::new_readonly(addresses.clock, false),
            AccountMeta::new_readonly(system_program::ID, false),
            AccountMeta::new_readonly(self.arcium_program_id, false),
            AccountMeta::new(addresses.market, false),
            AccountMeta::new(addresses.bet, false),
        ];

        Ok(Instruction {
            program_id: self.program_id,
            accounts,
            data,
        })
    }

    /// `init_<circuit>_comp_def`, which takes no arguments.
    pub fn init_comp_def(
        &self,
        circuit: CircuitName,
        payer: &Pubkey,
        mxe: &Pubkey,
        comp_def: &Pubkey,
    ) -> Instruction {
        let data = self
            .interface
            .discriminator(comp_def_init_instruction(circuit))
            .to_vec();

        Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new(*payer, true),
                AccountMeta::new(*mxe, false),
                AccountMeta::new(*comp_def, false),
                AccountMeta::new_readonly(self.arcium_program_id, false),
                AccountMeta::new_readonly(system_program::ID, false),
            ],
            data,
        }
    }

    /// Runtime `finalize_computation_definition` for `circuit`.
    ///
    /// Sent to the MPC runtime, not the market program; the definition
    /// is not executable until this lands.
    ///
    /// # Errors
    ///
    /// `InvalidInterface` if argument serialization fails.
    pub fn finalize_comp_def(
        &self,
        circuit: CircuitName,
        payer: &Pubkey,
        comp_def: &Pubkey,
    ) -> Result<Instruction, BetClientError> {
        let args = FinalizeCompDefArgs {
            comp_offset: comp_def_offset(circuit),
            mxe_program: self.program_id.to_bytes(),
        };
        let mut data = anchor_discriminator(FINALIZE_COMP_DEF_INSTRUCTION).to_vec();
        args.serialize(&mut data)
            .map_err(|e| BetClientError::InvalidInterface(e.to_string()))?;

        Ok(Instruction {
            program_id: self.arcium_program_id,
            accounts: vec![
                AccountMeta::new(*payer, true),
                AccountMeta::new(*comp_def, false),
                AccountMeta::new_readonly(system_program::ID, false),
            ],
            data,
        })
    }
}
