//! # Simulated Network
//!
//! In-process stand-in for the chain and the MPC runtime.
//!
//! Accepts `place_bet`, computation-definition and runtime finalization
//! instructions, tracks the accounts they create, lets an [`InMemoryMxe`] decrypt queued bets, and
//! publishes [`ComputationEvent`]s on a broadcast channel.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use borsh::BorshDeserialize;
use parking_lot::Mutex;
use rand::RngCore;
use solana_program::instruction::Instruction;
use solana_program::pubkey::Pubkey;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::in_memory_mxe::InMemoryMxe;
use crate::algorithms::{
    anchor_discriminator, FinalizeCompDefArgs, PlaceBetArgs, FINALIZE_COMP_DEF_INSTRUCTION,
    PLACE_BET_INSTRUCTION,
};
use crate::domain::{
    BetClientError, Ciphertext, Commitment, ComputationOffset, EncryptedPrediction,
    FinalizationSignature, MarketId, Nonce, SubmissionFailure, TransactionSignature,
};
use crate::ports::{AccountProbe, ComputationFinalizer, TransactionSubmitter};

/// Default capacity of the event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

const PLACE_BET_COMPUTATION_INDEX: usize = 5;
const PLACE_BET_BET_INDEX: usize = 13;
const COMP_DEF_INIT_ACCOUNTS: usize = 5;
const COMP_DEF_INIT_ACCOUNT_INDEX: usize = 2;
const COMP_DEF_FINALIZE_ACCOUNT_INDEX: usize = 1;

/// Lifecycle event of a computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputationEvent {
    /// `place_bet` landed and the computation is queued.
    Queued {
        /// Computation id.
        offset: ComputationOffset,
        /// Queuing transaction.
        signature: TransactionSignature,
    },
    /// Callback landed.
    Finalized {
        /// Computation id.
        offset: ComputationOffset,
        /// Callback transaction.
        signature: FinalizationSignature,
    },
    /// MXE refused the computation.
    Failed {
        /// Computation id.
        offset: ComputationOffset,
        /// Reported reason.
        reason: String,
    },
}

impl ComputationEvent {
    /// Computation the event belongs to.
    pub fn offset(&self) -> ComputationOffset {
        match self {
            Self::Queued { offset, .. }
            | Self::Finalized { offset, .. }
            | Self::Failed { offset, .. } => *offset,
        }
    }
}

/// How queued computations complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizationMode {
    /// Finalize as soon as someone waits.
    Immediate,
    /// Finalize after a delay, or earlier if another waiter finalizes first.
    Delayed(Duration),
    /// Never finalize on its own; waiters only watch the event stream.
    Stalled,
    /// Fail with a reason.
    Rejected(String),
}

/// Encrypted-pool totals as seen by the MXE, in lamports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolTotals {
    /// Stake on YES.
    pub yes: u64,
    /// Stake on NO.
    pub no: u64,
    /// Number of bets.
    pub bets: u64,
}

struct QueuedBet {
    offset: ComputationOffset,
    market_id: MarketId,
    encrypted: EncryptedPrediction,
    amount: u64,
}

#[derive(Default)]
struct NetworkState {
    accounts: HashSet<Pubkey>,
    finalized_comp_defs: HashSet<Pubkey>,
    queued: HashMap<ComputationOffset, MarketId>,
    finalized: HashMap<ComputationOffset, FinalizationSignature>,
    scripted_failures: VecDeque<SubmissionFailure>,
    pools: HashMap<MarketId, PoolTotals>,
    submitted: u64,
}

/// Simulated chain plus MPC runtime.
pub struct SimulatedArciumNetwork {
    state: Mutex<NetworkState>,
    mode: Mutex<FinalizationMode>,
    mxe: Option<Arc<InMemoryMxe>>,
    balance: Option<AtomicU64>,
    connected: AtomicBool,
    place_bet_discriminator: [u8; 8],
    events: broadcast::Sender<ComputationEvent>,
}

impl SimulatedArciumNetwork {
    /// Connected network that finalizes immediately.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Self {
            state: Mutex::new(NetworkState::default()),
            mode: Mutex::new(FinalizationMode::Immediate),
            mxe: None,
            balance: None,
            connected: AtomicBool::new(true),
            place_bet_discriminator: anchor_discriminator(PLACE_BET_INSTRUCTION),
            events,
        }
    }

    /// Decrypt queued bets with `mxe` and tally them.
    pub fn with_mxe(mut self, mxe: Arc<InMemoryMxe>) -> Self {
        self.mxe = Some(mxe);
        self
    }

    /// Limit the payer to `lamports`; bets beyond it fail with insufficient funds.
    pub fn with_balance(mut self, lamports: u64) -> Self {
        self.balance = Some(AtomicU64::new(lamports));
        self
    }

    /// Recognise `place_bet` by a custom discriminator.
    pub fn with_place_bet_discriminator(mut self, discriminator: [u8; 8]) -> Self {
        self.place_bet_discriminator = discriminator;
        self
    }

    /// Change how computations complete.
    pub fn set_finalization_mode(&self, mode: FinalizationMode) {
        *self.mode.lock() = mode;
    }

    /// Toggle the connection.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Fail the next submission with `failure`.
    pub fn fail_next_submission(&self, failure: SubmissionFailure) {
        self.state.lock().scripted_failures.push_back(failure);
    }

    /// Mark an account as existing.
    pub fn insert_account(&self, address: Pubkey) {
        self.state.lock().accounts.insert(address);
    }

    /// Mark a computation definition as existing and finalized.
    pub fn insert_finalized_comp_def(&self, address: Pubkey) {
        let mut state = self.state.lock();
        state.accounts.insert(address);
        state.finalized_comp_defs.insert(address);
    }

    /// Subscribe to computation events.
    pub fn subscribe(&self) -> broadcast::Receiver<ComputationEvent> {
        self.events.subscribe()
    }

    /// Pool totals of a market.
    pub fn pool_totals(&self, market_id: MarketId) -> PoolTotals {
        self.state
            .lock()
            .pools
            .get(&market_id)
            .copied()
            .unwrap_or_default()
    }

    /// Transactions accepted so far.
    pub fn submitted_count(&self) -> u64 {
        self.state.lock().submitted
    }

    fn publish(&self, event: ComputationEvent) {
        match self.events.send(event) {
            Ok(receivers) => debug!(receivers, "[bet-client] computation event published"),
            Err(_) => debug!("[bet-client] computation event dropped, no subscribers"),
        }
    }

    fn random_signature() -> String {
        let mut bytes = [0u8; 64];
        rand::thread_rng().fill_bytes(&mut bytes);
        bs58::encode(bytes).into_string()
    }

    fn accept_place_bet(
        &self,
        instruction: &Instruction,
    ) -> Result<QueuedBet, SubmissionFailure> {
        let args = PlaceBetArgs::try_from_slice(&instruction.data[8..])
            .map_err(|e| SubmissionFailure::SimulationFailure(e.to_string()))?;
        let account = |index: usize| {
            instruction
                .accounts
                .get(index)
                .map(|meta| meta.pubkey)
                .ok_or_else(|| {
                    SubmissionFailure::SimulationFailure(format!("missing account #{index}"))
                })
        };
        let computation = account(PLACE_BET_COMPUTATION_INDEX)?;
        let bet = account(PLACE_BET_BET_INDEX)?;

        let offset = ComputationOffset::new(args.computation_offset);
        let mut state = self.state.lock();
        if state.accounts.contains(&computation) || state.accounts.contains(&bet) {
            return Err(SubmissionFailure::AccountAlreadyInUse);
        }
        if let Some(balance) = &self.balance {
            balance
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |b| b.checked_sub(args.amount))
                .map_err(|_| SubmissionFailure::InsufficientFunds)?;
        }
        state.accounts.insert(computation);
        state.accounts.insert(bet);
        let market_id = MarketId::new(args.market_id);
        state.queued.insert(offset, market_id);
        state.submitted += 1;

        let encrypted = EncryptedPrediction {
            ciphertext: Ciphertext::from_bytes(args.encrypted_prediction),
            public_key: args.pub_key,
            nonce: Nonce::from_bytes(args.nonce.to_le_bytes()),
        };
        Ok(QueuedBet {
            offset,
            market_id,
            encrypted,
            amount: args.amount,
        })
    }

    fn accept_comp_def_init(&self, instruction: &Instruction) -> Result<(), SubmissionFailure> {
        let comp_def = instruction.accounts[COMP_DEF_INIT_ACCOUNT_INDEX].pubkey;
        let mut state = self.state.lock();
        if !state.accounts.insert(comp_def) {
            return Err(SubmissionFailure::AccountAlreadyInUse);
        }
        state.submitted += 1;
        Ok(())
    }

    fn accept_comp_def_finalize(&self, instruction: &Instruction) -> Result<(), SubmissionFailure> {
        let args = FinalizeCompDefArgs::try_from_slice(&instruction.data[8..])
            .map_err(|e| SubmissionFailure::SimulationFailure(e.to_string()))?;
        let comp_def = instruction
            .accounts
            .get(COMP_DEF_FINALIZE_ACCOUNT_INDEX)
            .map(|meta| meta.pubkey)
            .ok_or_else(|| SubmissionFailure::SimulationFailure("missing comp def".to_string()))?;

        let mut state = self.state.lock();
        if !state.accounts.contains(&comp_def) {
            return Err(SubmissionFailure::SimulationFailure(format!(
                "computation definition {comp_def} not initialized"
            )));
        }
        if !state.finalized_comp_defs.insert(comp_def) {
            return Err(SubmissionFailure::Rejected(
                "computation definition already finalized".to_string(),
            ));
        }
        state.submitted += 1;
        debug!(comp_offset = args.comp_offset, "[bet-client] comp def finalized");
        Ok(())
    }

    fn tally(&self, market_id: MarketId, encrypted: &EncryptedPrediction, amount: u64) {
        let Some(mxe) = &self.mxe else {
            return;
        };
        match mxe.decrypt_prediction(encrypted) {
            Ok(prediction) => {
                let mut state = self.state.lock();
                let pool = state.pools.entry(market_id).or_default();
                if prediction.outcome() {
                    pool.yes += amount;
                } else {
                    pool.no += amount;
                }
                pool.bets += 1;
            }
            Err(e) => warn!(market_id = %market_id, error = %e, "[bet-client] MXE could not decrypt bet"),
        }
    }

    /// First terminal event for `offset` on the stream.
    async fn watch_for(
        events: &mut broadcast::Receiver<ComputationEvent>,
        offset: ComputationOffset,
    ) -> Result<FinalizationSignature, BetClientError> {
        loop {
            match events.recv().await {
                Ok(ComputationEvent::Finalized { offset: o, signature }) if o == offset => {
                    return Ok(signature)
                }
                Ok(ComputationEvent::Failed { offset: o, reason }) if o == offset => {
                    return Err(BetClientError::FinalizationRejected { offset, reason })
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "[bet-client] computation event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(BetClientError::Rpc("computation event stream closed".to_string()))
                }
            }
        }
    }

    fn finalize(&self, offset: ComputationOffset) -> FinalizationSignature {
        let signature = {
            let mut state = self.state.lock();
            state
                .finalized
                .entry(offset)
                .or_insert_with(|| FinalizationSignature(Self::random_signature()))
                .clone()
        };
        self.publish(ComputationEvent::Finalized {
            offset,
            signature: signature.clone(),
        });
        signature
    }
}

impl Default for SimulatedArciumNetwork {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionSubmitter for SimulatedArciumNetwork {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn submit(
        &self,
        instruction: Instruction,
        _payer: &Pubkey,
        _commitment: Commitment,
    ) -> Result<TransactionSignature, SubmissionFailure> {
        if !self.is_connected() {
            return Err(SubmissionFailure::Rejected("network unreachable".to_string()));
        }
        if let Some(failure) = self.state.lock().scripted_failures.pop_front() {
            return Err(failure);
        }

        let signature = TransactionSignature(Self::random_signature());
        if instruction.data.starts_with(&self.place_bet_discriminator) {
            let bet = self.accept_place_bet(&instruction)?;
            self.tally(bet.market_id, &bet.encrypted, bet.amount);
            self.publish(ComputationEvent::Queued {
                offset: bet.offset,
                signature: signature.clone(),
            });
        } else if instruction
            .data
            .starts_with(&anchor_discriminator(FINALIZE_COMP_DEF_INSTRUCTION))
        {
            self.accept_comp_def_finalize(&instruction)?;
        } else if instruction.accounts.len() == COMP_DEF_INIT_ACCOUNTS {
            self.accept_comp_def_init(&instruction)?;
        } else {
            return Err(SubmissionFailure::SimulationFailure(
                "unknown instruction".to_string(),
            ));
        }
        Ok(signature)
    }
}

#[async_trait]
impl ComputationFinalizer for SimulatedArciumNetwork {
    async fn await_finalization(
        &self,
        offset: ComputationOffset,
        _program_id: &Pubkey,
        _commitment: Commitment,
    ) -> Result<FinalizationSignature, BetClientError> {
        let mut events = self.subscribe();
        if let Some(signature) = self.state.lock().finalized.get(&offset) {
            return Ok(signature.clone());
        }
        if !self.state.lock().queued.contains_key(&offset) {
            return Err(BetClientError::FinalizationRejected {
                offset,
                reason: "unknown computation".to_string(),
            });
        }

        let mode = self.mode.lock().clone();
        match mode {
            FinalizationMode::Immediate => Ok(self.finalize(offset)),
            FinalizationMode::Delayed(delay) => {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => Ok(self.finalize(offset)),
                    outcome = Self::watch_for(&mut events, offset) => outcome,
                }
            }
            FinalizationMode::Stalled => Self::watch_for(&mut events, offset).await,
            FinalizationMode::Rejected(reason) => {
                self.publish(ComputationEvent::Failed {
                    offset,
                    reason: reason.clone(),
                });
                Err(BetClientError::FinalizationRejected { offset, reason })
            }
        }
    }
}

#[async_trait]
impl AccountProbe for SimulatedArciumNetwork {
    async fn account_exists(&self, address: &Pubkey) -> Result<bool, BetClientError> {
        if !self.is_connected() {
            return Err(BetClientError::Rpc("network unreachable".to_string()));
        }
        Ok(self.state.lock().accounts.contains(address))
    }

    async fn comp_def_finalized(&self, address: &Pubkey) -> Result<Option<bool>, BetClientError> {
        if !self.is_connected() {
            return Err(BetClientError::Rpc("network unreachable".to_string()));
        }
        Ok(Some(self.state.lock().finalized_comp_defs.contains(address)))
    }
}
