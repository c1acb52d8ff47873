//! # Bet Submission Service
//!
//! Application service orchestrating one confidential bet per user action.
//!
//! ```text
//! preconditions ─► KeyFetcher ─► encrypt ─► offset + addresses ─► submit ─► FinalizationWaiter
//!      │              │             │                │                │              │
//!      └──────────────┴─────────────┴────────────────┴────────────────┴──────────────┴─► StatusBoard
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use solana_program::pubkey::Pubkey;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::addresses::derive_address_set;
use super::finalization::FinalizationWaiter;
use super::key_fetcher::{ClientContext, KeyFetcher};
use super::status_board::{Generation, StatusBoard};
use crate::adapters::ArciumAddressing;
use crate::algorithms::{
    encrypt_prediction, AesCtrCipher, Cipher, InstructionBuilder, OffsetGenerator, PlaceBetArgs,
    ProgramInterface, RandomOffsetGenerator,
};
use crate::config::BetClientConfig;
use crate::domain::{
    invariant_preconditions, BetAmount, BetClientError, BetReceipt, BetRequest, Commitment,
    ErrorKind, StatusReport, SubmissionAttempt, SubmissionStatus,
};
use crate::metrics;
use crate::ports::{
    BetClientApi, ComputationFinalizer, InfrastructureAddresses, MxeKeySource,
    TransactionSubmitter,
};

/// Collaborators of the service.
pub struct BetClientDeps {
    /// MXE key source.
    pub key_source: Arc<dyn MxeKeySource>,
    /// Wallet-backed submission.
    pub submitter: Arc<dyn TransactionSubmitter>,
    /// Computation completion.
    pub finalizer: Arc<dyn ComputationFinalizer>,
    /// MPC runtime address rules.
    pub addresses: Arc<dyn InfrastructureAddresses>,
    /// Cipher shared with the MXE.
    pub cipher: Arc<dyn Cipher>,
    /// Computation offsets.
    pub offsets: Arc<dyn OffsetGenerator>,
}

impl BetClientDeps {
    /// Default cipher, random offsets, and Arcium addressing from `config`.
    pub fn new(
        config: &BetClientConfig,
        key_source: Arc<dyn MxeKeySource>,
        submitter: Arc<dyn TransactionSubmitter>,
        finalizer: Arc<dyn ComputationFinalizer>,
    ) -> Result<Self, BetClientError> {
        Ok(Self {
            key_source,
            submitter,
            finalizer,
            addresses: Arc::new(ArciumAddressing::new(config.arcium_program_pubkey()?)),
            cipher: Arc::new(AesCtrCipher),
            offsets: Arc::new(RandomOffsetGenerator),
        })
    }
}

#[derive(Default)]
struct Session {
    wallet: Option<Pubkey>,
    interface: Option<ProgramInterface>,
}

/// Session state captured once the preconditions hold.
struct Prepared {
    bettor: Pubkey,
    amount: BetAmount,
    interface: ProgramInterface,
}

/// Bet Submission Service - orchestrates encryption, submission and finalization.
pub struct BetSubmissionService {
    context: ClientContext,
    commitment: Commitment,
    session: RwLock<Session>,
    key_fetcher: KeyFetcher,
    waiter: FinalizationWaiter,
    submitter: Arc<dyn TransactionSubmitter>,
    addresses: Arc<dyn InfrastructureAddresses>,
    cipher: Arc<dyn Cipher>,
    offsets: Arc<dyn OffsetGenerator>,
    board: Arc<StatusBoard>,
}

impl BetSubmissionService {
    /// Create a service with no wallet and no interface loaded.
    pub fn new(config: &BetClientConfig, deps: BetClientDeps) -> Result<Self, BetClientError> {
        config.validate()?;
        let context = ClientContext::new(config.program_pubkey()?, config.cluster_offset);
        Ok(Self {
            context,
            commitment: config.commitment,
            session: RwLock::new(Session::default()),
            key_fetcher: KeyFetcher::new(deps.key_source, config.key_fetch.policy()),
            waiter: FinalizationWaiter::new(deps.finalizer, config.finalization_timeout()),
            submitter: deps.submitter,
            addresses: deps.addresses,
            cipher: deps.cipher,
            offsets: deps.offsets,
            board: StatusBoard::new(config.status_reset_delay()),
        })
    }

    /// Session context.
    pub fn context(&self) -> &ClientContext {
        &self.context
    }

    /// Every status report in publication order, for logs and demos.
    pub fn transitions(&self) -> broadcast::Receiver<StatusReport> {
        self.board.transitions()
    }

    /// Set the connected wallet.
    pub fn connect_wallet(&self, wallet: Pubkey) {
        info!(wallet = %wallet, "[bet-client] wallet connected");
        self.session.write().wallet = Some(wallet);
    }

    /// Forget the wallet.
    pub fn disconnect_wallet(&self) {
        self.session.write().wallet = None;
    }

    /// Load the program interface.
    pub fn load_interface(&self, interface: ProgramInterface) {
        if let Some(address) = interface.address() {
            if address != self.context.program_id {
                warn!(
                    idl = %address,
                    configured = %self.context.program_id,
                    "[bet-client] IDL address differs from configured program"
                );
            }
        }
        self.session.write().interface = Some(interface);
    }

    /// Start an attempt in the background.
    pub fn submit(self: &Arc<Self>, request: BetRequest) -> SubmissionHandle {
        let generation = self.board.begin();
        let service = Arc::clone(self);
        let task = tokio::spawn(async move { service.execute(generation, request).await });
        SubmissionHandle {
            generation,
            board: Arc::clone(&self.board),
            task,
        }
    }

    async fn execute(
        &self,
        generation: Generation,
        request: BetRequest,
    ) -> Result<BetReceipt, BetClientError> {
        let prepared = match self.check_preconditions(request.amount_sol) {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!(error = %e, "[bet-client] bet rejected before submission");
                self.fail(generation, None, &e);
                return Err(e);
            }
        };

        let attempt = SubmissionAttempt::new(
            prepared.bettor,
            request.prediction,
            prepared.amount,
            request.market_id,
        );
        let attempt_id = attempt.id;
        match self.run_attempt(generation, attempt, prepared.interface).await {
            Ok(receipt) => {
                metrics::record_bet_outcome("success", "none");
                Ok(receipt)
            }
            Err(e) => {
                self.fail(generation, Some(attempt_id), &e);
                Err(e)
            }
        }
    }

    /// Network, wallet, interface, then amount. No I/O.
    fn check_preconditions(&self, amount_sol: f64) -> Result<Prepared, BetClientError> {
        let session = self.session.read();
        invariant_preconditions(
            self.submitter.is_connected(),
            session.wallet.is_some(),
            session.interface.is_some(),
        )?;
        let amount = BetAmount::from_sol(amount_sol)?;
        match (session.wallet, session.interface.clone()) {
            (Some(bettor), Some(interface)) => Ok(Prepared {
                bettor,
                amount,
                interface,
            }),
            (None, _) => Err(BetClientError::WalletNotConnected),
            (_, None) => Err(BetClientError::InterfaceNotLoaded),
        }
    }

    fn fail(&self, generation: Generation, attempt_id: Option<Uuid>, error: &BetClientError) {
        metrics::record_bet_outcome("error", kind_label(error));
        self.board
            .finish(generation, StatusReport::failed(attempt_id, error));
    }

    fn advance(
        &self,
        generation: Generation,
        attempt: &mut SubmissionAttempt,
        report: StatusReport,
    ) {
        attempt.status = report.status;
        self.board.publish(generation, report);
    }

    async fn run_attempt(
        &self,
        generation: Generation,
        mut attempt: SubmissionAttempt,
        interface: ProgramInterface,
    ) -> Result<BetReceipt, BetClientError> {
        let id = attempt.id;
        debug!(attempt = %id, market_id = %attempt.market_id, "[bet-client] attempt started");

        // encrypting
        self.advance(
            generation,
            &mut attempt,
            StatusReport::progress(id, SubmissionStatus::Encrypting),
        );
        let network_key = self
            .key_fetcher
            .fetch_cached(&self.context)
            .await
            .map_err(as_encryption_failure)?;
        let encrypted = encrypt_prediction(self.cipher.as_ref(), &network_key, attempt.prediction)
            .map_err(as_encryption_failure)?;
        attempt.encrypted = Some(encrypted.clone());

        // signing
        self.advance(
            generation,
            &mut attempt,
            StatusReport::progress(id, SubmissionStatus::Signing),
        );
        let offset = self.offsets.next_offset();
        attempt.computation_offset = Some(offset);
        let addresses = derive_address_set(
            self.addresses.as_ref(),
            &self.context,
            attempt.market_id,
            &attempt.bettor,
            offset,
        )?;
        attempt.addresses = Some(addresses.clone());
        let builder = InstructionBuilder::new(
            self.context.program_id,
            self.addresses.runtime_program_id(),
            interface,
        );
        let args = PlaceBetArgs::new(
            offset.value(),
            attempt.market_id.value(),
            attempt.amount.lamports(),
            &encrypted,
        );
        let instruction = builder.place_bet(&attempt.bettor, &addresses, &args)?;

        // submitting
        self.advance(
            generation,
            &mut attempt,
            StatusReport::progress(id, SubmissionStatus::Submitting),
        );
        let transaction_signature = self
            .submitter
            .submit(instruction, &attempt.bettor, self.commitment)
            .await?;
        metrics::record_bet_submitted();
        info!(
            attempt = %id,
            computation_offset = %offset,
            signature = %transaction_signature,
            "[bet-client] place_bet accepted"
        );
        attempt.transaction_signature = Some(transaction_signature.clone());

        // waiting
        self.advance(
            generation,
            &mut attempt,
            StatusReport::progress(id, SubmissionStatus::Waiting)
                .with_signature(transaction_signature.0.clone()),
        );
        let finalization_signature = self
            .waiter
            .await_finalization(offset, &self.context.program_id, self.commitment)
            .await?;
        attempt.finalization_signature = Some(finalization_signature.clone());

        attempt.status = SubmissionStatus::Success;
        self.board.finish(
            generation,
            StatusReport::progress(id, SubmissionStatus::Success)
                .with_signature(finalization_signature.0.clone()),
        );

        Ok(BetReceipt {
            attempt_id: id,
            market_id: attempt.market_id,
            computation_offset: offset,
            transaction_signature,
            finalization_signature,
            addresses,
        })
    }
}

/// Unusable MXE key material surfaces as an encryption failure, whether it
/// was caught while fetching the key or during agreement.
fn as_encryption_failure(error: BetClientError) -> BetClientError {
    match error {
        BetClientError::KeyAgreementFailure(reason) => BetClientError::EncryptionFailed(reason),
        other => other,
    }
}

fn kind_label(error: &BetClientError) -> &'static str {
    match error.kind() {
        ErrorKind::Precondition => "precondition",
        ErrorKind::TransientInfrastructure => "transient",
        ErrorKind::Cryptographic => "cryptographic",
        ErrorKind::Submission => "submission",
        ErrorKind::Finalization => "finalization",
        ErrorKind::Configuration => "configuration",
    }
}

#[async_trait]
impl BetClientApi for BetSubmissionService {
    async fn place_bet(&self, request: BetRequest) -> Result<BetReceipt, BetClientError> {
        let generation = self.board.begin();
        self.execute(generation, request).await
    }

    fn status(&self) -> StatusReport {
        self.board.current()
    }

    fn subscribe(&self) -> watch::Receiver<StatusReport> {
        self.board.subscribe()
    }

    fn dismiss(&self) {
        self.board.dismiss();
    }
}

/// Handle to a background attempt.
pub struct SubmissionHandle {
    generation: Generation,
    board: Arc<StatusBoard>,
    task: JoinHandle<Result<BetReceipt, BetClientError>>,
}

impl SubmissionHandle {
    /// Stop caring about the attempt.
    ///
    /// The status returns to idle and the result is dropped. A transaction
    /// that already reached the network is not undone.
    pub fn cancel(self) {
        if self.board.cancel(self.generation) {
            info!(generation = self.generation, "[bet-client] attempt cancelled");
        }
        self.task.abort();
    }

    /// Wait for the attempt. `None` if it was aborted.
    pub async fn outcome(self) -> Option<Result<BetReceipt, BetClientError>> {
        self.task.await.ok()
    }
}
