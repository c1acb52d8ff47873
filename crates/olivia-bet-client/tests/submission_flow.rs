//! # Submission Flow Tests
//!
//! End-to-end runs of the bet client against the simulated network.
//!
//! ## Test Categories
//!
//! 1. **Happy path** - encryption, derivation, submission, finalization
//! 2. **Key fetch** - bounded retry against a slow MXE
//! 3. **Finalization** - timeout and rejection bounds
//! 4. **Preconditions** - nothing leaves the client when a precondition fails
//! 5. **Status object** - transitions, auto-reset, cancellation

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use olivia_bet_client::domain::FinalizationSignature;
use olivia_bet_client::ports::MockKeySource;
use olivia_bet_client::{
    BetClientApi, BetClientConfig, BetClientDeps, BetClientError, BetRequest,
    BetSubmissionService, Commitment, ComputationFinalizer, ComputationOffset, FinalizationMode,
    InMemoryMxe, MarketId, MxeKeySource, NetworkPublicKey, Prediction, ProgramInterface,
    SimulatedArciumNetwork, StatusReport, SubmissionFailure, SubmissionStatus, LAMPORTS_PER_SOL,
};
use solana_program::pubkey::Pubkey;
use tokio::sync::broadcast;
use tokio::time::Instant;

// =============================================================================
// TEST HELPERS
// =============================================================================

struct Harness {
    network: Arc<SimulatedArciumNetwork>,
    mxe: Arc<InMemoryMxe>,
    service: Arc<BetSubmissionService>,
    bettor: Pubkey,
}

fn harness_with(config: BetClientConfig, mxe: InMemoryMxe) -> Harness {
    let mxe = Arc::new(mxe);
    let network = Arc::new(SimulatedArciumNetwork::new().with_mxe(mxe.clone()));
    let deps = BetClientDeps::new(&config, mxe.clone(), network.clone(), network.clone()).unwrap();
    let service = Arc::new(BetSubmissionService::new(&config, deps).unwrap());
    let bettor = Pubkey::new_unique();
    service.connect_wallet(bettor);
    service.load_interface(ProgramInterface::derived(None));
    Harness {
        network,
        mxe,
        service,
        bettor,
    }
}

fn harness() -> Harness {
    harness_with(BetClientConfig::for_testing(), InMemoryMxe::new())
}

fn request(prediction: bool, amount_sol: f64, market_id: u64) -> BetRequest {
    BetRequest {
        prediction: Prediction::new(prediction),
        amount_sol,
        market_id: MarketId::new(market_id),
    }
}

fn drain(log: &mut broadcast::Receiver<StatusReport>) -> Vec<SubmissionStatus> {
    let mut seen = Vec::new();
    while let Ok(report) = log.try_recv() {
        seen.push(report.status);
    }
    seen
}

// =============================================================================
// HAPPY PATH
// =============================================================================

#[tokio::test]
async fn test_bet_reaches_success_and_is_tallied_by_mxe() {
    let h = harness();
    let mut log = h.service.transitions();

    let receipt = h.service.place_bet(request(true, 1.5, 42)).await.unwrap();

    assert_eq!(
        drain(&mut log),
        vec![
            SubmissionStatus::Encrypting,
            SubmissionStatus::Signing,
            SubmissionStatus::Submitting,
            SubmissionStatus::Waiting,
            SubmissionStatus::Success,
        ]
    );
    let status = h.service.status();
    assert_eq!(status.status, SubmissionStatus::Success);
    assert_eq!(status.message, "Bet placed successfully!");
    assert_eq!(status.signature.as_deref(), Some(receipt.finalization_signature.0.as_str()));

    let pool = h.network.pool_totals(MarketId::new(42));
    assert_eq!(pool.yes, 3 * LAMPORTS_PER_SOL / 2);
    assert_eq!(pool.no, 0);
    assert_eq!(pool.bets, 1);
}

#[tokio::test]
async fn test_bet_address_matches_independent_derivation() {
    let h = harness();
    let receipt = h.service.place_bet(request(true, 1.5, 42)).await.unwrap();

    let program = h.service.context().program_id;
    let (expected, _) = Pubkey::find_program_address(
        &[b"bet", &42u64.to_le_bytes(), h.bettor.as_ref()],
        &program,
    );
    assert_eq!(receipt.addresses.bet, expected);
    let (market, _) = Pubkey::find_program_address(&[b"market", &42u64.to_le_bytes()], &program);
    assert_eq!(receipt.addresses.market, market);
}

#[tokio::test]
async fn test_no_bets_land_in_the_no_pool() {
    let h = harness();
    h.service.place_bet(request(false, 0.25, 7)).await.unwrap();
    let pool = h.network.pool_totals(MarketId::new(7));
    assert_eq!(pool.yes, 0);
    assert_eq!(pool.no, LAMPORTS_PER_SOL / 4);
}

#[tokio::test]
async fn test_mxe_key_fetched_once_per_session() {
    let h = harness();
    h.service.place_bet(request(true, 1.0, 1)).await.unwrap();
    h.service.place_bet(request(true, 1.0, 2)).await.unwrap();
    assert_eq!(h.mxe.fetch_count(), 1);
    assert_eq!(h.network.submitted_count(), 2);
}

// =============================================================================
// KEY FETCH
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_key_available_on_third_attempt() {
    let config = BetClientConfig::for_testing();
    let delay = Duration::from_millis(config.key_fetch.retry_delay_ms);
    let h = harness_with(config, InMemoryMxe::new().with_unpublished_fetches(2));

    let start = Instant::now();
    h.service.place_bet(request(true, 1.0, 3)).await.unwrap();

    assert_eq!(h.mxe.fetch_count(), 3);
    assert!(start.elapsed() >= delay * 2);
    assert!(start.elapsed() < delay * 3);
}

#[tokio::test(start_paused = true)]
async fn test_key_never_published_fails_before_submission() {
    let config = BetClientConfig::for_testing();
    let max = config.key_fetch.max_retries;
    let h = harness_with(config, InMemoryMxe::new().with_unpublished_fetches(u32::MAX));

    let result = h.service.place_bet(request(true, 1.0, 3)).await;

    assert!(matches!(result, Err(BetClientError::KeyUnavailable { attempts }) if attempts == max));
    assert_eq!(h.mxe.fetch_count(), max);
    assert_eq!(h.network.submitted_count(), 0);
    assert_eq!(h.service.status().status, SubmissionStatus::Error);
}

#[tokio::test]
async fn test_low_order_key_is_an_encryption_failure() {
    let config = BetClientConfig::for_testing();
    let network = Arc::new(SimulatedArciumNetwork::new());
    let source = Arc::new(MockKeySource::new(NetworkPublicKey::from_bytes([0u8; 32]), 0));
    let deps = BetClientDeps::new(&config, source, network.clone(), network.clone()).unwrap();
    let service = BetSubmissionService::new(&config, deps).unwrap();
    service.connect_wallet(Pubkey::new_unique());
    service.load_interface(ProgramInterface::derived(None));

    let result = service.place_bet(request(true, 1.0, 1)).await;

    assert!(matches!(result, Err(BetClientError::EncryptionFailed(_))));
    let status = service.status();
    assert_eq!(status.status, SubmissionStatus::Error);
    assert_eq!(status.message, "Failed to encrypt prediction");
    assert_eq!(network.submitted_count(), 0);
}

/// Publishes a key one byte short.
struct TruncatedKeySource;

#[async_trait]
impl MxeKeySource for TruncatedKeySource {
    async fn fetch_public_key(
        &self,
        _program_id: &Pubkey,
    ) -> Result<Option<NetworkPublicKey>, BetClientError> {
        NetworkPublicKey::from_slice(&[1u8; 31]).map(Some)
    }
}

#[tokio::test]
async fn test_short_key_is_an_encryption_failure() {
    let config = BetClientConfig::for_testing();
    let network = Arc::new(SimulatedArciumNetwork::new());
    let deps = BetClientDeps::new(
        &config,
        Arc::new(TruncatedKeySource),
        network.clone(),
        network.clone(),
    )
    .unwrap();
    let service = BetSubmissionService::new(&config, deps).unwrap();
    service.connect_wallet(Pubkey::new_unique());
    service.load_interface(ProgramInterface::derived(None));

    let result = service.place_bet(request(true, 1.0, 1)).await;

    match result {
        Err(BetClientError::EncryptionFailed(reason)) => assert!(reason.contains("31 bytes")),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(service.status().message, "Failed to encrypt prediction");
    assert_eq!(network.submitted_count(), 0);
}

// =============================================================================
// FINALIZATION
// =============================================================================

/// Loses its connection while a computation is pending.
struct DroppedConnection;

#[async_trait]
impl ComputationFinalizer for DroppedConnection {
    async fn await_finalization(
        &self,
        _offset: ComputationOffset,
        _program_id: &Pubkey,
        _commitment: Commitment,
    ) -> Result<FinalizationSignature, BetClientError> {
        Err(BetClientError::Rpc("websocket closed".to_string()))
    }
}

#[tokio::test]
async fn test_dropped_connection_is_not_a_rejection() {
    let config = BetClientConfig::for_testing();
    let mxe = Arc::new(InMemoryMxe::new());
    let network = Arc::new(SimulatedArciumNetwork::new().with_mxe(mxe.clone()));
    let deps =
        BetClientDeps::new(&config, mxe, network.clone(), Arc::new(DroppedConnection)).unwrap();
    let service = BetSubmissionService::new(&config, deps).unwrap();
    service.connect_wallet(Pubkey::new_unique());
    service.load_interface(ProgramInterface::derived(None));

    let err = service.place_bet(request(true, 1.0, 8)).await.unwrap_err();

    assert!(matches!(err, BetClientError::FinalizationInterrupted { .. }));
    assert!(err.is_retryable_flow());
    assert!(err.to_string().contains("websocket closed"));
    let status = service.status();
    assert_eq!(status.status, SubmissionStatus::Error);
    assert_eq!(status.message, "Lost track of computation finalization");
    assert_eq!(network.submitted_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_computation_times_out_at_bound() {
    let h = harness();
    h.network.set_finalization_mode(FinalizationMode::Stalled);

    let start = Instant::now();
    let result = h.service.place_bet(request(true, 1.0, 5)).await;
    let elapsed = start.elapsed();

    assert!(matches!(result, Err(BetClientError::FinalizationTimeout { .. })));
    assert!(elapsed >= Duration::from_secs(5));
    assert!(elapsed < Duration::from_secs(6));
    let status = h.service.status();
    assert_eq!(status.status, SubmissionStatus::Error);
    assert_eq!(status.message, "Computation finalization timed out");
}

#[tokio::test(start_paused = true)]
async fn test_delayed_finalization_within_bound_succeeds() {
    let h = harness();
    h.network
        .set_finalization_mode(FinalizationMode::Delayed(Duration::from_secs(4)));
    let receipt = h.service.place_bet(request(true, 1.0, 5)).await;
    assert!(receipt.is_ok());
}

#[tokio::test]
async fn test_rejected_computation_reports_reason() {
    let h = harness();
    h.network
        .set_finalization_mode(FinalizationMode::Rejected("invalid ciphertext".to_string()));

    let result = h.service.place_bet(request(true, 1.0, 5)).await;

    let err = result.unwrap_err();
    assert!(!err.is_retryable_flow());
    assert!(err.to_string().contains("invalid ciphertext"));
    assert_eq!(h.service.status().message, "Computation rejected by the network");
}

// =============================================================================
// SUBMISSION
// =============================================================================

#[tokio::test]
async fn test_insufficient_funds_surfaces_as_error() {
    let h = harness();
    h.network
        .fail_next_submission(SubmissionFailure::InsufficientFunds);
    let mut log = h.service.transitions();

    let result = h.service.place_bet(request(true, 1.0, 9)).await;

    assert!(matches!(
        result,
        Err(BetClientError::Submission(SubmissionFailure::InsufficientFunds))
    ));
    assert_eq!(
        drain(&mut log),
        vec![
            SubmissionStatus::Encrypting,
            SubmissionStatus::Signing,
            SubmissionStatus::Submitting,
            SubmissionStatus::Error,
        ]
    );
    let status = h.service.status();
    assert_eq!(status.message, "Failed to place bet");
    assert!(status.error.unwrap().contains("insufficient funds"));
}

#[tokio::test]
async fn test_second_bet_on_same_market_rejected() {
    let h = harness();
    h.service.place_bet(request(true, 1.0, 11)).await.unwrap();
    let second = h.service.place_bet(request(false, 1.0, 11)).await;
    assert!(matches!(
        second,
        Err(BetClientError::Submission(SubmissionFailure::AccountAlreadyInUse))
    ));
    assert_eq!(h.network.pool_totals(MarketId::new(11)).bets, 1);
}

// =============================================================================
// PRECONDITIONS
// =============================================================================

#[tokio::test]
async fn test_wallet_disconnected_never_encrypts() {
    let h = harness();
    h.service.disconnect_wallet();
    let mut log = h.service.transitions();

    let result = h.service.place_bet(request(true, 1.0, 1)).await;

    assert!(matches!(result, Err(BetClientError::WalletNotConnected)));
    assert_eq!(drain(&mut log), vec![SubmissionStatus::Error]);
    assert_eq!(h.service.status().message, "Wallet not connected");
    assert_eq!(h.mxe.fetch_count(), 0);
    assert_eq!(h.network.submitted_count(), 0);
}

#[tokio::test]
async fn test_missing_interface_reported() {
    let config = BetClientConfig::for_testing();
    let mxe = Arc::new(InMemoryMxe::new());
    let network = Arc::new(SimulatedArciumNetwork::new());
    let deps = BetClientDeps::new(&config, mxe.clone(), network.clone(), network.clone()).unwrap();
    let service = BetSubmissionService::new(&config, deps).unwrap();
    service.connect_wallet(Pubkey::new_unique());

    let result = service.place_bet(request(true, 1.0, 1)).await;

    assert!(matches!(result, Err(BetClientError::InterfaceNotLoaded)));
    assert_eq!(service.status().message, "Program IDL not loaded");
    assert_eq!(mxe.fetch_count(), 0);
}

#[tokio::test]
async fn test_network_checked_before_wallet() {
    let h = harness();
    h.service.disconnect_wallet();
    h.network.set_connected(false);
    let result = h.service.place_bet(request(true, 1.0, 1)).await;
    assert!(matches!(result, Err(BetClientError::NetworkUnavailable)));
}

#[tokio::test]
async fn test_invalid_amounts_rejected() {
    let h = harness();
    for amount in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let result = h.service.place_bet(request(true, amount, 1)).await;
        assert!(matches!(result, Err(BetClientError::InvalidAmount(_))), "{amount}");
    }
    assert_eq!(h.mxe.fetch_count(), 0);
}

// =============================================================================
// STATUS OBJECT
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_terminal_status_resets_to_idle() {
    let h = harness();
    h.service.place_bet(request(true, 1.0, 1)).await.unwrap();
    assert_eq!(h.service.status().status, SubmissionStatus::Success);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(h.service.status(), StatusReport::idle());
}

#[tokio::test]
async fn test_dismiss_returns_to_idle() {
    let h = harness();
    h.service.disconnect_wallet();
    let _ = h.service.place_bet(request(true, 1.0, 1)).await;
    assert_eq!(h.service.status().status, SubmissionStatus::Error);
    h.service.dismiss();
    assert_eq!(h.service.status().status, SubmissionStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_attempt_stops_updating_status() {
    let h = harness();
    h.network.set_finalization_mode(FinalizationMode::Stalled);
    let mut status = h.service.subscribe();

    let handle = h.service.submit(request(true, 1.0, 8));
    status
        .wait_for(|report| report.status == SubmissionStatus::Waiting)
        .await
        .unwrap();
    handle.cancel();

    assert_eq!(h.service.status().status, SubmissionStatus::Idle);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.service.status().status, SubmissionStatus::Idle);
    // The transaction had already landed.
    assert_eq!(h.network.submitted_count(), 1);
}

#[tokio::test]
async fn test_background_submission_outcome() {
    let h = harness();
    let handle = h.service.submit(request(false, 2.0, 12));
    let receipt = handle.outcome().await.unwrap().unwrap();
    assert_eq!(receipt.market_id, MarketId::new(12));
    assert_eq!(h.network.pool_totals(MarketId::new(12)).no, 2 * LAMPORTS_PER_SOL);
}
