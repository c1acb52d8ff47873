//! `demo`: one bet through the simulated network.
//!
//! The in-memory MXE decrypts the bet, so the pool totals printed at the end
//! show the prediction arrived intact.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use olivia_bet_client::{
    BetClientConfig, BetClientDeps, BetRequest, BetSubmissionService, FinalizationMode,
    InMemoryMxe, OrderSide, Prediction, ProgramInterface, SimulatedArciumNetwork, StatusReport,
};
use olivia_telemetry::{encode_metrics, record_status_transition, register_metrics};
use serde::Serialize;
use solana_program::pubkey::Pubkey;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tracing::info;

use crate::cli::{DemoArgs, DemoFinalization};
use crate::AdminError;

/// A status report and when it was published.
#[derive(Debug, Clone, Serialize)]
pub struct TimedReport {
    /// Milliseconds since the bet was confirmed.
    pub at_ms: u64,
    /// The report.
    #[serde(flatten)]
    pub report: StatusReport,
}

/// How the demo bet ended.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DemoOutcome {
    /// Finalized.
    Success {
        /// Computation id.
        computation_offset: u64,
        /// `place_bet` signature.
        transaction_signature: String,
        /// Callback signature.
        finalization_signature: String,
        /// Bet account.
        bet_address: String,
        /// YES pool after the bet, lamports.
        pool_yes: u64,
        /// NO pool after the bet, lamports.
        pool_no: u64,
    },
    /// Failed or was dropped.
    Failed {
        /// Error text.
        error: String,
    },
}

/// Result of `demo`.
#[derive(Debug, Clone, Serialize)]
pub struct DemoReport {
    /// Every published status, in order.
    pub transitions: Vec<TimedReport>,
    /// Final result.
    pub outcome: DemoOutcome,
    /// Prometheus text, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<String>,
}

fn finalization_mode(args: &DemoArgs) -> FinalizationMode {
    match args.finalization {
        DemoFinalization::Immediate => FinalizationMode::Immediate,
        DemoFinalization::Delayed => {
            FinalizationMode::Delayed(Duration::from_millis(args.delay_ms))
        }
        DemoFinalization::Stalled => FinalizationMode::Stalled,
        DemoFinalization::Rejected => {
            FinalizationMode::Rejected("computation aborted by MXE".to_string())
        }
    }
}

/// Run one bet against a fresh simulated network.
pub async fn run_demo(
    config: &BetClientConfig,
    args: &DemoArgs,
) -> Result<DemoReport, AdminError> {
    let market_id = args.market.resolve()?;
    if args.metrics {
        register_metrics()?;
    }
    let mxe = Arc::new(InMemoryMxe::new().with_unpublished_fetches(args.unpublished_fetches));
    let network = Arc::new(SimulatedArciumNetwork::new().with_mxe(mxe.clone()));
    network.set_finalization_mode(finalization_mode(args));

    let deps = BetClientDeps::new(config, mxe, network.clone(), network.clone())?;
    let service = Arc::new(BetSubmissionService::new(config, deps)?);
    let bettor = Pubkey::new_unique();
    service.connect_wallet(bettor);
    service.load_interface(ProgramInterface::derived(Some(service.context().program_id)));

    let request = BetRequest {
        prediction: Prediction::from_side(OrderSide::from(args.side)),
        amount_sol: args.amount,
        market_id,
    };
    info!(market_id = %market_id, bettor = %bettor, "[admin] demo bet confirmed");

    let mut log = service.transitions();
    let started = Instant::now();
    let handle = service.submit(request);

    let mut transitions = Vec::new();
    loop {
        match log.recv().await {
            Ok(report) => {
                record_status_transition(report.status.as_str());
                let terminal = report.status.is_terminal();
                transitions.push(TimedReport {
                    at_ms: started.elapsed().as_millis() as u64,
                    report,
                });
                if terminal {
                    break;
                }
            }
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
    }

    let outcome = match handle.outcome().await {
        Some(Ok(receipt)) => {
            let pool = network.pool_totals(market_id);
            DemoOutcome::Success {
                computation_offset: receipt.computation_offset.value(),
                transaction_signature: receipt.transaction_signature.0,
                finalization_signature: receipt.finalization_signature.0,
                bet_address: receipt.addresses.bet.to_string(),
                pool_yes: pool.yes,
                pool_no: pool.no,
            }
        }
        Some(Err(e)) => DemoOutcome::Failed {
            error: e.to_string(),
        },
        None => DemoOutcome::Failed {
            error: "attempt aborted".to_string(),
        },
    };

    let metrics = if args.metrics {
        Some(encode_metrics()?)
    } else {
        None
    };

    Ok(DemoReport {
        transitions,
        outcome,
        metrics,
    })
}

impl fmt::Display for DemoReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for t in &self.transitions {
            write!(
                f,
                "[{:>6} ms] {:<10} {}",
                t.at_ms, t.report.status, t.report.message
            )?;
            if let Some(signature) = &t.report.signature {
                write!(f, " ({signature})")?;
            }
            if let Some(error) = &t.report.error {
                write!(f, " - {error}")?;
            }
            writeln!(f)?;
        }
        match &self.outcome {
            DemoOutcome::Success {
                computation_offset,
                bet_address,
                pool_yes,
                pool_no,
                ..
            } => {
                writeln!(
                    f,
                    "computation {computation_offset} finalized, bet account {bet_address}"
                )?;
                write!(f, "pool totals: yes={pool_yes} no={pool_no} lamports")?;
            }
            DemoOutcome::Failed { error } => write!(f, "bet failed: {error}")?,
        }
        if let Some(metrics) = &self.metrics {
            write!(f, "\n\n{metrics}")?;
        }
        Ok(())
    }
}
