//! Olivia Admin: operator CLI for confidential bets.

use std::process::ExitCode;

use clap::Parser;
use olivia_admin::cli::parse_pubkey;
use olivia_admin::commands::{derive_addresses, run_demo, run_init_plan, run_probe};
use olivia_admin::{AdminError, Args, Command};
use olivia_bet_client::MarketId;
use olivia_telemetry::{init_telemetry, TelemetryConfig};
use serde::Serialize;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut telemetry = TelemetryConfig::from_env();
    if args.verbose {
        telemetry = telemetry.with_log_level("debug");
    }
    if let Err(e) = init_telemetry(&telemetry) {
        eprintln!("Warning: {e}");
    }

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<(), AdminError> {
    let config = args.load_config()?;

    match &args.command {
        Command::Addresses {
            market,
            bettor,
            offset,
        } => {
            let bettor = parse_pubkey("bettor", bettor)?;
            let report = derive_addresses(&config, market.resolve()?, bettor, *offset)?;
            emit(args.json, &report)
        }
        Command::Probe { market } => {
            let report = run_probe(&config, market.resolve()).await?;
            emit(args.json, &report)
        }
        Command::InitPlan { market_ids } => {
            let markets: Vec<MarketId> = market_ids.iter().copied().map(MarketId::new).collect();
            let report = run_init_plan(&config, &markets).await?;
            emit(args.json, &report)
        }
        Command::Demo(demo) => {
            let report = run_demo(&config, demo).await?;
            emit(args.json, &report)
        }
    }
}

fn emit<T: Serialize + std::fmt::Display>(json: bool, report: &T) -> Result<(), AdminError> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}
