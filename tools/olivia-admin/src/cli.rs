//! Command-line arguments.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand, ValueEnum};
use olivia_bet_client::{BetClientConfig, MarketId, OrderSide};
use solana_program::pubkey::Pubkey;

use crate::AdminError;

/// Olivia operator CLI
#[derive(Parser, Debug)]
#[command(name = "olivia-admin")]
#[command(about = "Operator tooling for confidential bets on the Olivia prediction market")]
pub struct Args {
    /// TOML config file; flags below override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// JSON-RPC endpoint
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// Prediction market program id
    #[arg(long)]
    pub program_id: Option<String>,

    /// Arcium program id
    #[arg(long)]
    pub arcium_program_id: Option<String>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print every account a place_bet instruction references
    Addresses {
        /// Target market
        #[command(flatten)]
        market: MarketArgs,
        /// Bettor wallet (base58)
        #[arg(long)]
        bettor: String,
        /// Computation offset; random when omitted
        #[arg(long)]
        offset: Option<u64>,
    },

    /// Probe MPC runtime accounts over JSON-RPC
    Probe {
        /// Also probe this market
        #[command(flatten)]
        market: OptionalMarketArgs,
    },

    /// Show what an idempotent initialization would create or finalize
    InitPlan {
        /// Markets to check
        #[arg(long = "market-id")]
        market_ids: Vec<u64>,
    },

    /// Place one bet on the simulated network and print each status
    Demo(DemoArgs),
}

/// Market selection by id or by trading pair.
#[derive(clap::Args, Debug, Clone)]
pub struct MarketArgs {
    /// Explicit market id
    #[arg(long)]
    pub market_id: Option<u64>,
    /// Base symbol, used when no id is given
    #[arg(long)]
    pub base: Option<String>,
    /// Quote symbol
    #[arg(long, default_value = "USDC")]
    pub quote: String,
}

impl MarketArgs {
    /// Explicit id, or the id derived from `base_quote`.
    pub fn resolve(&self) -> Result<MarketId, AdminError> {
        match (self.market_id, &self.base) {
            (Some(id), _) if id != 0 => Ok(MarketId::new(id)),
            (_, Some(base)) => Ok(MarketId::resolve(None, base, &self.quote)),
            _ => Err(AdminError::InvalidArgument(
                "either --market-id or --base is required".to_string(),
            )),
        }
    }
}

/// Optional market selection.
#[derive(clap::Args, Debug, Clone)]
pub struct OptionalMarketArgs {
    /// Explicit market id
    #[arg(long)]
    pub market_id: Option<u64>,
    /// Base symbol, used when no id is given
    #[arg(long)]
    pub base: Option<String>,
    /// Quote symbol
    #[arg(long, default_value = "USDC")]
    pub quote: String,
}

impl OptionalMarketArgs {
    /// Market, if one was named.
    pub fn resolve(&self) -> Option<MarketId> {
        match (self.market_id, &self.base) {
            (Some(id), _) if id != 0 => Some(MarketId::new(id)),
            (_, Some(base)) => Some(MarketId::resolve(None, base, &self.quote)),
            _ => None,
        }
    }
}

/// Order side as typed on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// YES
    Buy,
    /// NO
    Sell,
}

impl From<Side> for OrderSide {
    fn from(side: Side) -> Self {
        match side {
            Side::Buy => OrderSide::Buy,
            Side::Sell => OrderSide::Sell,
        }
    }
}

/// How the simulated computation completes.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoFinalization {
    /// Finalize at once
    Immediate,
    /// Finalize after `--delay-ms`
    Delayed,
    /// Never finalize; the client times out
    Stalled,
    /// MXE rejects the computation
    Rejected,
}

/// Arguments of `demo`.
#[derive(clap::Args, Debug, Clone)]
pub struct DemoArgs {
    /// Order side
    #[arg(long, value_enum, default_value = "buy")]
    pub side: Side,
    /// Amount in SOL
    #[arg(long, default_value_t = 1.0)]
    pub amount: f64,
    /// Target market
    #[command(flatten)]
    pub market: MarketArgs,
    /// Finalization behavior of the simulated MXE
    #[arg(long, value_enum, default_value = "delayed")]
    pub finalization: DemoFinalization,
    /// Delay for `--finalization delayed`
    #[arg(long, default_value_t = 800)]
    pub delay_ms: u64,
    /// Key fetches the MXE answers with "not published"
    #[arg(long, default_value_t = 0)]
    pub unpublished_fetches: u32,
    /// Print Prometheus metrics afterwards
    #[arg(long)]
    pub metrics: bool,
}

impl Args {
    /// Config file (or defaults) with flag overrides applied, validated.
    pub fn load_config(&self) -> Result<BetClientConfig, AdminError> {
        let mut config = match &self.config {
            Some(path) => BetClientConfig::from_toml_file(path)?,
            None => BetClientConfig::default(),
        };
        if let Some(url) = &self.rpc_url {
            config.rpc_url = url.clone();
        }
        if let Some(id) = &self.program_id {
            config.program_id = id.clone();
        }
        if let Some(id) = &self.arcium_program_id {
            config.arcium_program_id = id.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

/// Parse a base58 public key argument.
pub fn parse_pubkey(name: &str, value: &str) -> Result<Pubkey, AdminError> {
    Pubkey::from_str(value).map_err(|e| AdminError::InvalidArgument(format!("{name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_addresses_command() {
        let args = Args::try_parse_from([
            "olivia-admin",
            "--json",
            "addresses",
            "--market-id",
            "42",
            "--bettor",
            "11111111111111111111111111111111",
        ])
        .unwrap();
        assert!(args.json);
        match args.command {
            Command::Addresses { market, offset, .. } => {
                assert_eq!(market.resolve().unwrap(), MarketId::new(42));
                assert_eq!(offset, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_market_from_pair() {
        let market = MarketArgs {
            market_id: None,
            base: Some("NYC-MAYOR__".to_string()),
            quote: "USDC".to_string(),
        };
        assert_eq!(
            market.resolve().unwrap(),
            MarketId::from_market_name("NYC-MAYOR_USDC")
        );
    }

    #[test]
    fn test_market_required() {
        let market = MarketArgs {
            market_id: None,
            base: None,
            quote: "USDC".to_string(),
        };
        assert!(matches!(market.resolve(), Err(AdminError::InvalidArgument(_))));
    }

    #[test]
    fn test_flag_overrides_config() {
        let args = Args::try_parse_from([
            "olivia-admin",
            "--rpc-url",
            "http://10.0.0.1:8899",
            "init-plan",
        ])
        .unwrap();
        let config = args.load_config().unwrap();
        assert_eq!(config.rpc_url, "http://10.0.0.1:8899");
    }

    #[test]
    fn test_bad_program_id_rejected() {
        let args =
            Args::try_parse_from(["olivia-admin", "--program-id", "not-a-key", "init-plan"])
                .unwrap();
        assert!(args.load_config().is_err());
    }
}
