//! `probe`: JSON-RPC existence probe of the MPC runtime accounts.

use std::fmt;

use olivia_bet_client::algorithms::derive_market_address;
use olivia_bet_client::{
    comp_def_offset, ArciumAddressing, BetClientConfig, CircuitName, InfrastructureAccount,
    InfrastructureAddresses, MarketId, RpcAccountProbe,
};
use olivia_telemetry::{HistogramTimer, RPC_PROBE_DURATION};
use serde::Serialize;
use solana_program::pubkey::Pubkey;
use tracing::debug;

use crate::AdminError;

/// One probed account.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeRow {
    /// What the account is.
    pub label: String,
    /// Base58 address.
    pub address: String,
    /// Whether `getAccountInfo` returned it.
    pub exists: bool,
    /// Balance, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lamports: Option<u64>,
    /// Owner, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

/// Result of `probe`.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    /// Endpoint probed.
    pub rpc_url: String,
    /// `getHealth` answer.
    pub healthy: bool,
    /// Accounts in probe order.
    pub accounts: Vec<ProbeRow>,
}

/// Accounts to probe, labelled.
pub fn probe_targets(
    config: &BetClientConfig,
    market: Option<MarketId>,
) -> Result<Vec<(String, Pubkey)>, AdminError> {
    let program = config.program_pubkey()?;
    let runtime = ArciumAddressing::new(config.arcium_program_pubkey()?);

    let mut targets = vec![("arcium_program".to_string(), runtime.runtime_program_id())];
    for (label, account) in [
        ("mxe", InfrastructureAccount::Mxe),
        ("mempool", InfrastructureAccount::Mempool),
        ("executing_pool", InfrastructureAccount::ExecutingPool),
        ("cluster", InfrastructureAccount::Cluster(config.cluster_offset)),
        ("fee_pool", InfrastructureAccount::FeePool),
        ("clock", InfrastructureAccount::Clock),
    ] {
        targets.push((label.to_string(), runtime.address_of(&program, account)?));
    }
    for circuit in CircuitName::ALL {
        let account = InfrastructureAccount::ComputationDefinition(comp_def_offset(circuit));
        targets.push((
            format!("comp_def:{circuit}"),
            runtime.address_of(&program, account)?,
        ));
    }
    if let Some(id) = market {
        targets.push((format!("market:{id}"), derive_market_address(&program, id)?));
    }
    Ok(targets)
}

/// Probe every target against `config.rpc_url`.
pub async fn run_probe(
    config: &BetClientConfig,
    market: Option<MarketId>,
) -> Result<ProbeReport, AdminError> {
    let probe = RpcAccountProbe::new(config.rpc_url.clone(), config.commitment)?;
    let healthy = probe.is_healthy().await;

    let mut accounts = Vec::new();
    for (label, address) in probe_targets(config, market)? {
        let snapshot = {
            let _timer = HistogramTimer::new(&RPC_PROBE_DURATION);
            probe.get_account(&address).await?
        };
        debug!(%label, %address, exists = snapshot.is_some(), "[admin] probed");
        accounts.push(ProbeRow {
            label,
            address: address.to_string(),
            exists: snapshot.is_some(),
            lamports: snapshot.as_ref().map(|s| s.lamports),
            owner: snapshot.map(|s| s.owner),
        });
    }

    Ok(ProbeReport {
        rpc_url: probe.url().to_string(),
        healthy,
        accounts,
    })
}

impl fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let health = if self.healthy { "healthy" } else { "unhealthy" };
        writeln!(f, "{} ({health})", self.rpc_url)?;
        for row in &self.accounts {
            let state = if row.exists { "present" } else { "MISSING" };
            write!(f, "{:<34} {:<8} {}", row.label, state, row.address)?;
            if let Some(lamports) = row.lamports {
                write!(f, "  {lamports} lamports")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets_cover_runtime_and_circuits() {
        let config = BetClientConfig::default();
        let targets = probe_targets(&config, None).unwrap();
        assert_eq!(targets.len(), 10);
        assert_eq!(targets[0].0, "arcium_program");
        assert!(targets.iter().any(|(l, _)| l == "comp_def:place_bet"));
    }

    #[test]
    fn test_market_target_appended() {
        let config = BetClientConfig::default();
        let targets = probe_targets(&config, Some(MarketId::new(9))).unwrap();
        assert_eq!(targets.last().unwrap().0, "market:9");
    }

    #[test]
    fn test_text_output_flags_missing() {
        let report = ProbeReport {
            rpc_url: "http://127.0.0.1:8899".to_string(),
            healthy: false,
            accounts: vec![ProbeRow {
                label: "mxe".to_string(),
                address: Pubkey::new_unique().to_string(),
                exists: false,
                lamports: None,
                owner: None,
            }],
        };
        let text = report.to_string();
        assert!(text.contains("unhealthy"));
        assert!(text.contains("MISSING"));
    }
}
