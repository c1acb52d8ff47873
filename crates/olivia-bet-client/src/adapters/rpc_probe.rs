//! JSON-RPC account probe.
//!
//! Minimal client for the cluster RPC: `getAccountInfo` and `getHealth`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;
use tracing::debug;

use crate::domain::{BetClientError, Commitment};
use crate::ports::AccountProbe;

#[derive(Debug, Serialize)]
struct JsonRpcRequest<T> {
    jsonrpc: &'static str,
    method: &'static str,
    params: T,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcValue<T> {
    value: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcAccount {
    lamports: u64,
    owner: String,
    data: (String, String),
    executable: bool,
}

/// Account as returned by `getAccountInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSnapshot {
    /// Balance.
    pub lamports: u64,
    /// Owning program.
    pub owner: String,
    /// Raw account data.
    pub data: Vec<u8>,
    /// Whether the account holds a program.
    pub executable: bool,
}

/// JSON-RPC client for account probing.
pub struct RpcAccountProbe {
    client: Client,
    url: String,
    commitment: Commitment,
    request_id: AtomicU64,
}

impl RpcAccountProbe {
    /// Create a probe.
    pub fn new(url: impl Into<String>, commitment: Commitment) -> Result<Self, BetClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(3))
            .build()
            .map_err(|e| BetClientError::Rpc(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            commitment,
            request_id: AtomicU64::new(1),
        })
    }

    /// RPC endpoint.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn call<P: Serialize + Send, R: serde::de::DeserializeOwned>(
        &self,
        method: &'static str,
        params: P,
    ) -> Result<R, BetClientError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    BetClientError::Rpc(format!("cannot connect to {}", self.url))
                } else {
                    BetClientError::Rpc(e.to_string())
                }
            })?;

        let rpc_response: JsonRpcResponse<R> = response
            .json()
            .await
            .map_err(|e| BetClientError::Rpc(format!("malformed response: {e}")))?;

        if let Some(error) = rpc_response.error {
            return Err(BetClientError::Rpc(format!(
                "{method} failed ({}): {}",
                error.code, error.message
            )));
        }
        rpc_response
            .result
            .ok_or_else(|| BetClientError::Rpc(format!("{method}: missing result")))
    }

    /// Fetch an account, `None` if it does not exist.
    pub async fn get_account(
        &self,
        address: &Pubkey,
    ) -> Result<Option<AccountSnapshot>, BetClientError> {
        let params = (
            address.to_string(),
            serde_json::json!({
                "encoding": "base64",
                "commitment": self.commitment.as_str(),
            }),
        );
        let result: RpcValue<RpcAccount> = self.call("getAccountInfo", params).await?;
        debug!(address = %address, exists = result.value.is_some(), "[bet-client] getAccountInfo");

        result
            .value
            .map(|account| {
                let data = base64::engine::general_purpose::STANDARD
                    .decode(&account.data.0)
                    .map_err(|e| BetClientError::Rpc(format!("account data: {e}")))?;
                Ok(AccountSnapshot {
                    lamports: account.lamports,
                    owner: account.owner,
                    data,
                    executable: account.executable,
                })
            })
            .transpose()
    }

    /// Whether the node reports itself healthy.
    pub async fn is_healthy(&self) -> bool {
        matches!(
            self.call::<[(); 0], String>("getHealth", []).await.as_deref(),
            Ok("ok")
        )
    }
}

#[async_trait]
impl AccountProbe for RpcAccountProbe {
    async fn account_exists(&self, address: &Pubkey) -> Result<bool, BetClientError> {
        Ok(self.get_account(address).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_existing_account() {
        let json = r#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":5},"value":{
            "lamports":1000,"owner":"11111111111111111111111111111111",
            "data":["AQID","base64"],"executable":false,"rentEpoch":0,"space":3}}}"#;
        let response: JsonRpcResponse<RpcValue<RpcAccount>> = serde_json::from_str(json).unwrap();
        let account = response.result.unwrap().value.unwrap();
        assert_eq!(account.lamports, 1000);
        assert_eq!(
            base64::engine::general_purpose::STANDARD
                .decode(&account.data.0)
                .unwrap(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_parse_missing_account() {
        let json = r#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":5},"value":null}}"#;
        let response: JsonRpcResponse<RpcValue<RpcAccount>> = serde_json::from_str(json).unwrap();
        assert!(response.result.unwrap().value.is_none());
    }

    #[test]
    fn test_parse_error() {
        let json = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"Invalid param"}}"#;
        let response: JsonRpcResponse<RpcValue<RpcAccount>> = serde_json::from_str(json).unwrap();
        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_rpc_error() {
        let probe = RpcAccountProbe::new("http://127.0.0.1:1", Commitment::Confirmed).unwrap();
        let result = probe.account_exists(&Pubkey::new_unique()).await;
        assert!(matches!(result, Err(BetClientError::Rpc(_))));
        assert!(!probe.is_healthy().await);
    }
}
