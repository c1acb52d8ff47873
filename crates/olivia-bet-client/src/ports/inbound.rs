//! # Inbound Ports
//!
//! What the bet client offers to the presentation layer.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::{BetClientError, BetReceipt, BetRequest, StatusReport};

/// Bet submission API - inbound port.
#[async_trait]
pub trait BetClientApi: Send + Sync {
    /// Run one submission attempt to completion.
    ///
    /// Every stage is published on the status channel; the returned error
    /// is the same one the terminal `error` status carries.
    async fn place_bet(&self, request: BetRequest) -> Result<BetReceipt, BetClientError>;

    /// Latest status snapshot.
    fn status(&self) -> StatusReport;

    /// Subscribe to status changes.
    fn subscribe(&self) -> watch::Receiver<StatusReport>;

    /// Return a terminal status to `idle` without waiting for the reset delay.
    fn dismiss(&self);
}
