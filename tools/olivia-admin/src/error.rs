//! CLI errors.

use olivia_bet_client::BetClientError;
use olivia_telemetry::TelemetryError;
use thiserror::Error;

/// Errors surfaced to the operator.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Bet client failure.
    #[error(transparent)]
    Client(#[from] BetClientError),

    /// Logging or metrics setup failure.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// Bad command-line input.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Output encoding failure.
    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
}
