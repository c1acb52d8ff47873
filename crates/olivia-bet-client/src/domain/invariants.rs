//! # Domain Invariants
//!
//! Rules every submission attempt must satisfy.

use super::errors::BetClientError;
use super::status::SubmissionStatus;

/// Invariant: preconditions hold before any network activity.
///
/// Checked in a fixed order so the reported failure is deterministic:
/// network, then wallet, then program interface.
pub fn invariant_preconditions(
    network_connected: bool,
    wallet_connected: bool,
    interface_loaded: bool,
) -> Result<(), BetClientError> {
    if !network_connected {
        return Err(BetClientError::NetworkUnavailable);
    }
    if !wallet_connected {
        return Err(BetClientError::WalletNotConnected);
    }
    if !interface_loaded {
        return Err(BetClientError::InterfaceNotLoaded);
    }
    Ok(())
}

/// Invariant: the encrypted plaintext is exactly 0 or 1.
pub fn invariant_binary_plaintext(plaintext: u128) -> bool {
    plaintext <= 1
}

/// Invariant: status only moves along the published state machine.
pub fn invariant_status_transition(from: SubmissionStatus, to: SubmissionStatus) -> bool {
    from.can_transition_to(to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preconditions_order() {
        assert!(matches!(
            invariant_preconditions(false, false, false),
            Err(BetClientError::NetworkUnavailable)
        ));
        assert!(matches!(
            invariant_preconditions(true, false, false),
            Err(BetClientError::WalletNotConnected)
        ));
        assert!(matches!(
            invariant_preconditions(true, true, false),
            Err(BetClientError::InterfaceNotLoaded)
        ));
        assert!(invariant_preconditions(true, true, true).is_ok());
    }

    #[test]
    fn test_binary_plaintext() {
        assert!(invariant_binary_plaintext(0));
        assert!(invariant_binary_plaintext(1));
        assert!(!invariant_binary_plaintext(2));
    }

    #[test]
    fn test_status_transition() {
        assert!(invariant_status_transition(
            SubmissionStatus::Waiting,
            SubmissionStatus::Success
        ));
        assert!(!invariant_status_transition(
            SubmissionStatus::Idle,
            SubmissionStatus::Success
        ));
    }
}
