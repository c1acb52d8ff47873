//! # Value Objects
//!
//! Immutable types for the bet submission protocol.

use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::errors::BetClientError;

/// Length of an x25519 key in bytes.
pub const X25519_KEY_LEN: usize = 32;

/// Length of an encryption nonce in bytes.
pub const NONCE_LEN: usize = 16;

/// Length of one encrypted plaintext element in bytes.
pub const CIPHERTEXT_LEN: usize = 32;

/// Lamports in one SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Upper bound of a market id derived from a market name.
pub const DERIVED_MARKET_ID_MODULUS: u64 = 1_000_000;

/// Order side selected by the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    /// Bet on YES.
    Buy,
    /// Bet on NO.
    Sell,
}

/// The protected domain value: a YES/NO prediction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction(bool);

impl Prediction {
    /// Create a prediction.
    pub const fn new(outcome: bool) -> Self {
        Self(outcome)
    }

    /// BUY is YES, SELL is NO.
    pub const fn from_side(side: OrderSide) -> Self {
        match side {
            OrderSide::Buy => Self(true),
            OrderSide::Sell => Self(false),
        }
    }

    /// The predicted outcome.
    pub const fn outcome(&self) -> bool {
        self.0
    }

    /// Plaintext encoding: exactly `1` for YES and `0` for NO.
    pub const fn plaintext(&self) -> u128 {
        if self.0 {
            1
        } else {
            0
        }
    }
}

/// Market identifier, stable for the market's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarketId(u64);

impl MarketId {
    /// Create from a raw id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw value.
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// 8-byte little-endian seed encoding.
    pub fn to_le_bytes(&self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    /// Derive a market id from a market name.
    ///
    /// 32-bit rolling hash `h = h * 31 + c` over UTF-16 code units,
    /// then `|h| mod 1_000_000`.
    pub fn from_market_name(name: &str) -> Self {
        let hash = name.encode_utf16().fold(0i32, |h, unit| {
            h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(unit))
        });
        let magnitude = i64::from(hash).unsigned_abs();
        Self(magnitude % DERIVED_MARKET_ID_MODULUS)
    }

    /// Market name for a trading pair, e.g. `NYC-MAYOR__` + `USDC` -> `NYC-MAYOR_USDC`.
    pub fn pair_name(base: &str, quote: &str) -> String {
        format!("{}_{}", base.trim_end_matches('_'), quote)
    }

    /// Use the explicit id when given, otherwise derive one from the pair.
    pub fn resolve(explicit: Option<u64>, base: &str, quote: &str) -> Self {
        match explicit {
            Some(id) if id != 0 => Self(id),
            _ => Self::from_market_name(&Self::pair_name(base, quote)),
        }
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlation id for exactly one off-chain computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComputationOffset(u64);

impl ComputationOffset {
    /// Create from a raw value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw value.
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// 8-byte little-endian seed encoding.
    pub fn to_le_bytes(&self) -> [u8; 8] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for ComputationOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 16-byte encryption nonce. Public, but never reused under one shared secret.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nonce([u8; NONCE_LEN]);

impl Nonce {
    /// Create from bytes.
    pub const fn from_bytes(bytes: [u8; NONCE_LEN]) -> Self {
        Self(bytes)
    }

    /// Fresh random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Inner bytes.
    pub const fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }

    /// Nonce read as a little-endian integer, as the program expects it.
    pub fn to_u128_le(&self) -> u128 {
        u128::from_le_bytes(self.0)
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nonce({})", hex::encode(self.0))
    }
}

/// x25519 public key of the MXE cluster.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPublicKey([u8; X25519_KEY_LEN]);

impl NetworkPublicKey {
    /// Create from bytes.
    pub const fn from_bytes(bytes: [u8; X25519_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Create from a slice of arbitrary length.
    ///
    /// # Errors
    ///
    /// `KeyAgreementFailure` when the slice is not exactly 32 bytes.
    pub fn from_slice(slice: &[u8]) -> Result<Self, BetClientError> {
        let bytes: [u8; X25519_KEY_LEN] = slice.try_into().map_err(|_| {
            BetClientError::KeyAgreementFailure(format!(
                "expected {X25519_KEY_LEN}-byte public key, got {} bytes",
                slice.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Inner bytes.
    pub const fn as_bytes(&self) -> &[u8; X25519_KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for NetworkPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NetworkPublicKey({})", hex::encode(self.0))
    }
}

/// One encrypted plaintext element.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext([u8; CIPHERTEXT_LEN]);

impl Ciphertext {
    /// Create from bytes.
    pub const fn from_bytes(bytes: [u8; CIPHERTEXT_LEN]) -> Self {
        Self(bytes)
    }

    /// Inner bytes.
    pub const fn as_bytes(&self) -> &[u8; CIPHERTEXT_LEN] {
        &self.0
    }
}

impl fmt::Debug for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ciphertext({})", hex::encode(self.0))
    }
}

/// Bet amount in lamports, always positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetAmount(u64);

impl BetAmount {
    /// Convert an amount in SOL to lamports.
    ///
    /// # Errors
    ///
    /// `InvalidAmount` for non-finite, non-positive, or sub-lamport amounts.
    pub fn from_sol(sol: f64) -> Result<Self, BetClientError> {
        if !sol.is_finite() || sol <= 0.0 {
            return Err(BetClientError::InvalidAmount(format!(
                "amount must be greater than 0, got {sol}"
            )));
        }
        let lamports = sol * LAMPORTS_PER_SOL as f64;
        if lamports >= u64::MAX as f64 {
            return Err(BetClientError::InvalidAmount(format!("amount {sol} SOL overflows")));
        }
        Self::from_lamports(lamports as u64)
    }

    /// Wrap a lamport amount.
    ///
    /// # Errors
    ///
    /// `InvalidAmount` for zero.
    pub fn from_lamports(lamports: u64) -> Result<Self, BetClientError> {
        if lamports == 0 {
            return Err(BetClientError::InvalidAmount(
                "amount must be at least 1 lamport".to_string(),
            ));
        }
        Ok(Self(lamports))
    }

    /// Lamports.
    pub const fn lamports(&self) -> u64 {
        self.0
    }
}

/// How durable an observation must be.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    /// Seen by the RPC node.
    Processed,
    /// Voted on by a supermajority.
    #[default]
    Confirmed,
    /// Rooted.
    Finalized,
}

impl Commitment {
    /// JSON-RPC name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signature of a transaction accepted by the network.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionSignature(pub String);

impl fmt::Display for TransactionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Signature of the callback transaction that finalized a computation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FinalizationSignature(pub String);

impl fmt::Display for FinalizationSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encrypted circuits of the prediction market.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitName {
    /// Creates the encrypted vote stats of a market.
    InitializeMarket,
    /// Folds an encrypted prediction into the pools.
    PlaceBet,
    /// Computes a payout from an encrypted prediction.
    DistributeRewards,
}

impl CircuitName {
    /// All circuits that need a computation definition.
    pub const ALL: [CircuitName; 3] = [
        CircuitName::InitializeMarket,
        CircuitName::PlaceBet,
        CircuitName::DistributeRewards,
    ];

    /// Circuit name as compiled into the MXE.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InitializeMarket => "initialize_market",
            Self::PlaceBet => "place_bet",
            Self::DistributeRewards => "distribute_rewards",
        }
    }
}

impl fmt::Display for CircuitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_plaintext_is_binary() {
        assert_eq!(Prediction::new(true).plaintext(), 1);
        assert_eq!(Prediction::new(false).plaintext(), 0);
        assert!(Prediction::from_side(OrderSide::Buy).outcome());
        assert!(!Prediction::from_side(OrderSide::Sell).outcome());
    }

    #[test]
    fn test_market_id_le_bytes() {
        assert_eq!(MarketId::new(42).to_le_bytes(), [42, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_market_id_from_name() {
        assert_eq!(MarketId::from_market_name("").value(), 0);
        assert_eq!(MarketId::from_market_name("a").value(), 97);
        assert_eq!(MarketId::from_market_name("BTC_USDC").value(), 235_221);
        assert_eq!(MarketId::from_market_name("NYC-MAYOR_USDC").value(), 733_289);
    }

    #[test]
    fn test_market_id_resolve() {
        assert_eq!(MarketId::resolve(Some(42), "BTC", "USDC").value(), 42);
        assert_eq!(MarketId::resolve(None, "BTC__", "USDC").value(), 235_221);
        assert_eq!(MarketId::pair_name("NYC-MAYOR__", "USDC"), "NYC-MAYOR_USDC");
    }

    #[test]
    fn test_nonce_uniqueness() {
        let n1 = Nonce::generate();
        let n2 = Nonce::generate();
        assert_ne!(n1.as_bytes(), n2.as_bytes());
    }

    #[test]
    fn test_nonce_le_integer() {
        let mut bytes = [0u8; NONCE_LEN];
        bytes[0] = 1;
        bytes[1] = 2;
        assert_eq!(Nonce::from_bytes(bytes).to_u128_le(), 0x0201);
    }

    #[test]
    fn test_network_key_wrong_length() {
        let result = NetworkPublicKey::from_slice(&[7u8; 31]);
        assert!(matches!(result, Err(BetClientError::KeyAgreementFailure(_))));
        assert!(NetworkPublicKey::from_slice(&[7u8; 32]).is_ok());
    }

    #[test]
    fn test_bet_amount_conversion() {
        assert_eq!(BetAmount::from_sol(1.5).unwrap().lamports(), 1_500_000_000);
        assert!(BetAmount::from_sol(0.0).is_err());
        assert!(BetAmount::from_sol(-1.0).is_err());
        assert!(BetAmount::from_sol(f64::NAN).is_err());
        assert!(BetAmount::from_sol(1e-12).is_err());
    }

    #[test]
    fn test_commitment_serde_names() {
        let json = serde_json::to_string(&Commitment::Finalized).unwrap();
        assert_eq!(json, "\"finalized\"");
        assert_eq!(Commitment::default(), Commitment::Confirmed);
    }

    #[test]
    fn test_circuit_names() {
        let names: Vec<_> = CircuitName::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(names, ["initialize_market", "place_bet", "distribute_rewards"]);
    }
}
