use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Account address as handed out by the wallet provider.
///
/// Kept verbatim (mixed-case and all); comparisons that need to identify the
/// same account go through [`Address::matches`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Address(pub String);

impl Address {
    /// Case-insensitive account identity check.
    pub fn matches(&self, other: &Address) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }

    /// Shortened `0x1234...abcd` display form for notifications and labels.
    pub fn short(&self) -> String {
        if self.0.len() < 10 {
            return self.0.clone();
        }
        format!("{}...{}", &self.0[..6], &self.0[self.0.len() - 4..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Network identity reported by the wallet provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkInfo {
    pub chain_id: u64,
    pub name: String,
}

/// A listed product as surfaced to the view layer.
///
/// Sourced read-only from the contract; the client never mutates one except
/// by dropping sold entries from a listing result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub description: String,
    /// Display price in whole-coin units, e.g. "0.5".
    pub price: String,
    /// Exact price in the chain's native units.
    pub price_wei: U256,
    pub seller: Address,
    pub image_urls: Vec<String>,
    pub sold: bool,
}

impl Product {
    /// Whether `account` is the seller of this product (case-insensitive).
    ///
    /// A view-layer courtesy for disabling the purchase action; the contract
    /// independently enforces this on-chain.
    pub fn is_listed_by(&self, account: &Address) -> bool {
        self.seller.matches(account)
    }
}

/// Failure taxonomy shared across the interaction layer.
#[derive(Debug, Error)]
pub enum MarketError {
    /// The host environment exposes no wallet provider.
    #[error("no wallet detected; install a browser wallet to continue")]
    NoWallet,
    /// A write was attempted without an active signing capability.
    #[error("no active signer; connect a wallet before sending transactions")]
    NoSigner,
    /// Rejected before anything was sent: malformed price, missing fields,
    /// image count out of range.
    #[error("{0}")]
    InvalidInput(String),
    /// The contract rejected the call or the transaction reverted on-chain.
    #[error("{}", .reason.as_deref().unwrap_or("transaction failed"))]
    Transaction { reason: Option<String> },
    /// The pinning service refused an image or the upload transport failed.
    #[error("image upload failed: {reason}")]
    Upload { reason: String },
    /// The listing read failed; callers degrade to an empty result set.
    #[error("failed to load product listing: {0}")]
    Read(String),
    /// The wallet provider rejected the connection request.
    #[error("wallet connection failed: {0}")]
    Provider(String),
}

impl MarketError {
    /// Structured human-readable reason, when the failure carries one.
    ///
    /// Reporters fall back to a per-operation generic message when this is
    /// `None`.
    pub fn reason(&self) -> Option<String> {
        match self {
            MarketError::Transaction { reason } => reason.clone(),
            MarketError::Upload { reason } => Some(reason.clone()),
            MarketError::InvalidInput(message) => Some(message.clone()),
            _ => None,
        }
    }
}
