//! Boundary traits for the wallet provider and the marketplace contract.
//!
//! The browser host supplies real implementations; [`memory`] holds the
//! in-process doubles the rest of the workspace tests against.

use alloy_primitives::U256;
use async_trait::async_trait;
use mf_api_types::{Address, NetworkInfo};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;

pub mod memory;

pub use memory::{InMemoryMarket, InstantTx, StaticSigner, StaticWallet};

/// Failures at the wallet/contract boundary.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The provider or the user refused the request before it reached the
    /// chain.
    #[error("request rejected: {0}")]
    Rejected(String),
    /// The contract reverted; carries the revert reason when the node
    /// supplied one.
    #[error("transaction reverted: {}", .reason.as_deref().unwrap_or("no reason given"))]
    Reverted { reason: Option<String> },
    /// The node or network could not be reached.
    #[error("chain transport failure: {0}")]
    Transport(String),
}

impl ChainError {
    /// Revert reason, when this failure carries one.
    pub fn revert_reason(&self) -> Option<&str> {
        match self {
            ChainError::Reverted { reason } => reason.as_deref(),
            _ => None,
        }
    }
}

/// Wallet-originated events the session manager reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    AccountsChanged(Vec<Address>),
    /// Payload is opaque to this layer; the reaction is always a full
    /// client reload.
    ChainChanged,
}

/// Opaque signing capability bound to one account.
pub trait TransactionSigner: Send + Sync {
    fn account(&self) -> &Address;
}

/// The browser wallet boundary.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Ask the wallet for account access. An empty list means the user has
    /// exposed no accounts; a rejection surfaces as [`ChainError::Rejected`].
    async fn request_accounts(&self) -> Result<Vec<Address>, ChainError>;

    /// Signing capability for the wallet's current account.
    async fn signer(&self) -> Result<std::sync::Arc<dyn TransactionSigner>, ChainError>;

    /// Identity of the network the wallet is currently on.
    async fn network(&self) -> Result<NetworkInfo, ChainError>;

    /// Subscribe to wallet-originated events. Each call returns a fresh
    /// receiver; dropping it ends the subscription.
    fn subscribe(&self) -> UnboundedReceiver<WalletEvent>;
}

/// A product row exactly as the contract returns it.
#[derive(Debug, Clone, PartialEq)]
pub struct OnChainProduct {
    pub id: u64,
    pub name: String,
    pub price: U256,
    pub image_urls: Vec<String>,
    pub description: String,
    pub owner: Address,
    pub is_sold: bool,
}

/// Arguments for the contract's register method.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterProductCall {
    pub name: String,
    pub price_wei: U256,
    pub image_urls: Vec<String>,
    pub description: String,
}

/// Arguments for the contract's purchase method. `value_wei` is attached as
/// the value sent with the call.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseProductCall {
    pub product_id: u64,
    pub value_wei: U256,
}

/// Receipt for a transaction accepted into canonical history.
#[derive(Debug, Clone)]
pub struct TxReceipt {
    pub tx_hash: String,
}

/// A submitted transaction that has not been confirmed yet.
#[async_trait]
pub trait PendingTransaction: Send {
    fn tx_hash(&self) -> &str;

    /// Resolves once the transaction is mined, or fails with the revert
    /// reason. Writes are not complete until this resolves.
    async fn confirmed(self: Box<Self>) -> Result<TxReceipt, ChainError>;
}

/// The marketplace contract boundary (fixed interface, implemented outside
/// this repository).
#[async_trait]
pub trait MarketContract: Send + Sync {
    /// Every product ever listed, sold ones included.
    async fn get_all_products(&self) -> Result<Vec<OnChainProduct>, ChainError>;

    async fn register_product(
        &self,
        signer: &dyn TransactionSigner,
        call: RegisterProductCall,
    ) -> Result<Box<dyn PendingTransaction>, ChainError>;

    async fn purchase_product(
        &self,
        signer: &dyn TransactionSigner,
        call: PurchaseProductCall,
    ) -> Result<Box<dyn PendingTransaction>, ChainError>;
}
