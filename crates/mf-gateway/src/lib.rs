//! Chain read/write gateway.
//!
//! Wraps the marketplace contract behind the session's signing capability:
//! listing reads degrade gracefully, writes await on-chain confirmation
//! before resolving. The gateway is a pure relay: it never pre-validates
//! ownership or sold status; the contract is the source of truth.

use mf_api_types::{MarketError, Product};
use mf_chain_client::{
    ChainError, MarketContract, OnChainProduct, PurchaseProductCall, RegisterProductCall,
    TxReceipt,
};
use mf_reporter::{OperationKind, StatusSink, observe};
use mf_session::SessionHandle;
use std::sync::Arc;

pub mod flows;
pub mod units;

pub const MSG_LIST_PENDING: &str = "Loading product listing...";
pub const MSG_LIST_FAILED: &str = "Failed to load product listing.";

/// Read/write access to the marketplace contract, bound to the wallet
/// session.
pub struct MarketGateway {
    contract: Option<Arc<dyn MarketContract>>,
    session: SessionHandle,
    sink: Arc<dyn StatusSink>,
}

impl MarketGateway {
    /// `contract` is `None` when no provider is bound (read-only landing
    /// view without a wallet).
    pub fn new(
        contract: Option<Arc<dyn MarketContract>>,
        session: SessionHandle,
        sink: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            contract,
            session,
            sink,
        }
    }

    pub fn session(&self) -> SessionHandle {
        self.session.clone()
    }

    /// Unsold products in contract-returned order, prices rendered as
    /// decimal strings.
    ///
    /// Never fails: a missing contract binding or any transport/contract
    /// error is reported through the sink and degrades to an empty listing.
    pub async fn list_products(&self) -> Vec<Product> {
        observe(
            self.sink.as_ref(),
            OperationKind::List,
            MSG_LIST_PENDING,
            MSG_LIST_FAILED,
            self.fetch_listing(),
            |products: &Vec<Product>| format!("Loaded {} products.", products.len()),
            |err: &MarketError| match err {
                MarketError::NoWallet => Some(err.to_string()),
                other => other.reason(),
            },
        )
        .await
        .unwrap_or_default()
    }

    async fn fetch_listing(&self) -> Result<Vec<Product>, MarketError> {
        let contract = self.contract.as_ref().ok_or(MarketError::NoWallet)?;
        let products = contract
            .get_all_products()
            .await
            .map_err(|err| MarketError::Read(err.to_string()))?;
        Ok(products
            .into_iter()
            .filter(|product| !product.is_sold)
            .map(into_product)
            .collect())
    }

    /// Register a product on-chain and wait for confirmation.
    ///
    /// `price` must be a positive decimal string; the wei conversion is
    /// exact. The returned future resolves only once the transaction is
    /// mined; callers refresh their listing after that.
    pub async fn register_product(
        &self,
        name: &str,
        price: &str,
        image_urls: Vec<String>,
        description: &str,
    ) -> Result<TxReceipt, MarketError> {
        let signer = self.session.signer().await.ok_or(MarketError::NoSigner)?;
        let contract = self.contract.clone().ok_or(MarketError::NoWallet)?;

        let price_wei = units::to_wei(price)?;
        if price_wei.is_zero() {
            return Err(MarketError::InvalidInput(format!(
                "price must be positive: {price}"
            )));
        }

        let pending = contract
            .register_product(
                signer.as_ref(),
                RegisterProductCall {
                    name: name.to_owned(),
                    price_wei,
                    image_urls,
                    description: description.to_owned(),
                },
            )
            .await
            .map_err(chain_to_market)?;
        pending.confirmed().await.map_err(chain_to_market)
    }

    /// Purchase a product, attaching `price` (converted to wei) as the call
    /// value, and wait for confirmation.
    ///
    /// No local ownership or sold checks happen here; the contract alone
    /// decides whether the purchase is valid.
    pub async fn purchase_product(
        &self,
        product_id: u64,
        price: &str,
    ) -> Result<TxReceipt, MarketError> {
        let signer = self.session.signer().await.ok_or(MarketError::NoSigner)?;
        let contract = self.contract.clone().ok_or(MarketError::NoWallet)?;
        let value_wei = units::to_wei(price)?;

        let pending = contract
            .purchase_product(
                signer.as_ref(),
                PurchaseProductCall {
                    product_id,
                    value_wei,
                },
            )
            .await
            .map_err(chain_to_market)?;
        pending.confirmed().await.map_err(chain_to_market)
    }
}

fn into_product(raw: OnChainProduct) -> Product {
    Product {
        id: raw.id,
        name: raw.name,
        description: raw.description,
        price: units::to_decimal(raw.price),
        price_wei: raw.price,
        seller: raw.owner,
        image_urls: raw.image_urls,
        sold: raw.is_sold,
    }
}

fn chain_to_market(err: ChainError) -> MarketError {
    match err {
        ChainError::Reverted { reason } => MarketError::Transaction { reason },
        ChainError::Rejected(reason) => MarketError::Transaction {
            reason: Some(reason),
        },
        ChainError::Transport(detail) => {
            tracing::warn!("chain transport failure during write: {detail}");
            MarketError::Transaction { reason: None }
        }
    }
}
