//! In-memory doubles for the wallet and contract boundaries.
//!
//! [`InMemoryMarket`] applies the same guards the deployed contract
//! enforces (unknown id, already sold, self-purchase, underpayment), so
//! callers exercise real revert paths without a node.

use crate::{
    ChainError, MarketContract, OnChainProduct, PendingTransaction, PurchaseProductCall,
    RegisterProductCall, TransactionSigner, TxReceipt, WalletEvent, WalletProvider,
};
use async_trait::async_trait;
use mf_api_types::{Address, NetworkInfo};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Signing capability pinned to one account.
#[derive(Debug, Clone)]
pub struct StaticSigner {
    account: Address,
}

impl StaticSigner {
    pub fn new(account: Address) -> Self {
        Self { account }
    }
}

impl TransactionSigner for StaticSigner {
    fn account(&self) -> &Address {
        &self.account
    }
}

/// Wallet double with a fixed account list and a push-style event feed.
pub struct StaticWallet {
    accounts: Mutex<Vec<Address>>,
    network: NetworkInfo,
    denial: Option<String>,
    subscribers: Mutex<Vec<UnboundedSender<WalletEvent>>>,
}

impl StaticWallet {
    pub fn new(accounts: Vec<Address>) -> Self {
        Self {
            accounts: Mutex::new(accounts),
            network: NetworkInfo {
                chain_id: 31337,
                name: "localnet".to_owned(),
            },
            denial: None,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Wallet that refuses account access with `reason`.
    pub fn denying(reason: &str) -> Self {
        let mut wallet = Self::new(Vec::new());
        wallet.denial = Some(reason.to_owned());
        wallet
    }

    pub fn with_network(mut self, network: NetworkInfo) -> Self {
        self.network = network;
        self
    }

    /// Replace the exposed account list, as a wallet does when the user
    /// switches accounts. Pair with an `AccountsChanged` emit.
    pub fn set_accounts(&self, accounts: Vec<Address>) {
        *self.accounts.lock().expect("accounts lock") = accounts;
    }

    /// Push an event to every live subscriber.
    pub fn emit(&self, event: WalletEvent) {
        let mut subscribers = self.subscribers.lock().expect("subscribers lock");
        subscribers.retain(|sender| sender.send(event.clone()).is_ok());
    }
}

#[async_trait]
impl WalletProvider for StaticWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, ChainError> {
        if let Some(reason) = &self.denial {
            return Err(ChainError::Rejected(reason.clone()));
        }
        Ok(self.accounts.lock().expect("accounts lock").clone())
    }

    async fn signer(&self) -> Result<Arc<dyn TransactionSigner>, ChainError> {
        let accounts = self.accounts.lock().expect("accounts lock");
        let account = accounts
            .first()
            .cloned()
            .ok_or_else(|| ChainError::Rejected("no accounts exposed".to_owned()))?;
        Ok(Arc::new(StaticSigner::new(account)))
    }

    async fn network(&self) -> Result<NetworkInfo, ChainError> {
        Ok(self.network.clone())
    }

    fn subscribe(&self) -> UnboundedReceiver<WalletEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .expect("subscribers lock")
            .push(sender);
        receiver
    }
}

/// Pending transaction whose outcome is fixed at submission time.
pub struct InstantTx {
    tx_hash: String,
    outcome: Result<(), ChainError>,
}

impl InstantTx {
    pub fn confirming(tx_hash: impl Into<String>) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            outcome: Ok(()),
        }
    }

    pub fn reverting(tx_hash: impl Into<String>, reason: &str) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            outcome: Err(ChainError::Reverted {
                reason: Some(reason.to_owned()),
            }),
        }
    }
}

#[async_trait]
impl PendingTransaction for InstantTx {
    fn tx_hash(&self) -> &str {
        &self.tx_hash
    }

    async fn confirmed(self: Box<Self>) -> Result<TxReceipt, ChainError> {
        self.outcome.map(|_| TxReceipt {
            tx_hash: self.tx_hash,
        })
    }
}

/// Contract double holding its listing in memory and recording every write
/// call it receives.
#[derive(Default)]
pub struct InMemoryMarket {
    products: Mutex<Vec<OnChainProduct>>,
    register_calls: Mutex<Vec<RegisterProductCall>>,
    purchase_calls: Mutex<Vec<PurchaseProductCall>>,
}

impl InMemoryMarket {
    pub fn with_products(products: Vec<OnChainProduct>) -> Self {
        Self {
            products: Mutex::new(products),
            ..Self::default()
        }
    }

    pub fn products(&self) -> Vec<OnChainProduct> {
        self.products.lock().expect("products lock").clone()
    }

    /// Register calls that reached the contract, in order.
    pub fn register_calls(&self) -> Vec<RegisterProductCall> {
        self.register_calls.lock().expect("calls lock").clone()
    }

    /// Purchase calls that reached the contract, in order.
    pub fn purchase_calls(&self) -> Vec<PurchaseProductCall> {
        self.purchase_calls.lock().expect("calls lock").clone()
    }

    fn tx_hash(tag: &str, sequence: usize) -> String {
        format!("0x{tag}{sequence:06x}")
    }
}

#[async_trait]
impl MarketContract for InMemoryMarket {
    async fn get_all_products(&self) -> Result<Vec<OnChainProduct>, ChainError> {
        Ok(self.products())
    }

    async fn register_product(
        &self,
        signer: &dyn TransactionSigner,
        call: RegisterProductCall,
    ) -> Result<Box<dyn PendingTransaction>, ChainError> {
        self.register_calls
            .lock()
            .expect("calls lock")
            .push(call.clone());

        let mut products = self.products.lock().expect("products lock");
        let id = products.len() as u64;
        products.push(OnChainProduct {
            id,
            name: call.name,
            price: call.price_wei,
            image_urls: call.image_urls,
            description: call.description,
            owner: signer.account().clone(),
            is_sold: false,
        });

        Ok(Box::new(InstantTx::confirming(Self::tx_hash("reg", id as usize))))
    }

    async fn purchase_product(
        &self,
        signer: &dyn TransactionSigner,
        call: PurchaseProductCall,
    ) -> Result<Box<dyn PendingTransaction>, ChainError> {
        self.purchase_calls
            .lock()
            .expect("calls lock")
            .push(call.clone());
        let hash = Self::tx_hash("buy", call.product_id as usize);

        let mut products = self.products.lock().expect("products lock");
        let Some(product) = products.iter_mut().find(|p| p.id == call.product_id) else {
            return Ok(Box::new(InstantTx::reverting(hash, "Unknown product")));
        };

        if product.is_sold {
            return Ok(Box::new(InstantTx::reverting(hash, "Already sold")));
        }
        if product.owner.matches(signer.account()) {
            return Ok(Box::new(InstantTx::reverting(
                hash,
                "Seller cannot purchase own product",
            )));
        }
        if call.value_wei < product.price {
            return Ok(Box::new(InstantTx::reverting(hash, "Insufficient payment")));
        }

        product.is_sold = true;
        Ok(Box::new(InstantTx::confirming(hash)))
    }
}
