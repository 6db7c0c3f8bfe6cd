//! Wallet session lifecycle.
//!
//! One [`Session`] per client instance, written only by the
//! [`SessionManager`] and read everywhere else through a cloneable
//! [`SessionHandle`]. The manager also consumes wallet-originated events:
//! account switches update the session in place, a network switch requests a
//! full client reload through the injected [`ReloadHandler`].

use mf_api_types::{Address, MarketError, NetworkInfo};
use mf_chain_client::{TransactionSigner, WalletEvent, WalletProvider};
use mf_reporter::{Notice, StatusSink};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const MSG_NO_WALLET: &str = "No wallet detected. Install a browser wallet to continue.";
pub const MSG_CONNECT_FAILED: &str = "Failed to connect wallet.";
pub const MSG_CONNECTED: &str = "Wallet connected.";
pub const MSG_DISCONNECTED: &str = "Wallet disconnected.";
pub const MSG_NETWORK_CHANGED: &str = "Network changed. Reloading application.";

/// The wallet session. `connected` is derived: a session is connected
/// exactly when it has an account.
#[derive(Clone, Default)]
pub struct Session {
    pub account: Option<Address>,
    pub signer: Option<Arc<dyn TransactionSigner>>,
    pub network: Option<NetworkInfo>,
}

impl Session {
    pub fn is_connected(&self) -> bool {
        self.account.is_some()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("account", &self.account)
            .field("signer", &self.signer.as_ref().map(|_| "<bound>"))
            .field("network", &self.network)
            .finish()
    }
}

/// Shared read access to the process-wide session.
///
/// Writes stay inside this crate so only the session manager can mutate the
/// session; any number of views may hold clones and read concurrently.
#[derive(Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Session>>,
}

impl SessionHandle {
    pub async fn snapshot(&self) -> Session {
        self.inner.read().await.clone()
    }

    pub async fn account(&self) -> Option<Address> {
        self.inner.read().await.account.clone()
    }

    pub async fn signer(&self) -> Option<Arc<dyn TransactionSigner>> {
        self.inner.read().await.signer.clone()
    }

    pub async fn network(&self) -> Option<NetworkInfo> {
        self.inner.read().await.network.clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.read().await.is_connected()
    }

    pub(crate) async fn replace(&self, session: Session) {
        *self.inner.write().await = session;
    }

    pub(crate) async fn reset(&self) {
        *self.inner.write().await = Session::default();
    }
}

/// Host hook for the network-change reaction: cached contract bindings are
/// stale once the wallet moves chains, and a full reload is the only safe
/// way to rebuild them.
pub trait ReloadHandler: Send + Sync {
    fn request_reload(&self);
}

/// Default reload handler for hosts without a reload concept.
#[derive(Debug, Default)]
pub struct NoopReload;

impl ReloadHandler for NoopReload {
    fn request_reload(&self) {}
}

/// Owns the wallet connection lifecycle.
pub struct SessionManager {
    provider: Option<Arc<dyn WalletProvider>>,
    session: SessionHandle,
    sink: Arc<dyn StatusSink>,
    reload: Arc<dyn ReloadHandler>,
}

impl SessionManager {
    /// `provider` is `None` when the host environment exposes no wallet.
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        sink: Arc<dyn StatusSink>,
        reload: Arc<dyn ReloadHandler>,
    ) -> Self {
        Self {
            provider,
            session: SessionHandle::default(),
            sink,
            reload,
        }
    }

    /// Handle consumers read the session through.
    pub fn session(&self) -> SessionHandle {
        self.session.clone()
    }

    /// Request account access and populate the session.
    ///
    /// An empty account list leaves the session unconnected without an
    /// error. Any provider failure leaves no partial state behind.
    pub async fn connect(&self) -> Result<(), MarketError> {
        let Some(provider) = &self.provider else {
            self.sink.notify(Notice::Failure, MSG_NO_WALLET);
            return Err(MarketError::NoWallet);
        };

        let accounts = match provider.request_accounts().await {
            Ok(accounts) => accounts,
            Err(err) => {
                tracing::warn!("wallet connect rejected: {err}");
                self.sink.notify(Notice::Failure, MSG_CONNECT_FAILED);
                return Err(MarketError::Provider(err.to_string()));
            }
        };
        let Some(account) = accounts.first().cloned() else {
            return Ok(());
        };

        // Gather the signer and network before touching the session so a
        // failure here leaves it exactly as it was.
        let signer = match provider.signer().await {
            Ok(signer) => signer,
            Err(err) => {
                tracing::warn!("signer unavailable on connect: {err}");
                self.sink.notify(Notice::Failure, MSG_CONNECT_FAILED);
                return Err(MarketError::Provider(err.to_string()));
            }
        };
        let network = match provider.network().await {
            Ok(network) => network,
            Err(err) => {
                tracing::warn!("network identity unavailable on connect: {err}");
                self.sink.notify(Notice::Failure, MSG_CONNECT_FAILED);
                return Err(MarketError::Provider(err.to_string()));
            }
        };

        self.session
            .replace(Session {
                account: Some(account),
                signer: Some(signer),
                network: Some(network),
            })
            .await;
        self.sink.notify(Notice::Success, MSG_CONNECTED);
        Ok(())
    }

    /// Reset to the unconnected state. Idempotent.
    pub async fn disconnect(&self) {
        self.session.reset().await;
        self.sink.notify(Notice::Info, MSG_DISCONNECTED);
    }

    /// React to one wallet-originated event.
    pub async fn handle_event(&self, event: WalletEvent) {
        match event {
            WalletEvent::AccountsChanged(accounts) => {
                if let Some(account) = accounts.first().cloned() {
                    self.switch_account(account).await;
                } else {
                    self.disconnect().await;
                }
            }
            WalletEvent::ChainChanged => {
                self.sink.notify(Notice::Info, MSG_NETWORK_CHANGED);
                self.reload.request_reload();
            }
        }
    }

    /// Subscribe to the provider's event stream and consume it until the
    /// provider drops its end. The subscription lives exactly as long as
    /// this call.
    pub async fn drive(&self) {
        let Some(provider) = &self.provider else {
            return;
        };
        let mut events = provider.subscribe();
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
    }

    async fn switch_account(&self, account: Address) {
        // A signer bound to the previous account must not survive the
        // switch. If re-derivation fails the session stays connected with no
        // signer and the next write surfaces NoSigner.
        let signer = match &self.provider {
            Some(provider) => match provider.signer().await {
                Ok(signer) => Some(signer),
                Err(err) => {
                    tracing::warn!("signer re-derivation failed after account change: {err}");
                    None
                }
            },
            None => None,
        };

        let network = self.session.network().await;
        self.session
            .replace(Session {
                account: Some(account.clone()),
                signer,
                network,
            })
            .await;
        self.sink
            .notify(Notice::Success, &format!("Account changed: {}", account.short()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mf_chain_client::StaticWallet;
    use mf_reporter::RecordingSink;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingReload {
        requests: AtomicUsize,
    }

    impl ReloadHandler for CountingReload {
        fn request_reload(&self) {
            self.requests.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn addr(value: &str) -> Address {
        Address(value.to_owned())
    }

    fn manager_with(
        provider: Option<Arc<dyn WalletProvider>>,
    ) -> (SessionManager, Arc<RecordingSink>, Arc<CountingReload>) {
        let sink = Arc::new(RecordingSink::default());
        let reload = Arc::new(CountingReload::default());
        let manager = SessionManager::new(provider, sink.clone(), reload.clone());
        (manager, sink, reload)
    }

    #[tokio::test]
    async fn connect_without_a_wallet_fails_and_stays_unconnected() {
        let (manager, sink, _) = manager_with(None);

        let err = manager.connect().await.unwrap_err();

        assert!(matches!(err, MarketError::NoWallet));
        assert!(!manager.session().is_connected().await);
        let notices = sink.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].0, Notice::Failure);
        assert!(notices[0].1.contains("Install a browser wallet"));
    }

    #[tokio::test]
    async fn connect_adopts_the_first_account() -> anyhow::Result<()> {
        let wallet = Arc::new(StaticWallet::new(vec![
            addr("0xABC0000000000000000000000000000000000123"),
            addr("0xDEF0000000000000000000000000000000000456"),
        ]));
        let (manager, sink, _) = manager_with(Some(wallet));

        manager.connect().await?;

        let session = manager.session().snapshot().await;
        assert!(session.is_connected());
        assert_eq!(
            session.account,
            Some(addr("0xABC0000000000000000000000000000000000123")),
        );
        assert!(session.signer.is_some());
        assert_eq!(session.network.map(|n| n.chain_id), Some(31337));
        assert_eq!(
            sink.notices(),
            vec![(Notice::Success, MSG_CONNECTED.to_owned())],
        );
        Ok(())
    }

    #[tokio::test]
    async fn connect_with_no_exposed_accounts_stays_unconnected() -> anyhow::Result<()> {
        let wallet = Arc::new(StaticWallet::new(Vec::new()));
        let (manager, sink, _) = manager_with(Some(wallet));

        manager.connect().await?;

        assert!(!manager.session().is_connected().await);
        assert!(sink.notices().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn rejected_connect_leaves_no_partial_state() {
        let wallet = Arc::new(StaticWallet::denying("user rejected"));
        let (manager, sink, _) = manager_with(Some(wallet));

        let err = manager.connect().await.unwrap_err();

        assert!(matches!(err, MarketError::Provider(_)));
        let session = manager.session().snapshot().await;
        assert!(!session.is_connected());
        assert!(session.signer.is_none());
        assert!(session.network.is_none());
        assert_eq!(
            sink.notices(),
            vec![(Notice::Failure, MSG_CONNECT_FAILED.to_owned())],
        );
    }

    #[tokio::test]
    async fn reconnect_overwrites_the_existing_session() -> anyhow::Result<()> {
        let wallet = Arc::new(StaticWallet::new(vec![addr(
            "0xABC0000000000000000000000000000000000123",
        )]));
        let (manager, _, _) = manager_with(Some(wallet.clone()));

        manager.connect().await?;
        wallet.set_accounts(vec![addr("0xDEF0000000000000000000000000000000000456")]);
        manager.connect().await?;

        assert_eq!(
            manager.session().account().await,
            Some(addr("0xDEF0000000000000000000000000000000000456")),
        );
        Ok(())
    }

    #[tokio::test]
    async fn account_change_rebinds_account_and_signer() -> anyhow::Result<()> {
        let wallet = Arc::new(StaticWallet::new(vec![addr(
            "0xABC0000000000000000000000000000000000123",
        )]));
        let (manager, sink, _) = manager_with(Some(wallet.clone()));
        manager.connect().await?;

        let switched = addr("0xDEF0000000000000000000000000000000000456");
        wallet.set_accounts(vec![switched.clone()]);
        manager
            .handle_event(WalletEvent::AccountsChanged(vec![switched.clone()]))
            .await;

        let session = manager.session().snapshot().await;
        assert_eq!(session.account, Some(switched.clone()));
        assert_eq!(
            session.signer.map(|signer| signer.account().clone()),
            Some(switched),
        );
        // Connect notice plus the account-change notice.
        let notices = sink.notices();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[1].0, Notice::Success);
        assert!(notices[1].1.starts_with("Account changed: 0xDEF0"));
        Ok(())
    }

    #[tokio::test]
    async fn empty_account_change_resets_like_disconnect() -> anyhow::Result<()> {
        let wallet = Arc::new(StaticWallet::new(vec![addr(
            "0xABC0000000000000000000000000000000000123",
        )]));
        let (manager, sink, _) = manager_with(Some(wallet));
        manager.connect().await?;

        manager
            .handle_event(WalletEvent::AccountsChanged(Vec::new()))
            .await;

        assert!(!manager.session().is_connected().await);
        assert_eq!(
            sink.notices().last().cloned(),
            Some((Notice::Info, MSG_DISCONNECTED.to_owned())),
        );
        Ok(())
    }

    #[tokio::test]
    async fn chain_change_requests_a_full_reload() -> anyhow::Result<()> {
        let wallet = Arc::new(StaticWallet::new(vec![addr(
            "0xABC0000000000000000000000000000000000123",
        )]));
        let (manager, sink, reload) = manager_with(Some(wallet));
        manager.connect().await?;

        manager.handle_event(WalletEvent::ChainChanged).await;

        assert_eq!(reload.requests.load(Ordering::SeqCst), 1);
        assert_eq!(
            sink.notices().last().cloned(),
            Some((Notice::Info, MSG_NETWORK_CHANGED.to_owned())),
        );
        Ok(())
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let (manager, sink, _) = manager_with(None);

        manager.disconnect().await;
        manager.disconnect().await;

        assert!(!manager.session().is_connected().await);
        assert_eq!(sink.notices().len(), 2);
    }
}
