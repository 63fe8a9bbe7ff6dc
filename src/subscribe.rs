//! Address Subscription Manager
//!
//! Keeps one handler task per subscribed asset, fed by an injected
//! push channel. UTXO assets fetch transaction bodies from the push
//! channel itself; the Ethereum asset only takes txid notifications
//! from it and fetches bodies through the node channel, whose view is
//! dependable for account chains. ERC-20 tokens are never subscribed
//! directly - their traffic arrives through the base Ethereum
//! subscription.
//!
//! Delivery is deduplicated per channel kind by txid, so repeated
//! pushes of the same transaction reconcile once. `unsubscribe`
//! aborts the handler synchronously and discards its dedupe state;
//! it is the only cancellation primitive here.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config;
use crate::error::WalletResult;
use crate::reconcile::Reconciler;
use crate::store::{StateSink, StateView};
use crate::types::{ChainCategory, DisplayAsset, RawAccountTx, RawUtxoTx};
use crate::{log_debug, log_info, log_warn};

/// Push notification: a txid seen for one of the subscribed addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxidEvent {
    pub symbol: String,
    pub txid: String,
}

/// Explorer-backed push subscriptions and UTXO transaction bodies
pub trait PushChannel: Send + Sync + 'static {
    fn subscribe(
        &self,
        symbol: &str,
        addresses: Vec<String>,
    ) -> impl Future<Output = WalletResult<mpsc::Receiver<TxidEvent>>> + Send;

    fn fetch_tx(
        &self,
        symbol: &str,
        txid: &str,
    ) -> impl Future<Output = WalletResult<RawUtxoTx>> + Send;
}

/// Node-backed transaction bodies for account chains
pub trait NodeChannel: Send + Sync + 'static {
    fn get_transaction(
        &self,
        txid: &str,
    ) -> impl Future<Output = WalletResult<RawAccountTx>> + Send;
}

pub struct SubscriptionManager<P, N, S> {
    push: Arc<P>,
    node: Arc<N>,
    store: Arc<S>,
    refresh: mpsc::UnboundedSender<String>,
    handlers: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl<P, N, S> SubscriptionManager<P, N, S>
where
    P: PushChannel,
    N: NodeChannel,
    S: StateSink + StateView + Send + Sync + 'static,
{
    /// Returns the manager and the refresh stream: one symbol per
    /// committed reconciliation, for frontends to re-pull state.
    pub fn new(push: P, node: N, store: Arc<S>) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (refresh, refresh_rx) = mpsc::unbounded_channel();
        (
            Self {
                push: Arc::new(push),
                node: Arc::new(node),
                store,
                refresh,
                handlers: Mutex::new(HashMap::new()),
            },
            refresh_rx,
        )
    }

    pub fn is_subscribed(&self, asset_type: &str) -> bool {
        lock_unpoisoned(&self.handlers).contains_key(asset_type)
    }

    /// Subscribe one asset's addresses. Token assets and repeat calls
    /// are no-ops.
    pub async fn subscribe(&self, asset: &DisplayAsset) -> WalletResult<()> {
        let Some(meta) = config::meta_for(&asset.asset_type) else {
            log_debug!("subscribe", "unknown asset type skipped", asset = asset.asset_type);
            return Ok(());
        };
        if meta.is_erc20() {
            log_debug!(
                "subscribe",
                "token covered via base asset",
                asset = asset.asset_type
            );
            return Ok(());
        }
        if self.is_subscribed(&asset.asset_type) {
            return Ok(());
        }

        let events = self
            .push
            .subscribe(&asset.symbol, asset.own_addresses())
            .await?;

        let handle = match meta.chain {
            ChainCategory::Utxo => self.spawn_utxo_handler(asset.symbol.clone(), events),
            ChainCategory::Account => self.spawn_account_handler(asset.symbol.clone(), events),
        };
        lock_unpoisoned(&self.handlers).insert(asset.asset_type.clone(), handle);

        log_info!(
            "subscribe",
            "asset subscribed",
            asset = asset.asset_type,
            addresses = asset.addresses.len()
        );
        Ok(())
    }

    /// Abort the asset's handler and drop its dedupe state. Safe to
    /// call for assets that were never subscribed.
    pub fn unsubscribe(&self, asset_type: &str) {
        if let Some(handle) = lock_unpoisoned(&self.handlers).remove(asset_type) {
            handle.abort();
            log_info!("subscribe", "asset unsubscribed", asset = asset_type);
        }
    }

    pub fn unsubscribe_all(&self) {
        let mut handlers = lock_unpoisoned(&self.handlers);
        for (asset_type, handle) in handlers.drain() {
            handle.abort();
            log_debug!("subscribe", "asset unsubscribed", asset = asset_type);
        }
    }

    fn spawn_utxo_handler(
        &self,
        symbol: String,
        mut events: mpsc::Receiver<TxidEvent>,
    ) -> JoinHandle<()> {
        let push = Arc::clone(&self.push);
        let store = Arc::clone(&self.store);
        let refresh = self.refresh.clone();

        tokio::spawn(async move {
            let reconciler = Reconciler::new(Arc::clone(&store));
            let mut seen_push: HashSet<String> = HashSet::new();
            let mut spent: HashSet<String> = HashSet::new();

            while let Some(event) = events.recv().await {
                if !seen_push.insert(event.txid.clone()) {
                    continue;
                }
                let tx = match push.fetch_tx(&symbol, &event.txid).await {
                    Ok(tx) => tx,
                    Err(e) => {
                        log_warn!(
                            "subscribe",
                            "tx body fetch failed",
                            symbol = symbol,
                            txid = event.txid,
                            error = e
                        );
                        continue;
                    }
                };
                let Some(snapshot) = store.assets().into_iter().find(|a| a.symbol == symbol)
                else {
                    continue;
                };
                if reconciler.observe_utxo(&snapshot, &tx, &mut spent)
                    == crate::reconcile::Disposition::Committed
                {
                    let _ = refresh.send(symbol.clone());
                }
            }
        })
    }

    fn spawn_account_handler(
        &self,
        symbol: String,
        mut events: mpsc::Receiver<TxidEvent>,
    ) -> JoinHandle<()> {
        let node = Arc::clone(&self.node);
        let store = Arc::clone(&self.store);
        let refresh = self.refresh.clone();

        tokio::spawn(async move {
            let reconciler = Reconciler::new(Arc::clone(&store));
            let mut seen_push: HashSet<String> = HashSet::new();
            let mut seen_node: HashSet<String> = HashSet::new();

            while let Some(event) = events.recv().await {
                if !seen_push.insert(event.txid.clone()) {
                    continue;
                }
                let tx = match node.get_transaction(&event.txid).await {
                    Ok(tx) => tx,
                    Err(e) => {
                        log_warn!(
                            "subscribe",
                            "tx body fetch failed",
                            symbol = symbol,
                            txid = event.txid,
                            error = e
                        );
                        continue;
                    }
                };
                if !seen_node.insert(tx.txid.clone()) {
                    continue;
                }

                // a call into a configured token contract belongs to
                // that token asset; anything else is base-chain value
                let snapshots = store.assets();
                let token_type = config::erc20_by_contract(&tx.to).map(|m| m.asset_type);
                let mut committed = false;
                for asset in snapshots.iter().filter(|a| match token_type {
                    Some(token_type) => a.asset_type == token_type,
                    None => a.symbol == symbol,
                }) {
                    if reconciler.observe_account(asset, &tx)
                        == crate::reconcile::Disposition::Committed
                    {
                        committed = true;
                    }
                }
                if committed {
                    let _ = refresh.send(symbol.clone());
                }
            }
        })
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
