//! State store interfaces and the reference in-memory store.
//!
//! Writers never touch state directly: every mutation flows through
//! `StateSink::dispatch` as a typed `WalletEvent`, and readers take
//! snapshots through `StateView`. `MemoryStore` is the single-writer
//! reference implementation used by the subscription manager and the
//! test suites; real frontends supply their own sink over the same
//! events.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::WalletResult;
use crate::types::{DisplayAsset, LocalTx};
use crate::wallet::vault::SealedTree;

/// Typed state mutations. The sealed raw tree and the display
/// projection travel as separate events so a sink can persist them
/// to different backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WalletEvent {
    /// Replace the display projection (addresses only, no secrets)
    SetAssets {
        assets: Vec<DisplayAsset>,
        owner: Option<String>,
    },
    /// Replace the sealed raw asset tree
    SetAssetsRaw(SealedTree),
    /// Append a synthesized pending transaction if its txid is unseen
    PushLocalTx { symbol: String, tx: LocalTx },
}

/// The only write path into wallet state
pub trait StateSink {
    fn dispatch(&self, event: WalletEvent);
}

/// Snapshot reads of wallet state
pub trait StateView {
    fn assets(&self) -> Vec<DisplayAsset>;
    fn raw(&self) -> Option<SealedTree>;
}

/// Best-effort remote replica of the sealed (pruned) tree
pub trait RemoteSync {
    fn upload(
        &self,
        owner: &str,
        sealed: &SealedTree,
    ) -> impl std::future::Future<Output = WalletResult<()>> + Send;
}

/// RemoteSync that drops every upload. Used when no owner identity
/// is configured and throughout the tests.
#[derive(Debug, Default, Clone)]
pub struct NullRemote;

impl RemoteSync for NullRemote {
    async fn upload(&self, _owner: &str, _sealed: &SealedTree) -> WalletResult<()> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    assets: Vec<DisplayAsset>,
    raw: Option<SealedTree>,
    owner: Option<String>,
}

/// Reference single-writer store applying events as value transforms
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(&self) -> Option<String> {
        match self.inner.read() {
            Ok(guard) => guard.owner.clone(),
            Err(poisoned) => poisoned.into_inner().owner.clone(),
        }
    }
}

impl StateSink for MemoryStore {
    fn dispatch(&self, event: WalletEvent) {
        let mut inner = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match event {
            WalletEvent::SetAssets { mut assets, owner } => {
                // confirmed entries supersede pending ones: a txid may
                // live in local_txs or in an address's history, never both
                for asset in &mut assets {
                    let confirmed: Vec<String> = asset
                        .addresses
                        .iter()
                        .flat_map(|a| a.txs.iter().map(|t| t.txid.clone()))
                        .collect();
                    asset.local_txs.retain(|t| !confirmed.contains(&t.txid));
                }
                inner.assets = assets;
                inner.owner = owner;
            }
            WalletEvent::SetAssetsRaw(sealed) => {
                inner.raw = Some(sealed);
            }
            WalletEvent::PushLocalTx { symbol, tx } => {
                if let Some(asset) = inner.assets.iter_mut().find(|a| a.symbol == symbol) {
                    if !asset.knows_txid(&tx.txid) {
                        asset.local_txs.push(tx);
                    }
                }
            }
        }
    }
}

impl StateView for MemoryStore {
    fn assets(&self) -> Vec<DisplayAsset> {
        match self.inner.read() {
            Ok(guard) => guard.assets.clone(),
            Err(poisoned) => poisoned.into_inner().assets.clone(),
        }
    }

    fn raw(&self) -> Option<SealedTree> {
        match self.inner.read() {
            Ok(guard) => guard.raw.clone(),
            Err(poisoned) => poisoned.into_inner().raw.clone(),
        }
    }
}

impl<T: StateSink + ?Sized> StateSink for std::sync::Arc<T> {
    fn dispatch(&self, event: WalletEvent) {
        (**self).dispatch(event);
    }
}

impl<T: StateView + ?Sized> StateView for std::sync::Arc<T> {
    fn assets(&self) -> Vec<DisplayAsset> {
        (**self).assets()
    }

    fn raw(&self) -> Option<SealedTree> {
        (**self).raw()
    }
}
