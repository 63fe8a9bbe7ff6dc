//! Reconciliation Engine
//!
//! Turns raw observed transactions into pending `LocalTx` entries.
//! Every observed txid passes a disposition check first: anything
//! already present in the asset's pending list or in any address's
//! confirmed history is ignored, so redelivery and restarts are
//! idempotent. Committed entries are emitted through the state sink
//! as `PushLocalTx`; the engine never mutates the store directly.

pub mod account;
pub mod utxo;

use std::collections::HashSet;

use crate::store::{StateSink, WalletEvent};
use crate::types::{DisplayAsset, RawAccountTx, RawUtxoTx};
use crate::{log_debug, log_info};

/// Outcome of observing one transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Already known, irrelevant to this wallet, or undecodable
    Ignored,
    /// A pending `LocalTx` was synthesized and dispatched
    Committed,
}

pub struct Reconciler<S> {
    sink: S,
}

impl<S: StateSink> Reconciler<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Observe a UTXO-chain transaction against one asset's current
    /// snapshot. Prior txids spent by our own inputs are added to
    /// `spent` so the caller can correct stale UTXO sets.
    pub fn observe_utxo(
        &self,
        asset: &DisplayAsset,
        tx: &RawUtxoTx,
        spent: &mut HashSet<String>,
    ) -> Disposition {
        if asset.knows_txid(&tx.txid) {
            log_debug!("reconcile", "txid already known", symbol = asset.symbol, txid = tx.txid);
            return Disposition::Ignored;
        }
        match utxo::synthesize(asset, tx, spent) {
            Some(local) => {
                log_info!(
                    "reconcile",
                    "pending tx committed",
                    symbol = asset.symbol,
                    txid = local.txid,
                    incoming = local.is_incoming
                );
                self.sink.dispatch(WalletEvent::PushLocalTx {
                    symbol: asset.symbol.clone(),
                    tx: local,
                });
                Disposition::Committed
            }
            None => Disposition::Ignored,
        }
    }

    /// Observe an Ethereum-family transaction against one asset's
    /// current snapshot. Inbound only; outbound pending sends are
    /// synthesized at broadcast time by the sender, not here.
    pub fn observe_account(&self, asset: &DisplayAsset, tx: &RawAccountTx) -> Disposition {
        if asset.knows_txid(&tx.txid) {
            log_debug!("reconcile", "txid already known", symbol = asset.symbol, txid = tx.txid);
            return Disposition::Ignored;
        }
        match account::synthesize(asset, tx) {
            Some(local) => {
                log_info!(
                    "reconcile",
                    "pending tx committed",
                    symbol = asset.symbol,
                    txid = local.txid,
                    incoming = local.is_incoming
                );
                self.sink.dispatch(WalletEvent::PushLocalTx {
                    symbol: asset.symbol.clone(),
                    tx: local,
                });
                Disposition::Committed
            }
            None => Disposition::Ignored,
        }
    }
}
