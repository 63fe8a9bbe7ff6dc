//! Reconciliation and subscription flows against the in-memory store.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use wallet_core::reconcile::{Disposition, Reconciler};
use wallet_core::subscribe::{NodeChannel, PushChannel, SubscriptionManager, TxidEvent};
use wallet_core::types::{RawAccountTx, RawUtxoTx, UtxoTxIo, BLOCK_NO_PENDING};
use wallet_core::{
    AddressRecord, ChainCategory, ChainTx, DisplayAsset, MemoryStore, StateSink, StateView,
    WalletError, WalletEvent, WalletResult,
};

fn asset(asset_type: &str, symbol: &str, chain: ChainCategory, addr: &str) -> DisplayAsset {
    DisplayAsset {
        asset_type: asset_type.to_string(),
        symbol: symbol.to_string(),
        display_name: symbol.to_string(),
        chain,
        decimals: if chain == ChainCategory::Utxo { 8 } else { 18 },
        addresses: vec![AddressRecord {
            symbol: symbol.to_string(),
            addr: addr.to_string(),
            account_name: format!("Main {}", symbol),
            path: "m/44'/0'/0'/0/0".to_string(),
            txs: Vec::new(),
            utxos: Vec::new(),
            last_addr_fetch_at: None,
        }],
        local_txs: Vec::new(),
    }
}

fn btc_incoming(txid: &str, addr: &str, value: u64) -> RawUtxoTx {
    RawUtxoTx {
        txid: txid.to_string(),
        fee: 150,
        inputs: vec![UtxoTxIo {
            txid: Some("prior".to_string()),
            addr: "1sender".to_string(),
            value: value + 150,
        }],
        outputs: vec![UtxoTxIo {
            txid: None,
            addr: addr.to_string(),
            value,
        }],
    }
}

#[test]
fn reobservation_after_commit_is_ignored() {
    let store = Arc::new(MemoryStore::new());
    let btc = asset("bitcoin", "BTC", ChainCategory::Utxo, "1ours");
    store.dispatch(WalletEvent::SetAssets {
        assets: vec![btc],
        owner: None,
    });

    let reconciler = Reconciler::new(Arc::clone(&store));
    let tx = btc_incoming("t1", "1ours", 9_000);
    let mut spent = HashSet::new();

    let snapshot = store.assets().remove(0);
    assert_eq!(
        reconciler.observe_utxo(&snapshot, &tx, &mut spent),
        Disposition::Committed
    );

    let snapshot = store.assets().remove(0);
    assert_eq!(
        reconciler.observe_utxo(&snapshot, &tx, &mut spent),
        Disposition::Ignored
    );

    let txs = &store.assets()[0].local_txs;
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].block_no, BLOCK_NO_PENDING);
    assert_eq!(txs[0].value, 9_000);
}

#[test]
fn confirmation_supersedes_the_pending_entry() {
    let store = Arc::new(MemoryStore::new());
    let mut btc = asset("bitcoin", "BTC", ChainCategory::Utxo, "1ours");
    store.dispatch(WalletEvent::SetAssets {
        assets: vec![btc.clone()],
        owner: None,
    });

    let reconciler = Reconciler::new(Arc::clone(&store));
    let mut spent = HashSet::new();
    let snapshot = store.assets().remove(0);
    reconciler.observe_utxo(&snapshot, &btc_incoming("t1", "1ours", 9_000), &mut spent);
    assert_eq!(store.assets()[0].local_txs.len(), 1);

    // the address fetch later reports the same txid confirmed
    btc.addresses[0].txs.push(ChainTx {
        txid: "t1".to_string(),
        block_no: 800_000,
        value: 9_000,
        is_incoming: true,
    });
    btc.local_txs = store.assets()[0].local_txs.clone();
    store.dispatch(WalletEvent::SetAssets {
        assets: vec![btc],
        owner: None,
    });

    let snapshot = &store.assets()[0];
    assert!(snapshot.local_txs.is_empty(), "pending entry must yield");
    assert_eq!(snapshot.addresses[0].txs.len(), 1);

    // and a late redelivery of the same txid stays ignored
    assert_eq!(
        reconciler.observe_utxo(snapshot, &btc_incoming("t1", "1ours", 9_000), &mut spent),
        Disposition::Ignored
    );
}

#[test]
fn spent_set_collects_prior_txids_of_own_inputs() {
    let store = Arc::new(MemoryStore::new());
    let btc = asset("btc_seg", "BTC_SEG", ChainCategory::Utxo, "3ours");
    store.dispatch(WalletEvent::SetAssets {
        assets: vec![btc.clone()],
        owner: None,
    });

    let spend = RawUtxoTx {
        txid: "spend".to_string(),
        fee: 300,
        inputs: vec![
            UtxoTxIo {
                txid: Some("utxo-a".to_string()),
                addr: "3ours".to_string(),
                value: 40_000,
            },
            UtxoTxIo {
                txid: Some("utxo-b".to_string()),
                addr: "3ours".to_string(),
                value: 10_000,
            },
            UtxoTxIo {
                txid: Some("utxo-theirs".to_string()),
                addr: "3theirs".to_string(),
                value: 5_000,
            },
        ],
        outputs: vec![UtxoTxIo {
            txid: None,
            addr: "1recipient".to_string(),
            value: 54_700,
        }],
    };

    let reconciler = Reconciler::new(Arc::clone(&store));
    let mut spent = HashSet::new();
    let snapshot = store.assets().remove(0);
    assert_eq!(
        reconciler.observe_utxo(&snapshot, &spend, &mut spent),
        Disposition::Committed
    );
    assert_eq!(spent, HashSet::from(["utxo-a".to_string(), "utxo-b".to_string()]));
}

struct ScriptedPush {
    events: Mutex<Vec<TxidEvent>>,
    bodies: HashMap<String, RawUtxoTx>,
}

impl PushChannel for ScriptedPush {
    async fn subscribe(
        &self,
        _symbol: &str,
        _addresses: Vec<String>,
    ) -> WalletResult<mpsc::Receiver<TxidEvent>> {
        let (tx, rx) = mpsc::channel(32);
        let events = match self.events.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for event in events {
            let _ = tx.send(event).await;
        }
        Ok(rx)
    }

    async fn fetch_tx(&self, _symbol: &str, txid: &str) -> WalletResult<RawUtxoTx> {
        self.bodies
            .get(txid)
            .cloned()
            .ok_or_else(|| WalletError::transport("no such tx"))
    }
}

struct ScriptedNode {
    bodies: HashMap<String, RawAccountTx>,
}

impl NodeChannel for ScriptedNode {
    async fn get_transaction(&self, txid: &str) -> WalletResult<RawAccountTx> {
        self.bodies
            .get(txid)
            .cloned()
            .ok_or_else(|| WalletError::transport("no such tx"))
    }
}

#[tokio::test]
async fn ethereum_subscription_fetches_bodies_from_the_node() {
    const OURS: &str = "0x1111111111111111111111111111111111111111";

    let store = Arc::new(MemoryStore::new());
    let eth = asset("ethereum", "ETH", ChainCategory::Account, OURS);
    store.dispatch(WalletEvent::SetAssets {
        assets: vec![eth.clone()],
        owner: None,
    });

    let body = RawAccountTx {
        txid: "0xaa".to_string(),
        from: "0x2222222222222222222222222222222222222222".to_string(),
        to: OURS.to_string(),
        value: 3_000_000_000_000_000_000,
        gas: 21_000,
        gas_price: 1,
        block_no: None,
        input: "0x".to_string(),
    };
    let push = ScriptedPush {
        events: Mutex::new(vec![
            TxidEvent {
                symbol: "ETH".to_string(),
                txid: "0xaa".to_string(),
            },
            // duplicate delivery
            TxidEvent {
                symbol: "ETH".to_string(),
                txid: "0xaa".to_string(),
            },
        ]),
        bodies: HashMap::new(),
    };
    let node = ScriptedNode {
        bodies: HashMap::from([("0xaa".to_string(), body)]),
    };

    let (manager, mut refresh) = SubscriptionManager::new(push, node, Arc::clone(&store));
    manager.subscribe(&eth).await.unwrap();

    assert_eq!(refresh.recv().await.as_deref(), Some("ETH"));
    let snapshot = &store.assets()[0];
    assert_eq!(snapshot.local_txs.len(), 1);
    assert_eq!(snapshot.local_txs[0].value, 3_000_000_000_000_000_000);

    manager.unsubscribe("ethereum");
    assert!(!manager.is_subscribed("ethereum"));
}
