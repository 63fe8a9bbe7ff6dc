//! UTXO chain reconciliation policy.
//!
//! Sender detection is by input ownership: if any input address is
//! ours, the wallet sent this transaction and the net outgoing value
//! is own inputs minus own outputs (change) minus fee, in integer
//! satoshis. Every prior txid consumed by an own input is collected
//! into the caller's spent set so stale UTXOs can be dropped before
//! confirmation lands.

use std::collections::HashSet;

use chrono::Utc;

use crate::types::{DisplayAsset, LocalTx, RawUtxoTx, BLOCK_NO_PENDING};

/// Synthesize a pending entry, or `None` when the transaction does
/// not touch this wallet or nets to zero.
pub fn synthesize(
    asset: &DisplayAsset,
    tx: &RawUtxoTx,
    spent: &mut HashSet<String>,
) -> Option<LocalTx> {
    let own: HashSet<&str> = asset.addresses.iter().map(|r| r.addr.as_str()).collect();

    let is_sender = tx.inputs.iter().any(|i| own.contains(i.addr.as_str()));
    if is_sender {
        synthesize_outgoing(asset, tx, &own, spent)
    } else {
        synthesize_incoming(asset, tx, &own)
    }
}

fn synthesize_outgoing(
    asset: &DisplayAsset,
    tx: &RawUtxoTx,
    own: &HashSet<&str>,
    spent: &mut HashSet<String>,
) -> Option<LocalTx> {
    let mut own_in: u64 = 0;
    for input in &tx.inputs {
        if own.contains(input.addr.as_str()) {
            own_in = own_in.saturating_add(input.value);
            if let Some(prior) = &input.txid {
                spent.insert(prior.clone());
            }
        }
    }
    let own_out: u64 = tx
        .outputs
        .iter()
        .filter(|o| own.contains(o.addr.as_str()))
        .map(|o| o.value)
        .fold(0, u64::saturating_add);

    let net = own_in.saturating_sub(own_out).saturating_sub(tx.fee);
    if net == 0 {
        return None;
    }

    let recipient = tx
        .outputs
        .iter()
        .find(|o| !own.contains(o.addr.as_str()))
        .map(|o| o.addr.clone())
        .unwrap_or_default();
    let account_from = tx
        .inputs
        .iter()
        .find_map(|i| account_for(asset, &i.addr));

    Some(LocalTx {
        txid: tx.txid.clone(),
        is_incoming: false,
        date: Utc::now(),
        value: u128::from(net),
        to_or_from: recipient,
        account_to: None,
        account_from,
        block_no: BLOCK_NO_PENDING,
        fees: u128::from(tx.fee),
        erc20: None,
        erc20_contract: None,
    })
}

fn synthesize_incoming(
    asset: &DisplayAsset,
    tx: &RawUtxoTx,
    own: &HashSet<&str>,
) -> Option<LocalTx> {
    let received: u64 = tx
        .outputs
        .iter()
        .filter(|o| own.contains(o.addr.as_str()))
        .map(|o| o.value)
        .fold(0, u64::saturating_add);
    if received == 0 {
        return None;
    }

    let sender = tx.inputs.first().map(|i| i.addr.clone()).unwrap_or_default();
    let account_to = tx
        .outputs
        .iter()
        .find_map(|o| account_for(asset, &o.addr));

    Some(LocalTx {
        txid: tx.txid.clone(),
        is_incoming: true,
        date: Utc::now(),
        value: u128::from(received),
        to_or_from: sender,
        account_to,
        account_from: None,
        block_no: BLOCK_NO_PENDING,
        fees: 0,
        erc20: None,
        erc20_contract: None,
    })
}

fn account_for(asset: &DisplayAsset, addr: &str) -> Option<String> {
    asset
        .addresses
        .iter()
        .find(|r| r.addr == addr)
        .map(|r| r.account_name.clone())
}
