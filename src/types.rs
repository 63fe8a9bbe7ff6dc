//! Shared types for the wallet core
//!
//! All data structures that cross module boundaries are defined here
//! for consistent serialization between the raw (secret) tree, the
//! displayable projection and the state-store events.
//!
//! SECURITY: every type that carries private-key material is zeroized
//! on drop; the displayable projection contains no secrets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

// =============================================================================
// Chain categories
// =============================================================================

/// Closed set of chain families the core derives for.
///
/// Adding a chain registers parameters in the config table, not new
/// branches here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainCategory {
    /// Bitcoin-family spendable-output chains
    Utxo,
    /// Ethereum-family balance chains (tokens share the base key)
    Account,
}

// =============================================================================
// Raw (secret) tree
// =============================================================================

/// A single private key and its HD path.
///
/// Derived keys carry a `m/44'/...` path; imported keys carry the
/// synthetic `i/44'/...` prefix marking "not derivable from seed -
/// do not re-derive".
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct KeyRecord {
    pub priv_key: String,
    pub path: String,
}

impl KeyRecord {
    /// True when this record was imported rather than seed-derived
    pub fn is_imported(&self) -> bool {
        self.path.starts_with("i/")
    }
}

impl fmt::Debug for KeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRecord")
            .field("priv_key", &"[REDACTED]")
            .field("path", &self.path)
            .finish()
    }
}

/// A named sequence of private keys.
///
/// Account index 0 is the sole default account, populated only by
/// seed derivation; indices >= 1 are imports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Account {
    #[zeroize(skip)]
    pub name: String,
    pub priv_keys: Vec<KeyRecord>,
}

/// Per-chain-type secret record inside the raw tree.
///
/// `addresses` is a re-derivable projection cache; it is what
/// `vault::prune` strips before remote upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop, Default)]
pub struct RawAsset {
    pub accounts: Vec<Account>,
    #[zeroize(skip)]
    pub import_count: u32,
    #[zeroize(skip)]
    #[serde(default)]
    pub addresses: Vec<AddressRecord>,
}

/// The secret-bearing account/key structure, always stored sealed.
///
/// Sole source of truth for keys. Keyed by asset-type name; BTreeMap
/// keeps serialization order deterministic across devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RawAssetTree {
    pub assets: BTreeMap<String, RawAsset>,
}

impl RawAssetTree {
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Explicitly overwrite all key material.
    ///
    /// Dropping the tree zeroizes each record anyway; operations that
    /// hold the tree past an error path call this before returning.
    pub fn scrub(&mut self) {
        for asset in self.assets.values_mut() {
            asset.zeroize();
        }
    }
}

// =============================================================================
// Displayable projection (non-secret)
// =============================================================================

/// Derived, displayable address entry: no key material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub symbol: String,
    pub addr: String,
    pub account_name: String,
    pub path: String,
    #[serde(default)]
    pub txs: Vec<ChainTx>,
    #[serde(default)]
    pub utxos: Vec<Utxo>,
    #[serde(default)]
    pub last_addr_fetch_at: Option<DateTime<Utc>>,
}

/// Confirmed transaction entry from the authoritative per-address history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainTx {
    pub txid: String,
    pub block_no: i64,
    pub value: u128,
    pub is_incoming: bool,
}

/// Spendable output attributed to one of our addresses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    pub value: u64,
}

/// Sentinel block number marking a local transaction as unconfirmed
pub const BLOCK_NO_PENDING: i64 = -1;

/// Synthetic pending-transaction record bridging the gap between an
/// event observation and the confirmed history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalTx {
    pub txid: String,
    pub is_incoming: bool,
    pub date: DateTime<Utc>,
    /// Exact value in base units (satoshis, wei, token units)
    pub value: u128,
    pub to_or_from: String,
    #[serde(default)]
    pub account_to: Option<String>,
    #[serde(default)]
    pub account_from: Option<String>,
    pub block_no: i64,
    pub fees: u128,
    #[serde(default)]
    pub erc20: Option<String>,
    #[serde(default)]
    pub erc20_contract: Option<String>,
}

/// One displayable asset per supported chain type: addresses plus the
/// pending-transaction ledger, rebuilt from the raw tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayAsset {
    pub asset_type: String,
    pub symbol: String,
    pub display_name: String,
    pub chain: ChainCategory,
    pub decimals: u8,
    pub addresses: Vec<AddressRecord>,
    #[serde(default)]
    pub local_txs: Vec<LocalTx>,
}

impl DisplayAsset {
    pub fn own_addresses(&self) -> Vec<String> {
        self.addresses.iter().map(|a| a.addr.clone()).collect()
    }

    /// True when the txid is already known, either pending or confirmed
    pub fn knows_txid(&self, txid: &str) -> bool {
        self.local_txs.iter().any(|t| t.txid == txid)
            || self
                .addresses
                .iter()
                .any(|a| a.txs.iter().any(|t| t.txid == txid))
    }
}

// =============================================================================
// Observed raw transactions (channel payloads, interface shapes only)
// =============================================================================

/// Input or output of an observed UTXO-chain transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtxoTxIo {
    /// Prior txid being spent (inputs only)
    #[serde(default)]
    pub txid: Option<String>,
    pub addr: String,
    /// Satoshis
    pub value: u64,
}

/// Observed UTXO-chain transaction body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawUtxoTx {
    pub txid: String,
    /// Fee in satoshis
    pub fee: u64,
    pub inputs: Vec<UtxoTxIo>,
    pub outputs: Vec<UtxoTxIo>,
}

/// Observed account-chain (Ethereum-family) transaction body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAccountTx {
    pub txid: String,
    pub from: String,
    pub to: String,
    /// Wei
    pub value: u128,
    pub gas: u64,
    pub gas_price: u128,
    /// None while unconfirmed; Some once mined
    #[serde(default)]
    pub block_no: Option<u64>,
    /// 0x-prefixed call data (ERC-20 transfers decode from here)
    #[serde(default)]
    pub input: String,
}

impl RawAccountTx {
    pub fn is_confirmed(&self) -> bool {
        self.block_no.is_some()
    }
}

// =============================================================================
// Presentation boundary
// =============================================================================

/// Convert exact base units to a display string.
///
/// This is the only place base units become human units; comparisons
/// and accumulations elsewhere stay in integers.
pub fn to_display_units(value: u128, decimals: u8) -> String {
    let scale = 10u128.pow(u32::from(decimals));
    let whole = value / scale;
    let frac = value % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let frac_str = format!("{:0>width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, frac_str.trim_end_matches('0'))
}
