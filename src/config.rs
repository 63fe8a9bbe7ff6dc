//! Supported-asset metadata and network parameter tables
//!
//! Chain behavior is data, not code: the derivation engine and the
//! reconciler dispatch on `ChainCategory` and read everything
//! chain-specific (BIP44 index, version bytes, address encoding,
//! ERC-20 contract bindings) from these tables. Adding a chain means
//! adding a row here.

use crate::error::{WalletError, WalletResult};
use crate::types::ChainCategory;

/// Address encoding rule for a UTXO-family symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtxoEncoding {
    /// Base58Check P2PKH
    Legacy,
    /// P2SH-wrapped P2WPKH
    P2shSegwit,
    /// Legacy P2PKH transformed post-hoc to the cash-address format
    CashAddr,
}

/// Per-symbol network parameters for UTXO chains.
///
/// Version prefixes are multi-byte because Zcash transparent
/// addresses use two.
#[derive(Debug, Clone, Copy)]
pub struct UtxoParams {
    pub address_version: &'static [u8],
    pub wif_version: u8,
    /// BIP32 (xprv, xpub) serialization versions, informational for export
    pub ext_key_versions: (u32, u32),
    pub encoding: UtxoEncoding,
}

/// Static metadata for one supported asset type
#[derive(Debug, Clone, Copy)]
pub struct AssetMeta {
    /// Tree key, lowercase (e.g. "bitcoin", "btc_seg")
    pub asset_type: &'static str,
    pub symbol: &'static str,
    pub display_name: &'static str,
    pub chain: ChainCategory,
    pub bip44_index: u32,
    pub decimals: u8,
    /// UTXO chains only
    pub utxo: Option<UtxoParams>,
    /// ERC-20 tokens only: mainnet contract address, lowercase
    pub erc20_contract: Option<&'static str>,
}

impl AssetMeta {
    pub fn is_erc20(&self) -> bool {
        self.erc20_contract.is_some()
    }
}

const BIP32_MAINNET: (u32, u32) = (0x0488_ADE4, 0x0488_B21E);

/// All supported asset types, in tree-key order.
///
/// Ethereum-family tokens never derive independently; they alias the
/// ethereum account-0 keys and differ only in display metadata.
pub const SUPPORTED_ASSETS: &[AssetMeta] = &[
    AssetMeta {
        asset_type: "bitcoin",
        symbol: "BTC",
        display_name: "Bitcoin",
        chain: ChainCategory::Utxo,
        bip44_index: 0,
        decimals: 8,
        utxo: Some(UtxoParams {
            address_version: &[0x00],
            wif_version: 0x80,
            ext_key_versions: BIP32_MAINNET,
            encoding: UtxoEncoding::Legacy,
        }),
        erc20_contract: None,
    },
    AssetMeta {
        asset_type: "btc_seg",
        symbol: "BTC_SEG",
        display_name: "Bitcoin SegWit",
        chain: ChainCategory::Utxo,
        bip44_index: 0,
        decimals: 8,
        utxo: Some(UtxoParams {
            address_version: &[0x05],
            wif_version: 0x80,
            ext_key_versions: BIP32_MAINNET,
            encoding: UtxoEncoding::P2shSegwit,
        }),
        erc20_contract: None,
    },
    AssetMeta {
        asset_type: "litecoin",
        symbol: "LTC",
        display_name: "Litecoin",
        chain: ChainCategory::Utxo,
        bip44_index: 2,
        decimals: 8,
        utxo: Some(UtxoParams {
            address_version: &[0x30],
            wif_version: 0xB0,
            ext_key_versions: BIP32_MAINNET,
            encoding: UtxoEncoding::Legacy,
        }),
        erc20_contract: None,
    },
    AssetMeta {
        asset_type: "zcash",
        symbol: "ZEC",
        display_name: "Zcash",
        chain: ChainCategory::Utxo,
        bip44_index: 133,
        decimals: 8,
        utxo: Some(UtxoParams {
            // transparent t1 addresses use a two-byte version
            address_version: &[0x1C, 0xB8],
            wif_version: 0x80,
            ext_key_versions: BIP32_MAINNET,
            encoding: UtxoEncoding::Legacy,
        }),
        erc20_contract: None,
    },
    AssetMeta {
        asset_type: "dash",
        symbol: "DASH",
        display_name: "Dash",
        chain: ChainCategory::Utxo,
        bip44_index: 5,
        decimals: 8,
        utxo: Some(UtxoParams {
            address_version: &[0x4C],
            wif_version: 0xCC,
            ext_key_versions: BIP32_MAINNET,
            encoding: UtxoEncoding::Legacy,
        }),
        erc20_contract: None,
    },
    AssetMeta {
        asset_type: "bchabc",
        symbol: "BCHABC",
        display_name: "Bitcoin Cash",
        chain: ChainCategory::Utxo,
        bip44_index: 145,
        decimals: 8,
        utxo: Some(UtxoParams {
            address_version: &[0x00],
            wif_version: 0x80,
            ext_key_versions: BIP32_MAINNET,
            encoding: UtxoEncoding::CashAddr,
        }),
        erc20_contract: None,
    },
    AssetMeta {
        asset_type: "ethereum",
        symbol: "ETH",
        display_name: "Ethereum",
        chain: ChainCategory::Account,
        bip44_index: 60,
        decimals: 18,
        utxo: None,
        erc20_contract: None,
    },
    AssetMeta {
        asset_type: "dai",
        symbol: "DAI",
        display_name: "Dai",
        chain: ChainCategory::Account,
        bip44_index: 60,
        decimals: 18,
        utxo: None,
        erc20_contract: Some("0x6b175474e89094c44da98b954eedeac495271d0f"),
    },
    AssetMeta {
        asset_type: "usdc",
        symbol: "USDC",
        display_name: "USD Coin",
        chain: ChainCategory::Account,
        bip44_index: 60,
        decimals: 6,
        utxo: None,
        erc20_contract: Some("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"),
    },
];

pub fn meta_for(asset_type: &str) -> Option<&'static AssetMeta> {
    SUPPORTED_ASSETS
        .iter()
        .find(|m| m.asset_type.eq_ignore_ascii_case(asset_type))
}

pub fn meta_by_symbol(symbol: &str) -> Option<&'static AssetMeta> {
    SUPPORTED_ASSETS
        .iter()
        .find(|m| m.symbol.eq_ignore_ascii_case(symbol))
}

/// Per-symbol network parameter lookup; absence is an error by contract
pub fn chain_params(symbol: &str) -> WalletResult<&'static UtxoParams> {
    meta_by_symbol(symbol)
        .and_then(|m| m.utxo.as_ref())
        .ok_or_else(|| {
            WalletError::unsupported_asset(format!("no network parameters for symbol {}", symbol))
        })
}

/// ERC-20 metadata keyed by lowercase contract address
pub fn erc20_by_contract(contract: &str) -> Option<&'static AssetMeta> {
    let wanted = contract.to_lowercase();
    SUPPORTED_ASSETS
        .iter()
        .find(|m| m.erc20_contract == Some(wanted.as_str()))
}

/// Tunables for the orchestrator
#[derive(Debug, Clone)]
pub struct WalletConfig {
    /// Default account-0 batch size on first generation
    pub default_address_count: u32,
    /// When set, every asset type is re-derived on each generate call
    /// (merge rule still protects user-activated slots)
    pub regen_everytime: bool,
    /// Bounded derivation pool width
    pub worker_pool: usize,
    /// Emit debug-level log entries
    pub debug_logging: bool,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            default_address_count: 2,
            regen_everytime: false,
            worker_pool: std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(4),
            debug_logging: false,
        }
    }
}
