//! Ethereum-family reconciliation policy.
//!
//! Inbound only: a node-observed transaction becomes a pending entry
//! when it pays one of our addresses, either as plain value in wei or
//! as an ERC-20 `transfer(address,uint256)` call to a configured
//! token contract. Address comparison is case-folded; our addresses
//! are stored lowercase.

use chrono::Utc;
use thiserror::Error;

use crate::config;
use crate::log_warn;
use crate::types::{DisplayAsset, LocalTx, RawAccountTx, BLOCK_NO_PENDING};

/// ERC-20 transfer selector: keccak256("transfer(address,uint256)")[..4]
const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("call data is not 68 bytes")]
    BadLength,
    #[error("selector is not transfer(address,uint256)")]
    BadSelector,
    #[error("invalid call data hex: {0}")]
    BadHex(#[from] hex::FromHexError),
    #[error("amount exceeds u128 range")]
    Overflow,
}

/// Synthesize a pending inbound entry, or `None` when the
/// transaction does not pay this asset.
pub fn synthesize(asset: &DisplayAsset, tx: &RawAccountTx) -> Option<LocalTx> {
    let meta = config::meta_for(&asset.asset_type)?;
    match meta.erc20_contract {
        Some(contract) => synthesize_token(asset, tx, contract),
        None => synthesize_plain(asset, tx),
    }
}

fn synthesize_plain(asset: &DisplayAsset, tx: &RawAccountTx) -> Option<LocalTx> {
    let to = tx.to.to_lowercase();
    if tx.value == 0 || !is_own(asset, &to) {
        return None;
    }
    Some(LocalTx {
        txid: tx.txid.clone(),
        is_incoming: true,
        date: Utc::now(),
        value: tx.value,
        to_or_from: tx.from.to_lowercase(),
        account_to: account_for(asset, &to),
        account_from: None,
        block_no: BLOCK_NO_PENDING,
        fees: 0,
        erc20: None,
        erc20_contract: None,
    })
}

fn synthesize_token(asset: &DisplayAsset, tx: &RawAccountTx, contract: &str) -> Option<LocalTx> {
    if !tx.to.eq_ignore_ascii_case(contract) {
        return None;
    }
    let (recipient, amount) = match decode_transfer(&tx.input) {
        Ok(decoded) => decoded,
        Err(e) => {
            log_warn!(
                "reconcile",
                "token call data undecodable",
                symbol = asset.symbol,
                txid = tx.txid,
                error = e
            );
            return None;
        }
    };
    if amount == 0 || !is_own(asset, &recipient) {
        return None;
    }
    Some(LocalTx {
        txid: tx.txid.clone(),
        is_incoming: true,
        date: Utc::now(),
        value: amount,
        to_or_from: tx.from.to_lowercase(),
        account_to: account_for(asset, &recipient),
        account_from: None,
        block_no: BLOCK_NO_PENDING,
        fees: 0,
        erc20: Some(asset.symbol.clone()),
        erc20_contract: Some(contract.to_string()),
    })
}

/// Decode `transfer(address,uint256)` call data into a lowercase
/// recipient address and a base-unit amount. Amounts above u128 are
/// rejected rather than truncated.
pub fn decode_transfer(input: &str) -> Result<(String, u128), DecodeError> {
    let stripped = input.strip_prefix("0x").unwrap_or(input);
    let bytes = hex::decode(stripped)?;
    if bytes.len() != 68 {
        return Err(DecodeError::BadLength);
    }
    if bytes[..4] != TRANSFER_SELECTOR {
        return Err(DecodeError::BadSelector);
    }
    // arg 1: address, right-aligned in 32 bytes
    let recipient = format!("0x{}", hex::encode(&bytes[16..36]));
    // arg 2: uint256, big-endian; the high 16 bytes must be zero
    if bytes[36..52].iter().any(|&b| b != 0) {
        return Err(DecodeError::Overflow);
    }
    let mut amount_be = [0u8; 16];
    amount_be.copy_from_slice(&bytes[52..68]);
    Ok((recipient, u128::from_be_bytes(amount_be)))
}

fn is_own(asset: &DisplayAsset, addr: &str) -> bool {
    asset.addresses.iter().any(|r| r.addr.eq_ignore_ascii_case(addr))
}

fn account_for(asset: &DisplayAsset, addr: &str) -> Option<String> {
    asset
        .addresses
        .iter()
        .find(|r| r.addr.eq_ignore_ascii_case(addr))
        .map(|r| r.account_name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AddressRecord, ChainCategory};

    const OURS: &str = "0x1111111111111111111111111111111111111111";
    const DAI: &str = "0x6b175474e89094c44da98b954eedeac495271d0f";

    fn asset(asset_type: &str, symbol: &str) -> DisplayAsset {
        DisplayAsset {
            asset_type: asset_type.to_string(),
            symbol: symbol.to_string(),
            display_name: symbol.to_string(),
            chain: ChainCategory::Account,
            decimals: 18,
            addresses: vec![AddressRecord {
                symbol: symbol.to_string(),
                addr: OURS.to_string(),
                account_name: format!("Main {}", symbol),
                path: "m/44'/60'/0'/0/0".to_string(),
                txs: Vec::new(),
                utxos: Vec::new(),
                last_addr_fetch_at: None,
            }],
            local_txs: Vec::new(),
        }
    }

    fn transfer_input(recipient: &str, amount: u128) -> String {
        let mut data = Vec::with_capacity(68);
        data.extend_from_slice(&TRANSFER_SELECTOR);
        data.extend_from_slice(&[0u8; 12]);
        data.extend_from_slice(&hex::decode(recipient.trim_start_matches("0x")).unwrap());
        data.extend_from_slice(&[0u8; 16]);
        data.extend_from_slice(&amount.to_be_bytes());
        format!("0x{}", hex::encode(data))
    }

    #[test]
    fn test_plain_inbound_eth() {
        let asset = asset("ethereum", "ETH");
        let tx = RawAccountTx {
            txid: "0xaa".to_string(),
            from: "0x2222222222222222222222222222222222222222".to_string(),
            to: OURS.to_uppercase().replace("0X", "0x"),
            value: 1_000_000_000_000_000_000,
            gas: 21_000,
            gas_price: 30_000_000_000,
            block_no: None,
            input: "0x".to_string(),
        };
        let local = synthesize(&asset, &tx).unwrap();
        assert!(local.is_incoming);
        assert_eq!(local.value, 1_000_000_000_000_000_000);
        assert!(local.erc20.is_none());
    }

    #[test]
    fn test_outbound_eth_not_synthesized() {
        let asset = asset("ethereum", "ETH");
        let tx = RawAccountTx {
            txid: "0xbb".to_string(),
            from: OURS.to_string(),
            to: "0x3333333333333333333333333333333333333333".to_string(),
            value: 5,
            gas: 21_000,
            gas_price: 1,
            block_no: None,
            input: "0x".to_string(),
        };
        assert!(synthesize(&asset, &tx).is_none());
    }

    #[test]
    fn test_token_transfer_to_us() {
        let asset = asset("dai", "DAI");
        let tx = RawAccountTx {
            txid: "0xcc".to_string(),
            from: "0x4444444444444444444444444444444444444444".to_string(),
            to: DAI.to_string(),
            value: 0,
            gas: 60_000,
            gas_price: 1,
            block_no: None,
            input: transfer_input(OURS, 2_500_000_000_000_000_000),
        };
        let local = synthesize(&asset, &tx).unwrap();
        assert_eq!(local.value, 2_500_000_000_000_000_000);
        assert_eq!(local.erc20.as_deref(), Some("DAI"));
        assert_eq!(local.erc20_contract.as_deref(), Some(DAI));
    }

    #[test]
    fn test_token_transfer_to_someone_else_ignored() {
        let asset = asset("dai", "DAI");
        let tx = RawAccountTx {
            txid: "0xdd".to_string(),
            from: "0x4444444444444444444444444444444444444444".to_string(),
            to: DAI.to_string(),
            value: 0,
            gas: 60_000,
            gas_price: 1,
            block_no: None,
            input: transfer_input("0x5555555555555555555555555555555555555555", 100),
        };
        assert!(synthesize(&asset, &tx).is_none());
    }

    #[test]
    fn test_decode_failures_yield_nothing() {
        let asset = asset("dai", "DAI");
        let base = RawAccountTx {
            txid: "0xee".to_string(),
            from: "0x4444444444444444444444444444444444444444".to_string(),
            to: DAI.to_string(),
            value: 0,
            gas: 60_000,
            gas_price: 1,
            block_no: None,
            input: "0xdeadbeef".to_string(),
        };
        assert!(synthesize(&asset, &base).is_none());

        // amount above u128: treated as a decode failure
        let mut data = Vec::new();
        data.extend_from_slice(&TRANSFER_SELECTOR);
        data.extend_from_slice(&[0u8; 12]);
        data.extend_from_slice(&hex::decode(OURS.trim_start_matches("0x")).unwrap());
        data.extend_from_slice(&[0xffu8; 32]);
        let huge = RawAccountTx {
            input: format!("0x{}", hex::encode(data)),
            ..base
        };
        assert!(synthesize(&asset, &huge).is_none());
    }

    #[test]
    fn test_decode_transfer_errors() {
        assert_eq!(decode_transfer("0x1234"), Err(DecodeError::BadLength));
        let wrong_selector = format!("0x{}", "00".repeat(68));
        assert_eq!(
            decode_transfer(&wrong_selector),
            Err(DecodeError::BadSelector)
        );
        assert!(matches!(
            decode_transfer("0xzz"),
            Err(DecodeError::BadHex(_))
        ));
    }
}
