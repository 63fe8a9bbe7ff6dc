//! Key Derivation Engine
//!
//! Pure functions from (seed, chain parameters, path) to private key
//! and displayable address. No state; the same inputs always yield
//! the same outputs, which is what makes cross-device re-derivation
//! and regeneration-without-disturbance possible.
//!
//! SECURITY: all intermediate key material is zeroized when no longer
//! needed.

use bitcoin::bip32::{DerivationPath, Xpriv};
use bitcoin::hashes::{hash160, sha256d, Hash};
use bitcoin::secp256k1::{Secp256k1, SecretKey};
use bitcoin::Network;
use std::str::FromStr;
use tiny_keccak::{Hasher, Keccak};
use zeroize::Zeroizing;

use crate::config::{AssetMeta, UtxoEncoding, UtxoParams};
use crate::error::{WalletError, WalletResult};
use crate::types::{ChainCategory, KeyRecord};

use super::vault;

/// One derivation result: the secret record plus its address
#[derive(Debug, Clone)]
pub struct DerivedKey {
    pub record: KeyRecord,
    pub addr: String,
}

/// BIP44 external chain index (1 would be internal/change)
pub const CHAIN_EXTERNAL: u32 = 0;

/// Derive `count` keys with addresses starting at `start_ndx`.
///
/// UTXO chains produce a WIF private key and an address in the
/// symbol's encoding; account chains produce a raw hex key and an
/// Ethereum address. ERC-20 metas derive identically to Ethereum -
/// callers alias the base keys instead of calling this per token.
pub fn derive_batch(
    seed: &[u8],
    meta: &AssetMeta,
    account_ndx: u32,
    chain_ndx: u32,
    start_ndx: u32,
    count: u32,
) -> WalletResult<Vec<DerivedKey>> {
    match meta.chain {
        ChainCategory::Utxo => {
            let params = crate::config::chain_params(meta.symbol)?;
            derive_utxo_batch(seed, meta, params, account_ndx, chain_ndx, start_ndx, count)
        }
        ChainCategory::Account => {
            derive_account_batch(seed, meta, account_ndx, chain_ndx, start_ndx, count)
        }
    }
}

/// PrivKey -> Address (all chain categories).
///
/// Used for imports and re-projection; validates the supplied key
/// against the target chain's encoding rules and fails with
/// `InvalidKey` rather than silently skipping.
pub fn address_from_priv_key(meta: &AssetMeta, priv_key: &str) -> WalletResult<String> {
    match meta.chain {
        ChainCategory::Utxo => {
            let params = crate::config::chain_params(meta.symbol)?;
            let secret = secret_from_wif(params, priv_key)?;
            let addr = utxo_address(&secret, params);
            Ok(addr)
        }
        ChainCategory::Account => {
            let secret = secret_from_hex(priv_key)?;
            Ok(eth_address(&secret))
        }
    }
}

// =============================================================================
// UTXO chains
// =============================================================================

fn derive_utxo_batch(
    seed: &[u8],
    meta: &AssetMeta,
    params: &UtxoParams,
    account_ndx: u32,
    chain_ndx: u32,
    start_ndx: u32,
    count: u32,
) -> WalletResult<Vec<DerivedKey>> {
    let secp = Secp256k1::new();
    let hashed = vault::hash_seed(seed);
    let master = Xpriv::new_master(Network::Bitcoin, hashed.as_ref())?;

    let mut out = Vec::with_capacity(count as usize);
    for i in start_ndx..start_ndx + count {
        let path_str = bip44_path(meta.bip44_index, account_ndx, chain_ndx, i);
        let path = DerivationPath::from_str(&path_str)?;
        let child = master.derive_priv(&secp, &path)?;
        let secret = child.private_key;

        let wif = encode_wif(params.wif_version, &secret);
        let addr = utxo_address(&secret, params);

        out.push(DerivedKey {
            record: KeyRecord {
                priv_key: wif,
                path: path_str,
            },
            addr,
        });
    }
    Ok(out)
}

/// Address for a secret key under the symbol's encoding rule
fn utxo_address(secret: &SecretKey, params: &UtxoParams) -> String {
    let secp = Secp256k1::new();
    let pubkey = secret.public_key(&secp).serialize();
    let pubkey_hash = hash160::Hash::hash(&pubkey);

    match params.encoding {
        UtxoEncoding::Legacy => base58check(params.address_version, pubkey_hash.as_ref()),
        UtxoEncoding::P2shSegwit => {
            // redeem script: OP_0 PUSH20 <hash160(pubkey)>
            let mut redeem = Vec::with_capacity(22);
            redeem.push(0x00);
            redeem.push(0x14);
            redeem.extend_from_slice(pubkey_hash.as_ref());
            let script_hash = hash160::Hash::hash(&redeem);
            base58check(params.address_version, script_hash.as_ref())
        }
        UtxoEncoding::CashAddr => cash_address(pubkey_hash.as_ref()),
    }
}

/// Base58Check with a (possibly multi-byte) version prefix
fn base58check(version: &[u8], payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(version.len() + payload.len() + 4);
    data.extend_from_slice(version);
    data.extend_from_slice(payload);

    let checksum = sha256d::Hash::hash(&data);
    data.extend_from_slice(&checksum[..4]);

    bs58::encode(data).into_string()
}

/// WIF-encode a secret key with the symbol's version byte
fn encode_wif(wif_version: u8, secret: &SecretKey) -> String {
    let mut data = Zeroizing::new(Vec::with_capacity(38));
    data.push(wif_version);
    data.extend_from_slice(&secret.secret_bytes());
    data.push(0x01); // compressed flag

    let checksum = sha256d::Hash::hash(&data);
    let mut payload = Zeroizing::new(data.to_vec());
    payload.extend_from_slice(&checksum[..4]);

    bs58::encode(payload.as_slice()).into_string()
}

/// Decode and validate a WIF string against the symbol's parameters
fn secret_from_wif(params: &UtxoParams, wif: &str) -> WalletResult<SecretKey> {
    let decoded = Zeroizing::new(
        bs58::decode(wif)
            .into_vec()
            .map_err(|e| WalletError::invalid_key(format!("WIF base58 decode failed: {}", e)))?,
    );

    // version + 32-byte key [+ compressed flag] + 4-byte checksum
    if decoded.len() != 37 && decoded.len() != 38 {
        return Err(WalletError::invalid_key("WIF payload length invalid"));
    }
    let (body, checksum) = decoded.split_at(decoded.len() - 4);
    let expected = sha256d::Hash::hash(body);
    if &expected[..4] != checksum {
        return Err(WalletError::invalid_key("WIF checksum mismatch"));
    }
    if body[0] != params.wif_version {
        return Err(WalletError::invalid_key(format!(
            "WIF version byte 0x{:02x} does not match chain (expected 0x{:02x})",
            body[0], params.wif_version
        )));
    }

    SecretKey::from_slice(&body[1..33])
        .map_err(|e| WalletError::invalid_key(format!("invalid secp256k1 scalar: {}", e)))
}

// =============================================================================
// Account chains (Ethereum-family)
// =============================================================================

fn derive_account_batch(
    seed: &[u8],
    meta: &AssetMeta,
    account_ndx: u32,
    chain_ndx: u32,
    start_ndx: u32,
    count: u32,
) -> WalletResult<Vec<DerivedKey>> {
    let secp = Secp256k1::new();
    let hashed = vault::hash_seed(seed);
    let master = Xpriv::new_master(Network::Bitcoin, hashed.as_ref())?;

    let mut out = Vec::with_capacity(count as usize);
    for i in start_ndx..start_ndx + count {
        let path_str = bip44_path(meta.bip44_index, account_ndx, chain_ndx, i);
        let path = DerivationPath::from_str(&path_str)?;
        let child = master.derive_priv(&secp, &path)?;
        let secret = child.private_key;

        let priv_hex = hex::encode(secret.secret_bytes());
        let addr = eth_address(&secret);

        out.push(DerivedKey {
            record: KeyRecord {
                priv_key: priv_hex,
                path: path_str,
            },
            addr,
        });
    }
    Ok(out)
}

/// Address = 0x + last 20 bytes of keccak256(uncompressed pubkey),
/// lowercase hex (comparisons elsewhere are case-folded)
fn eth_address(secret: &SecretKey) -> String {
    let secp = Secp256k1::new();
    let uncompressed = secret.public_key(&secp).serialize_uncompressed();
    let digest = keccak256(&uncompressed[1..]);
    format!("0x{}", hex::encode(&digest[12..]))
}

/// Parse a 0x-optional 32-byte hex private key
fn secret_from_hex(priv_key: &str) -> WalletResult<SecretKey> {
    let stripped = priv_key.strip_prefix("0x").unwrap_or(priv_key);
    let bytes = Zeroizing::new(
        hex::decode(stripped)
            .map_err(|e| WalletError::invalid_key(format!("hex decode failed: {}", e)))?,
    );
    if bytes.len() != 32 {
        return Err(WalletError::invalid_key("private key must be 32 bytes"));
    }
    SecretKey::from_slice(&bytes)
        .map_err(|e| WalletError::invalid_key(format!("invalid secp256k1 scalar: {}", e)))
}

fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}

// =============================================================================
// Cash-address transform (applied post-hoc to the legacy hash)
// =============================================================================

const CASHADDR_PREFIX: &str = "bitcoincash";
const CASHADDR_CHARSET: &[u8] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

fn cash_address(pubkey_hash: &[u8]) -> String {
    // version byte 0: P2PKH, 160-bit hash
    let mut payload = Vec::with_capacity(21);
    payload.push(0u8);
    payload.extend_from_slice(pubkey_hash);

    let mut data = convert_bits(&payload, 8, 5, true);
    let checksum = cashaddr_checksum(CASHADDR_PREFIX, &data);
    data.extend_from_slice(&checksum);

    let encoded: String = data
        .iter()
        .map(|&b| CASHADDR_CHARSET[b as usize] as char)
        .collect();
    format!("{}:{}", CASHADDR_PREFIX, encoded)
}

/// Regroup bits (8->5 for base32)
fn convert_bits(data: &[u8], from_bits: u32, to_bits: u32, pad: bool) -> Vec<u8> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let mut result = Vec::new();
    let max_value = (1u32 << to_bits) - 1;

    for &byte in data {
        acc = (acc << from_bits) | u32::from(byte);
        bits += from_bits;
        while bits >= to_bits {
            bits -= to_bits;
            result.push(((acc >> bits) & max_value) as u8);
        }
    }
    if pad && bits > 0 {
        result.push(((acc << (to_bits - bits)) & max_value) as u8);
    }
    result
}

fn cashaddr_checksum(prefix: &str, payload: &[u8]) -> [u8; 8] {
    let mut values = Vec::new();
    for c in prefix.chars() {
        values.push((c as u8) & 0x1f);
    }
    values.push(0); // separator
    values.extend_from_slice(payload);
    values.extend_from_slice(&[0u8; 8]); // checksum template

    let polymod = cashaddr_polymod(&values) ^ 1;

    let mut checksum = [0u8; 8];
    for (i, slot) in checksum.iter_mut().enumerate() {
        *slot = ((polymod >> (5 * (7 - i))) & 0x1f) as u8;
    }
    checksum
}

fn cashaddr_polymod(values: &[u8]) -> u64 {
    const GENERATORS: [u64; 5] = [
        0x98f2bc8e61,
        0x79b76d99e2,
        0xf33e5fb3c4,
        0xae2eabe2a8,
        0x1e4f43e470,
    ];

    let mut c: u64 = 1;
    for &v in values {
        let c0 = c >> 35;
        c = ((c & 0x07ffffffff) << 5) ^ u64::from(v);
        for (i, &generator) in GENERATORS.iter().enumerate() {
            if (c0 >> i) & 1 != 0 {
                c ^= generator;
            }
        }
    }
    c
}

fn bip44_path(coin: u32, account: u32, chain: u32, index: u32) -> String {
    format!("m/44'/{}'/{}'/{}/{}", coin, account, chain, index)
}
