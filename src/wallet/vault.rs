//! Secret Persistence
//!
//! Seals the raw asset tree with authenticated encryption before it
//! ever reaches a sink:
//! - AES-256-GCM for the envelope
//! - Argon2id for key derivation, salted with the owner identity
//! - Random nonce per seal, so identical trees never serialize alike
//!
//! SECURITY: plaintext buffers are zeroized; the derived key lives in
//! a `CryptoContext` that zeroizes on drop.

#![allow(deprecated)] // GenericArray::from_slice deprecated in generic-array 1.x

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{WalletError, WalletResult};
use crate::types::RawAssetTree;

/// Sealed raw asset tree, safe to hand to any persistence sink
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SealedTree {
    /// Version for future compatibility
    pub version: u8,
    /// Nonce used for encryption (12 bytes, base64)
    pub nonce: String,
    /// Encrypted tree JSON (ciphertext + auth tag, base64)
    pub ciphertext: String,
}

/// Derived sealing key, bound to one owner identity
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct CryptoContext {
    key: [u8; 32],
}

impl std::fmt::Debug for CryptoContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoContext")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl CryptoContext {
    /// Derive the sealing key from a passphrase, salted with the
    /// owner's identity public key so two owners with the same
    /// passphrase still get distinct keys.
    pub fn derive(passphrase: &str, identity_pubkey: &[u8]) -> WalletResult<Self> {
        use argon2::{Algorithm, Argon2, Params, Version};

        if passphrase.is_empty() {
            return Err(WalletError::validation("passphrase must not be empty"));
        }

        // 64 MiB memory, 3 iterations, 4 parallel lanes
        let argon2_params = Params::new(65536, 3, 4, Some(32))
            .map_err(|e| WalletError::crypto_error(format!("Invalid KDF params: {}", e)))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

        let salt = Sha256::digest(identity_pubkey);

        let mut key = [0u8; 32];
        argon2
            .hash_password_into(passphrase.as_bytes(), &salt, &mut key)
            .map_err(|e| WalletError::crypto_error(format!("Key derivation failed: {}", e)))?;

        Ok(Self { key })
    }

    /// Serialize and encrypt the tree
    pub fn seal(&self, tree: &RawAssetTree) -> WalletResult<SealedTree> {
        let plaintext = Zeroizing::new(
            serde_json::to_vec(tree)
                .map_err(|e| WalletError::internal(format!("tree serialization failed: {}", e)))?,
        );

        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| WalletError::crypto_error(format!("Failed to create cipher: {}", e)))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_slice())
            .map_err(|e| WalletError::crypto_error(format!("Encryption failed: {}", e)))?;

        Ok(SealedTree {
            version: 1,
            nonce: base64_encode(&nonce_bytes),
            ciphertext: base64_encode(&ciphertext),
        })
    }

    /// Decrypt and deserialize a sealed tree
    pub fn open(&self, sealed: &SealedTree) -> WalletResult<RawAssetTree> {
        if sealed.version != 1 {
            return Err(WalletError::validation(format!(
                "Unsupported envelope version: {}",
                sealed.version
            )));
        }

        let nonce_bytes = base64_decode(&sealed.nonce)?;
        let ciphertext = base64_decode(&sealed.ciphertext)?;

        if nonce_bytes.len() != 12 {
            return Err(WalletError::validation("Invalid nonce length"));
        }

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| WalletError::crypto_error(format!("Failed to create cipher: {}", e)))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let plaintext = Zeroizing::new(cipher.decrypt(nonce, ciphertext.as_ref()).map_err(
            |_| WalletError::persistence("Decryption failed - wrong key or corrupted envelope"),
        )?);

        serde_json::from_slice(&plaintext)
            .map_err(|e| WalletError::parse_error(format!("Invalid tree payload: {}", e)))
    }
}

/// Drop derived projections from the tree before sealing.
///
/// Addresses and any other recomputable caches are stripped so the
/// envelope holds only what cannot be re-derived. Idempotent.
pub fn prune(tree: &mut RawAssetTree) {
    for asset in tree.assets.values_mut() {
        asset.addresses.clear();
    }
}

/// Seed conditioning: every derivation starts from sha256(seed), so
/// callers can hand in entropy of any length.
pub fn hash_seed(seed: &[u8]) -> Zeroizing<[u8; 32]> {
    Zeroizing::new(Sha256::digest(seed).into())
}

fn base64_encode(data: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(data)
}

fn base64_decode(s: &str) -> WalletResult<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(s)
        .map_err(|e| WalletError::parse_error(format!("Invalid base64: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Account, AddressRecord, KeyRecord, RawAsset};

    fn sample_tree() -> RawAssetTree {
        let mut tree = RawAssetTree::default();
        let mut asset = RawAsset::default();
        asset.accounts.push(Account {
            name: "Default Account".to_string(),
            priv_keys: vec![KeyRecord {
                priv_key: "L1aW4aubDFB7yfras2S1mN3bqg9nwySY8nkoLmJebSLD5BWv3ENZ".to_string(),
                path: "m/44'/0'/0'/0/0".to_string(),
            }],
        });
        asset.addresses.push(AddressRecord {
            symbol: "BTC".to_string(),
            addr: "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2".to_string(),
            account_name: "Default Account".to_string(),
            path: "m/44'/0'/0'/0/0".to_string(),
            txs: Vec::new(),
            utxos: Vec::new(),
            last_addr_fetch_at: None,
        });
        asset.import_count = 0;
        tree.assets.insert("bitcoin".to_string(), asset);
        tree
    }

    fn ctx() -> CryptoContext {
        CryptoContext::derive("test_passphrase_123", b"identity-pubkey-bytes").unwrap()
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let tree = sample_tree();
        let ctx = ctx();
        let sealed = ctx.seal(&tree).unwrap();
        let opened = ctx.open(&sealed).unwrap();
        assert_eq!(opened.assets.len(), 1);
        assert_eq!(
            opened.assets["bitcoin"].accounts[0].priv_keys[0].path,
            "m/44'/0'/0'/0/0"
        );
    }

    #[test]
    fn test_wrong_key_fails() {
        let tree = sample_tree();
        let sealed = ctx().seal(&tree).unwrap();

        let other = CryptoContext::derive("other_passphrase", b"identity-pubkey-bytes").unwrap();
        assert!(other.open(&sealed).is_err());

        let other_identity =
            CryptoContext::derive("test_passphrase_123", b"different-identity").unwrap();
        assert!(other_identity.open(&sealed).is_err());
    }

    #[test]
    fn test_nonce_freshness() {
        let tree = sample_tree();
        let ctx = ctx();
        let a = ctx.seal(&tree).unwrap();
        let b = ctx.seal(&tree).unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_empty_passphrase_rejected() {
        assert!(CryptoContext::derive("", b"identity").is_err());
    }

    #[test]
    fn test_prune_strips_projections_only() {
        let mut tree = sample_tree();
        prune(&mut tree);
        assert!(tree.assets["bitcoin"].addresses.is_empty());
        assert_eq!(tree.assets["bitcoin"].accounts.len(), 1);

        // idempotent
        prune(&mut tree);
        assert!(tree.assets["bitcoin"].addresses.is_empty());
    }

    #[test]
    fn test_hash_seed_is_stable() {
        assert_eq!(*hash_seed(b"abc"), *hash_seed(b"abc"));
        assert_ne!(*hash_seed(b"abc"), *hash_seed(b"abd"));
    }
}
