//! Property tests: derivation determinism, sealing round trips,
//! prune behavior, and base-unit display conversion.

use std::sync::OnceLock;

use proptest::prelude::*;

use wallet_core::config;
use wallet_core::types::to_display_units;
use wallet_core::wallet::derivation;
use wallet_core::wallet::vault::{self, CryptoContext};
use wallet_core::{Account, AddressRecord, KeyRecord, RawAsset, RawAssetTree};

// Argon2id at production cost; derive once for the whole suite
fn ctx() -> &'static CryptoContext {
    static CTX: OnceLock<CryptoContext> = OnceLock::new();
    CTX.get_or_init(|| {
        CryptoContext::derive("property_test_passphrase", b"property-test-identity")
            .expect("context derivation")
    })
}

fn tree_strategy() -> impl Strategy<Value = RawAssetTree> {
    proptest::collection::btree_map(
        prop_oneof![
            Just("bitcoin".to_string()),
            Just("litecoin".to_string()),
            Just("ethereum".to_string()),
        ],
        (0u32..4, proptest::collection::vec("[a-z0-9]{8,32}", 0..4)).prop_map(
            |(import_count, keys)| {
                let priv_keys: Vec<KeyRecord> = keys
                    .into_iter()
                    .enumerate()
                    .map(|(i, k)| KeyRecord {
                        priv_key: k,
                        path: format!("m/44'/0'/0'/0/{}", i),
                    })
                    .collect();
                let mut asset = RawAsset::default();
                asset.addresses = priv_keys
                    .iter()
                    .enumerate()
                    .map(|(i, k)| AddressRecord {
                        symbol: "TST".to_string(),
                        addr: format!("addr-{}", i),
                        account_name: "Main Test".to_string(),
                        path: k.path.clone(),
                        txs: Vec::new(),
                        utxos: Vec::new(),
                        last_addr_fetch_at: None,
                    })
                    .collect();
                asset.accounts.push(Account {
                    name: "Main Test".to_string(),
                    priv_keys,
                });
                asset.import_count = import_count;
                asset
            },
        ),
        0..3,
    )
    .prop_map(|assets| RawAssetTree { assets })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn derivation_is_deterministic(
        seed in proptest::collection::vec(any::<u8>(), 1..64),
        start in 0u32..16,
        count in 1u32..4,
    ) {
        let meta = config::meta_for("bitcoin").unwrap();
        let a = derivation::derive_batch(&seed, meta, 0, 0, start, count).unwrap();
        let b = derivation::derive_batch(&seed, meta, 0, 0, start, count).unwrap();
        prop_assert_eq!(a.len(), count as usize);
        for (x, y) in a.iter().zip(b.iter()) {
            prop_assert_eq!(&x.record, &y.record);
            prop_assert_eq!(&x.addr, &y.addr);
        }
    }

    #[test]
    fn distinct_indices_yield_distinct_addresses(
        seed in proptest::collection::vec(any::<u8>(), 1..64),
    ) {
        let meta = config::meta_for("ethereum").unwrap();
        let batch = derivation::derive_batch(&seed, meta, 0, 0, 0, 4).unwrap();
        for i in 0..batch.len() {
            for j in (i + 1)..batch.len() {
                prop_assert_ne!(&batch[i].addr, &batch[j].addr);
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn seal_open_round_trips(tree in tree_strategy()) {
        let sealed = ctx().seal(&tree).unwrap();
        let opened = ctx().open(&sealed).unwrap();
        prop_assert_eq!(tree, opened);
    }

    #[test]
    fn tampered_envelopes_never_open(tree in tree_strategy(), flip in 0usize..16) {
        let mut sealed = ctx().seal(&tree).unwrap();
        let mut bytes = sealed.ciphertext.into_bytes();
        let ndx = flip % bytes.len();
        // flip within the base64 alphabet so decoding still succeeds
        bytes[ndx] = if bytes[ndx] == b'A' { b'B' } else { b'A' };
        sealed.ciphertext = String::from_utf8(bytes).unwrap();
        prop_assert!(ctx().open(&sealed).is_err());
    }

    #[test]
    fn prune_preserves_keys_and_is_idempotent(tree in tree_strategy()) {
        let mut pruned = tree.clone();
        vault::prune(&mut pruned);

        for (name, asset) in &pruned.assets {
            prop_assert!(asset.addresses.is_empty());
            prop_assert_eq!(&asset.accounts, &tree.assets[name].accounts);
            prop_assert_eq!(asset.import_count, tree.assets[name].import_count);
        }

        let again = {
            let mut t = pruned.clone();
            vault::prune(&mut t);
            t
        };
        prop_assert_eq!(pruned, again);
    }
}

proptest! {
    #[test]
    fn display_units_parse_back_exactly(value in any::<u64>(), decimals in 0u8..19) {
        let shown = to_display_units(u128::from(value), decimals);
        let (int_part, frac_part) = match shown.split_once('.') {
            Some((i, f)) => (i.to_string(), f.to_string()),
            None => (shown.clone(), String::new()),
        };
        let scale = 10u128.pow(u32::from(decimals));
        let mut back = int_part.parse::<u128>().unwrap() * scale;
        if !frac_part.is_empty() {
            let frac = format!("{:0<width$}", frac_part, width = decimals as usize);
            back += frac.parse::<u128>().unwrap();
        }
        prop_assert_eq!(back, u128::from(value));
    }
}
