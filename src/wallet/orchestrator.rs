//! Account & Asset Orchestrator
//!
//! Drives every mutation of the raw asset tree: initial generation,
//! address expansion, private-key import and removal of imported
//! accounts. Each operation opens the sealed tree, transforms it,
//! re-seals, and dispatches exactly two persistence events
//! (`SetAssetsRaw` then `SetAssets`). When an owner identity is
//! configured, a pruned copy is additionally uploaded best-effort;
//! upload failure is logged, never rolled back.
//!
//! Derivation work runs on a semaphore-bounded `spawn_blocking` pool
//! and is joined as a barrier before any state is touched.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use zeroize::Zeroizing;

use crate::config::{self, AssetMeta, WalletConfig};
use crate::error::{WalletError, WalletResult};
use crate::store::{RemoteSync, StateSink, WalletEvent};
use crate::types::{
    Account, AddressRecord, ChainCategory, DisplayAsset, KeyRecord, RawAsset, RawAssetTree,
    BLOCK_NO_PENDING,
};
use crate::{log_debug, log_error, log_info, log_warn};

use super::derivation::{self, DerivedKey, CHAIN_EXTERNAL};
use super::vault::{self, CryptoContext, SealedTree};

/// One private key to import. The caller may assert the address they
/// expect the key to resolve to; a mismatch fails the whole batch.
#[derive(Debug, Clone)]
pub struct KeyImport {
    pub priv_key: String,
    pub addr: Option<String>,
}

impl KeyImport {
    pub fn new(priv_key: impl Into<String>) -> Self {
        Self {
            priv_key: priv_key.into(),
            addr: None,
        }
    }

    pub fn with_addr(priv_key: impl Into<String>, addr: impl Into<String>) -> Self {
        Self {
            priv_key: priv_key.into(),
            addr: Some(addr.into()),
        }
    }
}

/// Result of a key import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    pub imported_count: usize,
    pub account_name: String,
}

/// Result of removing imported accounts
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoveOutcome {
    pub removed_account_count: usize,
    pub removed_addr_count: usize,
}

/// One key row of the wallet dump
#[derive(Debug, Clone, Serialize)]
pub struct DumpKey {
    pub path: String,
    pub addr: Option<String>,
    /// `None` when the dump was requested redacted
    pub priv_key: Option<String>,
    pub confirmed_tx_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DumpAccount {
    pub name: String,
    pub keys: Vec<DumpKey>,
}

/// Per-asset wallet dump entry
#[derive(Debug, Clone, Serialize)]
pub struct WalletDump {
    pub asset_type: String,
    pub symbol: String,
    pub accounts: Vec<DumpAccount>,
    pub unconfirmed_tx_count: usize,
}

/// Confirmed / unconfirmed base-unit totals for one asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssetBalance {
    pub confirmed: u128,
    pub unconfirmed: u128,
}

/// Address resolved by a pool job, tagged with its destination
struct ResolvedAddr {
    asset_type: String,
    account_name: String,
    path: String,
    addr: String,
}

pub struct Orchestrator<S, R> {
    sink: S,
    remote: R,
    owner: Option<String>,
    config: WalletConfig,
}

impl<S: StateSink, R: RemoteSync> Orchestrator<S, R> {
    pub fn new(sink: S, remote: R, owner: Option<String>, config: WalletConfig) -> Self {
        if config.debug_logging {
            crate::utils::logging::enable_debug();
        }
        Self {
            sink,
            remote,
            owner,
            config,
        }
    }

    /// Generate (or regenerate) the full supported asset set.
    ///
    /// Opens the existing sealed tree when given, drops entries for
    /// asset types no longer supported, derives default account-0
    /// batches for every missing type (all types when the regen
    /// policy is on), and re-projects addresses for any key lacking
    /// one. The merge rule protects user-activated slots: only
    /// account-0 indices below the default batch size are ever
    /// overwritten.
    pub async fn generate_wallets(
        &self,
        seed: &[u8],
        ctx: &CryptoContext,
        existing: Option<&SealedTree>,
    ) -> WalletResult<Vec<DisplayAsset>> {
        if seed.is_empty() {
            return Err(WalletError::validation("seed must not be empty"));
        }

        let mut tree = match existing {
            Some(sealed) => ctx.open(sealed)?,
            None => RawAssetTree::default(),
        };

        // Drop entries whose asset type left the supported set
        let before = tree.assets.len();
        tree.assets.retain(|name, _| config::meta_for(name).is_some());
        if tree.assets.len() < before {
            log_info!(
                "orchestrator",
                "dropped unsupported asset entries",
                dropped = before - tree.assets.len()
            );
        }

        let count = self.config.default_address_count;
        let needs_gen: Vec<&'static AssetMeta> = config::SUPPORTED_ASSETS
            .iter()
            .filter(|m| self.config.regen_everytime || !tree.assets.contains_key(m.asset_type))
            .collect();

        // Ethereum first: token types alias its account-0 keys
        let mut eth_batch: Option<Vec<DerivedKey>> = None;
        if let Some(eth) = needs_gen.iter().find(|m| m.asset_type == "ethereum") {
            let batch = self
                .run_derive_jobs(seed, vec![*eth], count)
                .await
                .pop()
                .ok_or_else(|| WalletError::derivation("ethereum derivation failed"))??
                .1;
            let entry = tree.assets.entry("ethereum".to_string()).or_default();
            merge_default_batch(entry, eth, &batch);
            eth_batch = Some(batch);
        }

        // Everything else in one barrier, arrival order irrelevant
        let standalone: Vec<&'static AssetMeta> = needs_gen
            .iter()
            .copied()
            .filter(|m| m.asset_type != "ethereum" && !m.is_erc20())
            .collect();
        for outcome in self.run_derive_jobs(seed, standalone, count).await {
            match outcome {
                Ok((meta, batch)) => {
                    let entry = tree.assets.entry(meta.asset_type.to_string()).or_default();
                    merge_default_batch(entry, meta, &batch);
                }
                Err(e) => {
                    log_error!("orchestrator", "derivation job failed", error = e);
                }
            }
        }

        // Token types reuse the Ethereum default keys
        for meta in needs_gen.iter().filter(|m| m.is_erc20()) {
            match alias_batch_from_ethereum(&tree, meta, eth_batch.as_deref(), count) {
                Ok(batch) => {
                    let entry = tree.assets.entry(meta.asset_type.to_string()).or_default();
                    merge_default_batch(entry, meta, &batch);
                }
                Err(e) => {
                    log_error!(
                        "orchestrator",
                        "token aliasing failed",
                        asset = meta.asset_type,
                        error = e
                    );
                }
            }
        }

        self.project_missing_addresses(&mut tree).await;

        let assets = build_display_assets(&tree, &[]);
        self.persist(ctx, &tree, assets.clone()).await?;
        tree.scrub();

        log_info!("orchestrator", "wallet generation done", assets = assets.len());
        Ok(assets)
    }

    /// Derive one more receive address for an asset, at the next free
    /// account-0 index.
    pub async fn generate_new_address(
        &self,
        seed: &[u8],
        ctx: &CryptoContext,
        sealed: &SealedTree,
        assets: &[DisplayAsset],
        asset_type: &str,
    ) -> WalletResult<AddressRecord> {
        if seed.is_empty() {
            return Err(WalletError::validation("seed must not be empty"));
        }
        let meta = config::meta_for(asset_type)
            .ok_or_else(|| WalletError::unsupported_asset(asset_type))?;

        let mut tree = ctx.open(sealed)?;
        let asset = tree.assets.get_mut(asset_type).ok_or_else(|| {
            WalletError::validation(format!("asset '{}' has not been generated", asset_type))
        })?;
        if asset.accounts.is_empty() {
            return Err(WalletError::validation(format!(
                "asset '{}' has no default account",
                asset_type
            )));
        }

        let next_ndx = asset.accounts[0].priv_keys.len() as u32;
        let derived = derivation::derive_batch(seed, meta, 0, CHAIN_EXTERNAL, next_ndx, 1)?
            .pop()
            .ok_or_else(|| WalletError::derivation("empty derivation batch"))?;

        let account_name = asset.accounts[0].name.clone();
        let record = AddressRecord {
            symbol: meta.symbol.to_string(),
            addr: derived.addr.clone(),
            account_name: account_name.clone(),
            path: derived.record.path.clone(),
            txs: Vec::new(),
            utxos: Vec::new(),
            last_addr_fetch_at: None,
        };
        asset.accounts[0].priv_keys.push(derived.record);
        asset.addresses.push(record.clone());

        let updated = refresh_projection(assets, &tree, asset_type);
        self.persist(ctx, &tree, updated).await?;
        tree.scrub();

        log_debug!(
            "orchestrator",
            "new address generated",
            asset = asset_type,
            addr = record.addr
        );
        Ok(record)
    }

    /// Import external private keys into a fresh account.
    ///
    /// Every supplied key is validated and resolved to an address
    /// before any state changes; a single bad key, or a claimed
    /// address that disagrees with its key, fails the whole batch
    /// with the tree untouched. The import counter only ever grows,
    /// so account indices are never reused.
    pub async fn import_priv_keys(
        &self,
        ctx: &CryptoContext,
        sealed: &SealedTree,
        assets: &[DisplayAsset],
        asset_type: &str,
        keys: &[KeyImport],
    ) -> WalletResult<ImportOutcome> {
        if keys.is_empty() {
            return Err(WalletError::validation("no keys supplied"));
        }
        let meta = config::meta_for(asset_type)
            .ok_or_else(|| WalletError::unsupported_asset(asset_type))?;

        let mut tree = ctx.open(sealed)?;
        if !tree.assets.contains_key(asset_type) {
            return Err(WalletError::validation(format!(
                "asset '{}' has not been generated",
                asset_type
            )));
        }

        // Validate everything up front; mutate nothing on failure
        let mut addrs = Vec::with_capacity(keys.len());
        for entry in keys {
            let derived = derivation::address_from_priv_key(meta, &entry.priv_key)?;
            if let Some(claimed) = &entry.addr {
                // account-chain addresses are hex with optional
                // checksum casing; UTXO encodings are case-exact
                let matches = match meta.chain {
                    ChainCategory::Account => claimed.eq_ignore_ascii_case(&derived),
                    ChainCategory::Utxo => claimed == &derived,
                };
                if !matches {
                    return Err(WalletError::invalid_key(
                        "supplied address does not match its private key",
                    ));
                }
            }
            addrs.push(derived);
        }

        let asset = tree
            .assets
            .get_mut(asset_type)
            .ok_or_else(|| WalletError::internal("asset entry vanished"))?;
        let account_ndx = asset.import_count + 1;
        let account_name = format!("Imported {}", account_ndx);

        let mut priv_keys = Vec::with_capacity(keys.len());
        for (i, (entry, addr)) in keys.iter().zip(addrs.iter()).enumerate() {
            let path = format!("i/44'/{}'/{}'/0/{}", meta.bip44_index, account_ndx, i);
            priv_keys.push(KeyRecord {
                priv_key: entry.priv_key.clone(),
                path: path.clone(),
            });
            asset.addresses.push(AddressRecord {
                symbol: meta.symbol.to_string(),
                addr: addr.clone(),
                account_name: account_name.clone(),
                path,
                txs: Vec::new(),
                utxos: Vec::new(),
                last_addr_fetch_at: None,
            });
        }
        asset.accounts.push(Account {
            name: account_name.clone(),
            priv_keys,
        });
        asset.import_count = account_ndx;

        let updated = refresh_projection(assets, &tree, asset_type);
        self.persist(ctx, &tree, updated).await?;
        tree.scrub();

        log_info!(
            "orchestrator",
            "keys imported",
            asset = asset_type,
            count = keys.len(),
            account = account_name
        );
        Ok(ImportOutcome {
            imported_count: keys.len(),
            account_name,
        })
    }

    /// Remove previously imported accounts by name.
    ///
    /// The default account is never removable and the import counter
    /// is never decremented.
    pub async fn remove_imported_accounts(
        &self,
        ctx: &CryptoContext,
        sealed: &SealedTree,
        assets: &[DisplayAsset],
        asset_type: &str,
        names: &[String],
    ) -> WalletResult<RemoveOutcome> {
        if names.is_empty() {
            return Err(WalletError::validation("no account names supplied"));
        }
        config::meta_for(asset_type).ok_or_else(|| WalletError::unsupported_asset(asset_type))?;

        let mut tree = ctx.open(sealed)?;
        let asset = tree.assets.get_mut(asset_type).ok_or_else(|| {
            WalletError::validation(format!("asset '{}' has not been generated", asset_type))
        })?;

        let mut outcome = RemoveOutcome::default();
        let mut ndx = 0usize;
        asset.accounts.retain(|account| {
            let keep = ndx == 0 || !names.contains(&account.name);
            if !keep {
                outcome.removed_account_count += 1;
            }
            ndx += 1;
            keep
        });
        let default_name = asset
            .accounts
            .first()
            .map(|a| a.name.clone())
            .unwrap_or_default();
        asset.addresses.retain(|record| {
            let keep = record.account_name == default_name || !names.contains(&record.account_name);
            if !keep {
                outcome.removed_addr_count += 1;
            }
            keep
        });

        let updated = refresh_projection(assets, &tree, asset_type);
        self.persist(ctx, &tree, updated).await?;
        tree.scrub();

        log_info!(
            "orchestrator",
            "imported accounts removed",
            asset = asset_type,
            accounts = outcome.removed_account_count,
            addrs = outcome.removed_addr_count
        );
        Ok(outcome)
    }

    /// Wallet dump: every key matched to its address record by HD
    /// path, with confirmed counts from the projection. Secrets are
    /// withheld when `redact_keys` is set.
    pub fn dump(
        &self,
        ctx: &CryptoContext,
        sealed: &SealedTree,
        assets: &[DisplayAsset],
        filter: Option<&str>,
        redact_keys: bool,
    ) -> WalletResult<Vec<WalletDump>> {
        let mut tree = ctx.open(sealed)?;

        let mut out = Vec::new();
        for (asset_type, asset) in &tree.assets {
            if let Some(wanted) = filter {
                if !asset_type.eq_ignore_ascii_case(wanted) {
                    continue;
                }
            }
            let Some(meta) = config::meta_for(asset_type) else {
                continue;
            };

            let display = assets.iter().find(|a| a.asset_type == *asset_type);
            let accounts = asset
                .accounts
                .iter()
                .map(|account| DumpAccount {
                    name: account.name.clone(),
                    keys: account
                        .priv_keys
                        .iter()
                        .map(|key| {
                            let record = asset.addresses.iter().find(|r| {
                                r.account_name == account.name && r.path == key.path
                            });
                            DumpKey {
                                path: key.path.clone(),
                                addr: record.map(|r| r.addr.clone()),
                                priv_key: (!redact_keys).then(|| key.priv_key.clone()),
                                confirmed_tx_count: record.map_or(0, |r| r.txs.len()),
                            }
                        })
                        .collect(),
                })
                .collect();

            out.push(WalletDump {
                asset_type: asset_type.clone(),
                symbol: meta.symbol.to_string(),
                accounts,
                unconfirmed_tx_count: display.map_or(0, |a| {
                    a.local_txs
                        .iter()
                        .filter(|t| t.block_no == BLOCK_NO_PENDING)
                        .count()
                }),
            });
        }
        tree.scrub();
        Ok(out)
    }

    /// Seal and dispatch, plus the best-effort pruned remote upload
    async fn persist(
        &self,
        ctx: &CryptoContext,
        tree: &RawAssetTree,
        assets: Vec<DisplayAsset>,
    ) -> WalletResult<()> {
        let sealed = ctx.seal(tree)?;
        self.sink.dispatch(WalletEvent::SetAssetsRaw(sealed));
        self.sink.dispatch(WalletEvent::SetAssets {
            assets,
            owner: self.owner.clone(),
        });

        if let Some(owner) = &self.owner {
            let mut pruned = tree.clone();
            vault::prune(&mut pruned);
            let upload = ctx
                .seal(&pruned)
                .map(|sealed| (owner.clone(), sealed));
            pruned.scrub();
            match upload {
                Ok((owner, sealed)) => {
                    if let Err(e) = self.remote.upload(&owner, &sealed).await {
                        log_warn!("orchestrator", "remote upload failed", error = e);
                    }
                }
                Err(e) => {
                    log_warn!("orchestrator", "remote seal failed", error = e);
                }
            }
        }
        Ok(())
    }

    /// Default-batch derivation per asset on the bounded pool,
    /// joined as a barrier. Results carry their meta so arrival
    /// order does not matter.
    async fn run_derive_jobs(
        &self,
        seed: &[u8],
        metas: Vec<&'static AssetMeta>,
        count: u32,
    ) -> Vec<WalletResult<(&'static AssetMeta, Vec<DerivedKey>)>> {
        let sem = Arc::new(Semaphore::new(self.config.worker_pool.max(1)));
        let mut set = JoinSet::new();
        for meta in metas {
            let sem = Arc::clone(&sem);
            let seed = Zeroizing::new(seed.to_vec());
            set.spawn(async move {
                let _permit = sem
                    .acquire_owned()
                    .await
                    .map_err(|_| WalletError::internal("derivation pool closed"))?;
                tokio::task::spawn_blocking(move || {
                    derivation::derive_batch(&seed, meta, 0, CHAIN_EXTERNAL, 0, count)
                        .map(|batch| (meta, batch))
                })
                .await
                .map_err(|e| WalletError::internal(format!("derivation task panicked: {}", e)))?
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = set.join_next().await {
            results.push(joined.unwrap_or_else(|e| {
                Err(WalletError::internal(format!("join failed: {}", e)))
            }));
        }
        results
    }

    /// One pool job per key lacking an address record. Covers trees
    /// opened from pruned envelopes, where every projection was
    /// stripped. Failures are logged and that key excluded; siblings
    /// are unaffected.
    async fn project_missing_addresses(&self, tree: &mut RawAssetTree) {
        let sem = Arc::new(Semaphore::new(self.config.worker_pool.max(1)));
        let mut set = JoinSet::new();

        for (asset_type, asset) in &tree.assets {
            let Some(meta) = config::meta_for(asset_type) else {
                continue;
            };
            for account in &asset.accounts {
                for key in &account.priv_keys {
                    let covered = asset
                        .addresses
                        .iter()
                        .any(|r| r.account_name == account.name && r.path == key.path);
                    if covered {
                        continue;
                    }
                    let sem = Arc::clone(&sem);
                    let asset_type = asset_type.clone();
                    let account_name = account.name.clone();
                    let path = key.path.clone();
                    let priv_key = Zeroizing::new(key.priv_key.clone());
                    set.spawn(async move {
                        let _permit = sem
                            .acquire_owned()
                            .await
                            .map_err(|_| WalletError::internal("derivation pool closed"))?;
                        tokio::task::spawn_blocking(move || {
                            derivation::address_from_priv_key(meta, &priv_key).map(|addr| {
                                ResolvedAddr {
                                    asset_type,
                                    account_name,
                                    path,
                                    addr,
                                }
                            })
                        })
                        .await
                        .map_err(|e| {
                            WalletError::internal(format!("projection task panicked: {}", e))
                        })?
                    });
                }
            }
        }

        while let Some(joined) = set.join_next().await {
            let outcome = joined
                .unwrap_or_else(|e| Err(WalletError::internal(format!("join failed: {}", e))));
            match outcome {
                Ok(resolved) => {
                    let Some(meta) = config::meta_for(&resolved.asset_type) else {
                        continue;
                    };
                    if let Some(asset) = tree.assets.get_mut(&resolved.asset_type) {
                        asset.addresses.push(AddressRecord {
                            symbol: meta.symbol.to_string(),
                            addr: resolved.addr,
                            account_name: resolved.account_name,
                            path: resolved.path,
                            txs: Vec::new(),
                            utxos: Vec::new(),
                            last_addr_fetch_at: None,
                        });
                    }
                }
                Err(e) => {
                    log_error!("orchestrator", "address projection failed", error = e);
                }
            }
        }
    }
}

/// Merge a freshly derived default batch into an asset entry.
///
/// Only account-0 indices `[0, batch.len())` are overwritten;
/// user-activated slots beyond the batch and every other account are
/// preserved untouched. Address records follow their key: a record
/// whose key text did not change keeps its transaction history.
fn merge_default_batch(asset: &mut RawAsset, meta: &AssetMeta, batch: &[DerivedKey]) {
    if asset.accounts.is_empty() {
        asset.accounts.push(Account {
            name: format!("Main {}", meta.display_name),
            priv_keys: Vec::new(),
        });
    }
    let account_name = asset.accounts[0].name.clone();

    for (i, derived) in batch.iter().enumerate() {
        let account = &mut asset.accounts[0];
        let replaced = match account.priv_keys.get(i) {
            Some(existing) => {
                if *existing == derived.record {
                    continue; // same key, keep record and history
                }
                account.priv_keys[i] = derived.record.clone();
                true
            }
            None => {
                account.priv_keys.push(derived.record.clone());
                false
            }
        };
        if replaced {
            asset
                .addresses
                .retain(|r| !(r.account_name == account_name && r.path == derived.record.path));
        }
        asset.addresses.push(AddressRecord {
            symbol: meta.symbol.to_string(),
            addr: derived.addr.clone(),
            account_name: account_name.clone(),
            path: derived.record.path.clone(),
            txs: Vec::new(),
            utxos: Vec::new(),
            last_addr_fetch_at: None,
        });
    }
}

/// Build the token default batch from the Ethereum account-0 keys.
/// Prefers the batch derived in this run; falls back to the tree and
/// recomputes addresses when the projection was pruned.
fn alias_batch_from_ethereum(
    tree: &RawAssetTree,
    token: &AssetMeta,
    fresh: Option<&[DerivedKey]>,
    count: u32,
) -> WalletResult<Vec<DerivedKey>> {
    if let Some(batch) = fresh {
        return Ok(batch.iter().take(count as usize).cloned().collect());
    }

    let eth = tree
        .assets
        .get("ethereum")
        .and_then(|a| a.accounts.first())
        .ok_or_else(|| WalletError::validation("ethereum must be generated before tokens"))?;
    let eth_addrs = &tree.assets["ethereum"].addresses;

    let mut batch = Vec::new();
    for key in eth.priv_keys.iter().take(count as usize) {
        let addr = match eth_addrs.iter().find(|r| r.path == key.path) {
            Some(record) => record.addr.clone(),
            None => derivation::address_from_priv_key(token, &key.priv_key)?,
        };
        batch.push(DerivedKey {
            record: key.clone(),
            addr,
        });
    }
    Ok(batch)
}

/// Display projection of the raw tree, table order, no secrets.
/// Pending transactions from `prior` are carried over by symbol.
fn build_display_assets(tree: &RawAssetTree, prior: &[DisplayAsset]) -> Vec<DisplayAsset> {
    config::SUPPORTED_ASSETS
        .iter()
        .filter_map(|meta| {
            let asset = tree.assets.get(meta.asset_type)?;
            let local_txs = prior
                .iter()
                .find(|a| a.asset_type == meta.asset_type)
                .map(|a| a.local_txs.clone())
                .unwrap_or_default();
            Some(DisplayAsset {
                asset_type: meta.asset_type.to_string(),
                symbol: meta.symbol.to_string(),
                display_name: meta.display_name.to_string(),
                chain: meta.chain,
                decimals: meta.decimals,
                addresses: asset.addresses.clone(),
                local_txs,
            })
        })
        .collect()
}

/// Replace one asset's projection within an existing display set
fn refresh_projection(
    assets: &[DisplayAsset],
    tree: &RawAssetTree,
    asset_type: &str,
) -> Vec<DisplayAsset> {
    let mut out: Vec<DisplayAsset> = assets.to_vec();
    let Some(raw) = tree.assets.get(asset_type) else {
        return out;
    };
    match out.iter_mut().find(|a| a.asset_type == asset_type) {
        Some(asset) => {
            asset.addresses = raw.addresses.clone();
        }
        None => {
            if let Some(meta) = config::meta_for(asset_type) {
                out.push(DisplayAsset {
                    asset_type: meta.asset_type.to_string(),
                    symbol: meta.symbol.to_string(),
                    display_name: meta.display_name.to_string(),
                    chain: meta.chain,
                    decimals: meta.decimals,
                    addresses: raw.addresses.clone(),
                    local_txs: Vec::new(),
                });
            }
        }
    }
    out
}

/// Confirmed and pending base-unit totals for one asset. Incoming
/// adds, outgoing subtracts (saturating, never wrapping). Display
/// conversion stays at the presentation boundary.
pub fn combined_balance(asset: &DisplayAsset) -> AssetBalance {
    let mut balance = AssetBalance::default();
    for record in &asset.addresses {
        for tx in &record.txs {
            if tx.is_incoming {
                balance.confirmed = balance.confirmed.saturating_add(tx.value);
            } else {
                balance.confirmed = balance.confirmed.saturating_sub(tx.value);
            }
        }
    }
    for tx in &asset.local_txs {
        if tx.block_no != BLOCK_NO_PENDING {
            continue;
        }
        if tx.is_incoming {
            balance.unconfirmed = balance.unconfirmed.saturating_add(tx.value);
        } else {
            balance.unconfirmed = balance
                .unconfirmed
                .saturating_sub(tx.value.saturating_add(tx.fees));
        }
    }
    balance
}
