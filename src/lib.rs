//! wallet-core: key management and transaction visibility for a
//! multi-chain wallet.
//!
//! The sealed raw asset tree is the sole source of truth for private
//! keys; everything a frontend renders is a derived, secrets-free
//! projection. Around that sit four pieces:
//!
//! - deterministic BIP44 derivation for Bitcoin-family and
//!   Ethereum-family chains ([`wallet::derivation`])
//! - authenticated sealing of the raw tree ([`wallet::vault`])
//! - the asset orchestrator driving generation, import and removal
//!   ([`wallet::orchestrator`])
//! - mempool reconciliation and address subscriptions
//!   ([`reconcile`], [`subscribe`])
//!
//! State flows one way: operations transform the tree, re-seal it,
//! and dispatch typed [`store::WalletEvent`]s through a
//! [`store::StateSink`].
//!
//! SECURITY: key material is zeroized on drop everywhere it appears,
//! and the logging layer redacts sensitive fields by key name.

pub mod config;
pub mod error;
pub mod reconcile;
pub mod store;
pub mod subscribe;
pub mod types;
pub mod utils;
pub mod wallet;

pub use config::{AssetMeta, WalletConfig};
pub use error::{ErrorCode, WalletError, WalletResult};
pub use store::{MemoryStore, NullRemote, RemoteSync, StateSink, StateView, WalletEvent};
pub use types::{
    Account, AddressRecord, ChainCategory, ChainTx, DisplayAsset, KeyRecord, LocalTx, RawAsset,
    RawAssetTree, Utxo,
};
pub use wallet::{CryptoContext, Orchestrator, SealedTree};
