//! Wallet core: derivation, sealing, and the asset orchestrator.

pub mod derivation;
pub mod orchestrator;
pub mod vault;

pub use derivation::{address_from_priv_key, derive_batch, DerivedKey};
pub use orchestrator::{
    combined_balance, AssetBalance, ImportOutcome, KeyImport, Orchestrator, RemoveOutcome,
    WalletDump,
};
pub use vault::{CryptoContext, SealedTree};
