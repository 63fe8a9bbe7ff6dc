//! Unified error types for the wallet core
//!
//! All errors flow through this module for consistent handling
//! across the derivation, persistence and reconciliation layers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for all wallet-core operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl WalletError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    /// Missing required input - fails fast, no mutation attempted
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, msg)
    }

    /// Unknown symbol or derivation scheme
    pub fn unsupported_asset(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnsupportedAsset, msg)
    }

    /// Supplied key failed validation during import
    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidKey, msg)
    }

    /// Cryptographic derivation failure on a single job
    pub fn derivation(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Derivation, msg)
    }

    /// Seal/open or remote-sync persistence failure
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Persistence, msg)
    }

    /// Subscription channel unavailable
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Transport, msg)
    }

    pub fn crypto_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::CryptoError, msg)
    }

    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for WalletError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Contract errors
    Validation,
    UnsupportedAsset,
    InvalidKey,
    Derivation,
    Persistence,
    Transport,

    // Crypto errors
    CryptoError,

    // Parse errors
    ParseError,
    JsonError,
    HexError,

    // Internal
    Internal,
}

/// Result type alias for wallet-core operations
pub type WalletResult<T> = Result<T, WalletError>;

// Conversions from common error types

impl From<serde_json::Error> for WalletError {
    fn from(e: serde_json::Error) -> Self {
        WalletError::new(ErrorCode::JsonError, e.to_string())
    }
}

impl From<hex::FromHexError> for WalletError {
    fn from(e: hex::FromHexError) -> Self {
        WalletError::new(ErrorCode::HexError, e.to_string())
    }
}

impl From<bitcoin::bip32::Error> for WalletError {
    fn from(e: bitcoin::bip32::Error) -> Self {
        WalletError::new(ErrorCode::Derivation, format!("BIP32 error: {}", e))
    }
}

impl From<bitcoin::secp256k1::Error> for WalletError {
    fn from(e: bitcoin::secp256k1::Error) -> Self {
        WalletError::new(ErrorCode::CryptoError, format!("Secp256k1 error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let err = WalletError::invalid_key("Invalid private key")
            .with_details("WIF checksum mismatch");

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("invalid_key"));
        assert!(json.contains("Invalid private key"));
    }

    #[test]
    fn test_error_display_includes_details() {
        let err = WalletError::unsupported_asset("no such symbol").with_details("XYZ");
        let rendered = err.to_string();
        assert!(rendered.contains("UnsupportedAsset"));
        assert!(rendered.contains("XYZ"));
    }
}
