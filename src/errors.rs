//! Error taxonomy shared across the Web3 layer.

use thiserror::Error;

use crate::types::conversions::ConversionError;

/// Errors surfaced by connection, artifact resolution, reads and mutations.
///
/// Mutation failures that happen after a transaction was submitted are not
/// represented here; those are reported through the transaction notifier and
/// never returned to callers.
#[derive(Debug, Error)]
pub enum Web3Error {
    #[error("No wallet provider is available in this environment")]
    WalletNotFound,

    #[error("Network {chain_id} is not supported by the deployed contract")]
    UnsupportedNetwork { chain_id: u64 },

    #[error("Contract artifact '{name}' not found")]
    ArtifactNotFound { name: String },

    #[error("Failed to load contract artifact: {detail}")]
    ArtifactLoad { detail: String },

    #[error("No contract is bound; connect a wallet first")]
    NotConnected,

    #[error("Fetch failed for {what}: {detail}")]
    Fetch { what: String, detail: String },

    #[error("Transaction rejected before submission: {detail}")]
    TransactionRejected { detail: String },

    #[error("Transaction reverted: {detail}")]
    TransactionReverted { detail: String },

    #[error("Provider error: {detail}")]
    Provider { detail: String },

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

impl Web3Error {
    pub fn fetch(what: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self::Fetch {
            what: what.into(),
            detail: detail.to_string(),
        }
    }

    pub fn provider(detail: impl std::fmt::Display) -> Self {
        Self::Provider {
            detail: detail.to_string(),
        }
    }

    /// True for errors that resolve by connecting a wallet on the right chain.
    pub fn is_connection_issue(&self) -> bool {
        matches!(
            self,
            Self::WalletNotFound | Self::UnsupportedNetwork { .. } | Self::NotConnected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_failing_piece() {
        let err = Web3Error::UnsupportedNetwork { chain_id: 5 };
        assert!(err.to_string().contains('5'));

        let err = Web3Error::ArtifactNotFound {
            name: "NftMarket".to_string(),
        };
        assert!(err.to_string().contains("NftMarket"));
    }

    #[test]
    fn test_connection_issue_classification() {
        assert!(Web3Error::NotConnected.is_connection_issue());
        assert!(Web3Error::WalletNotFound.is_connection_issue());
        assert!(!Web3Error::fetch("tokenURI", "timed out").is_connection_issue());
    }
}
