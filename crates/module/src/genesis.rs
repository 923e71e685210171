//! Deployment configuration for the auction module.

use auction_types::{Address, ZERO_ADDRESS};
use serde::{Deserialize, Serialize};

/// Configuration fixed at deployment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuctionGenesisConfig {
    /// Identity of the decryption oracle; only it may invoke the
    /// decryption callbacks.
    pub oracle_authority: Address,

    /// Optional item description present before any admin sets one.
    pub initial_item: Option<String>,
}

impl AuctionGenesisConfig {
    pub fn new(oracle_authority: Address) -> Self {
        Self {
            oracle_authority,
            initial_item: None,
        }
    }

    pub fn with_item(oracle_authority: Address, item: impl Into<String>) -> Self {
        Self {
            oracle_authority,
            initial_item: Some(item.into()),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), GenesisValidationError> {
        if self.oracle_authority == ZERO_ADDRESS {
            return Err(GenesisValidationError::ZeroOracleAuthority);
        }
        Ok(())
    }
}

/// Errors that can occur during genesis validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenesisValidationError {
    #[error("Oracle authority cannot be the zero identity")]
    ZeroOracleAuthority,
}
