//! Engine configuration.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{OpenbarterError, Result, constants};

/// Identity of one engine instance. Feeds the typed-data domain, so two
/// engines with different configs never accept each other's signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    /// The engine's own account: verifying contract and direct spender.
    pub engine_address: Address,
    pub conduit_controller: Address,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: constants::ENGINE_NAME.to_string(),
            version: constants::ENGINE_VERSION.to_string(),
            chain_id: constants::DEFAULT_CHAIN_ID,
            engine_address: constants::DEFAULT_ENGINE_ADDRESS,
            conduit_controller: constants::DEFAULT_CONDUIT_CONTROLLER,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(OpenbarterError::Configuration("name must not be empty".into()));
        }
        if self.version.is_empty() {
            return Err(OpenbarterError::Configuration(
                "version must not be empty".into(),
            ));
        }
        if self.chain_id == 0 {
            return Err(OpenbarterError::Configuration("chain_id must be non-zero".into()));
        }
        if self.engine_address.is_zero() {
            return Err(OpenbarterError::Configuration(
                "engine_address must be non-zero".into(),
            ));
        }
        if self.conduit_controller.is_zero() {
            return Err(OpenbarterError::Configuration(
                "conduit_controller must be non-zero".into(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }
}
