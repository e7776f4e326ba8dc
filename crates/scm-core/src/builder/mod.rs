//! Builder pattern for constructing the contract.
//!
//! Composes an [`ScmContract`] from configuration and a set of named ledger
//! factories, picking the configured primary backend.

use crate::ScmContract;
use scm_config::Config;
use scm_storage::{LedgerInterface, LedgerService, StorageError};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during contract construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
}

/// Factory functions needed to build the contract, keyed by implementation name.
pub struct ScmFactories<SF> {
	pub storage_factories: HashMap<String, SF>,
}

/// Builder for constructing an [`ScmContract`] with a pluggable ledger.
pub struct ScmBuilder {
	config: Config,
}

impl ScmBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the contract using the factory registered for the primary ledger.
	pub fn build<SF>(self, factories: ScmFactories<SF>) -> Result<ScmContract, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn LedgerInterface>, StorageError>,
	{
		let primary = &self.config.storage.primary;
		let ledger_config = self
			.config
			.storage
			.implementations
			.get(primary)
			.ok_or_else(|| {
				BuilderError::Config(format!(
					"Primary storage '{}' has no configuration",
					primary
				))
			})?;
		let factory = factories.storage_factories.get(primary).ok_or_else(|| {
			BuilderError::Config(format!("Unknown storage implementation '{}'", primary))
		})?;

		let backend = match factory(ledger_config) {
			Ok(backend) => backend,
			Err(e) => {
				tracing::error!(
					component = "storage",
					implementation = %primary,
					error = %e,
					"Failed to create storage implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create storage implementation '{}': {}",
					primary, e
				)));
			},
		};
		if let Err(e) = backend.config_schema().validate(ledger_config) {
			tracing::error!(
				component = "storage",
				implementation = %primary,
				error = %e,
				"Invalid configuration for storage implementation"
			);
			return Err(BuilderError::Config(format!(
				"Invalid configuration for storage implementation '{}': {}",
				primary, e
			)));
		}
		tracing::info!(component = "storage", implementation = %primary, "Loaded");

		let ledger = Arc::new(LedgerService::new(backend));
		Ok(ScmContract::new(self.config, ledger))
	}
}
