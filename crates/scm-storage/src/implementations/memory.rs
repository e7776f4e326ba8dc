//! In-memory ledger backend.
//!
//! Keeps every version of every key in a sorted map. Nothing survives a
//! restart, which makes it the backend of choice for tests and local runs.

use crate::{in_range, LedgerFactory, LedgerInterface, LedgerRegistry, StorageError};
use async_trait::async_trait;
use scm_types::{ConfigSchema, ImplementationRegistry, Schema, ValidationError};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// In-memory ledger implementation.
pub struct MemoryLedger {
	/// Versions per key, oldest first. A key is present only once written.
	versions: RwLock<BTreeMap<String, Vec<Vec<u8>>>>,
}

impl MemoryLedger {
	pub fn new() -> Self {
		Self {
			versions: RwLock::new(BTreeMap::new()),
		}
	}
}

impl Default for MemoryLedger {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl LedgerInterface for MemoryLedger {
	async fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
		let versions = self.versions.read().await;
		Ok(versions.get(key).and_then(|history| history.last().cloned()))
	}

	async fn put_state(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let mut versions = self.versions.write().await;
		versions.entry(key.to_string()).or_default().push(value);
		Ok(())
	}

	async fn get_state_by_range(
		&self,
		start_key: &str,
		end_key: &str,
	) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
		let versions = self.versions.read().await;
		Ok(versions
			.iter()
			.filter(|(key, _)| in_range(key, start_key, end_key))
			.filter_map(|(key, history)| history.last().map(|value| (key.clone(), value.clone())))
			.collect())
	}

	async fn get_history_for_key(&self, key: &str) -> Result<Vec<Vec<u8>>, StorageError> {
		let versions = self.versions.read().await;
		Ok(versions.get(key).cloned().unwrap_or_default())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryLedgerSchema)
	}
}

/// Configuration schema for MemoryLedger. It takes no options.
pub struct MemoryLedgerSchema;

impl ConfigSchema for MemoryLedgerSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Factory function to create a memory ledger from configuration.
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn LedgerInterface>, StorageError> {
	MemoryLedgerSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;
	Ok(Box::new(MemoryLedger::new()))
}

/// Registry for the memory ledger implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = LedgerFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl LedgerRegistry for Registry {}
