//! Ledger access facade for the supply-chain order contract.
//!
//! The contract never talks to a storage engine directly. It reads and writes
//! through [`LedgerInterface`], a narrow key-value view of an append-only,
//! versioned ledger: every write adds a new version of a key, the latest
//! version is the current state, and the full version list is the key's
//! history.

use async_trait::async_trait;
use scm_types::{ConfigSchema, ImplementationRegistry};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Low-level interface of a ledger backend.
///
/// Backends must make each `put_state` atomic: a reader sees either the
/// previous version or the new one, never a partial write.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait LedgerInterface: Send + Sync {
	/// Returns the current value of a key, or `None` if it was never written.
	async fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

	/// Writes a new version of a key.
	async fn put_state(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Returns the current `(key, value)` pairs with `start_key <= key < end_key`
	/// in key order. An empty bound is unbounded on that side.
	async fn get_state_by_range(
		&self,
		start_key: &str,
		end_key: &str,
	) -> Result<Vec<(String, Vec<u8>)>, StorageError>;

	/// Returns every version ever written for a key, oldest first.
	async fn get_history_for_key(&self, key: &str) -> Result<Vec<Vec<u8>>, StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Whether `key` falls inside a range scan's bounds.
pub(crate) fn in_range(key: &str, start_key: &str, end_key: &str) -> bool {
	(start_key.is_empty() || key >= start_key) && (end_key.is_empty() || key < end_key)
}

/// Type alias for ledger factory functions.
pub type LedgerFactory = fn(&toml::Value) -> Result<Box<dyn LedgerInterface>, StorageError>;

/// Registry trait for ledger implementations.
pub trait LedgerRegistry: ImplementationRegistry<Factory = LedgerFactory> {}

/// Get all registered ledger implementations as `(name, factory)` pairs.
pub fn get_all_implementations() -> Vec<(&'static str, LedgerFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Typed view over a ledger backend.
///
/// Values are stored as JSON; the service owns the conversion so callers only
/// deal with domain records.
pub struct LedgerService {
	backend: Box<dyn LedgerInterface>,
}

impl LedgerService {
	pub fn new(backend: Box<dyn LedgerInterface>) -> Self {
		Self { backend }
	}

	/// Reads and deserializes the current value of a key.
	pub async fn retrieve<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
		match self.backend.get_state(key).await? {
			Some(bytes) => decode(&bytes).map(Some),
			None => Ok(None),
		}
	}

	/// Serializes a value and writes it as the new version of a key.
	pub async fn store<T: Serialize>(&self, key: &str, data: &T) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.put_state(key, bytes).await
	}

	/// Reads every value in a key range, in key order.
	pub async fn scan<T: DeserializeOwned>(
		&self,
		start_key: &str,
		end_key: &str,
	) -> Result<Vec<T>, StorageError> {
		self.backend
			.get_state_by_range(start_key, end_key)
			.await?
			.iter()
			.map(|(_, bytes)| decode(bytes))
			.collect()
	}

	/// Reads every historical version of a key, oldest first.
	pub async fn history<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StorageError> {
		self.backend
			.get_history_for_key(key)
			.await?
			.iter()
			.map(|bytes| decode(bytes))
			.collect()
	}
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
	serde_json::from_slice(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use implementations::memory::MemoryLedger;
	use serde::Deserialize;

	#[derive(Debug, PartialEq, Serialize, Deserialize)]
	struct Record {
		name: String,
		count: u32,
	}

	fn record(name: &str, count: u32) -> Record {
		Record {
			name: name.to_string(),
			count,
		}
	}

	#[test]
	fn test_range_bounds() {
		assert!(in_range("b", "", ""));
		assert!(in_range("b", "a", "c"));
		assert!(in_range("a", "a", "c"));
		assert!(!in_range("c", "a", "c"));
		assert!(in_range("z", "a", ""));
		assert!(!in_range("a", "b", ""));
	}

	#[tokio::test]
	async fn test_typed_store_and_retrieve() {
		let service = LedgerService::new(Box::new(MemoryLedger::new()));

		assert_eq!(service.retrieve::<Record>("k1").await.unwrap(), None);

		service.store("k1", &record("first", 1)).await.unwrap();
		service.store("k1", &record("second", 2)).await.unwrap();
		service.store("k2", &record("other", 3)).await.unwrap();

		assert_eq!(
			service.retrieve::<Record>("k1").await.unwrap(),
			Some(record("second", 2))
		);
		assert_eq!(
			service.history::<Record>("k1").await.unwrap(),
			vec![record("first", 1), record("second", 2)]
		);
		assert_eq!(
			service.scan::<Record>("", "").await.unwrap(),
			vec![record("second", 2), record("other", 3)]
		);
	}

	#[tokio::test]
	async fn test_undecodable_value() {
		let backend = MemoryLedger::new();
		backend.put_state("bad", b"not json".to_vec()).await.unwrap();
		let service = LedgerService::new(Box::new(backend));

		assert!(matches!(
			service.retrieve::<Record>("bad").await,
			Err(StorageError::Serialization(_))
		));
	}
}
