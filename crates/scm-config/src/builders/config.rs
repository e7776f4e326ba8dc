//! Configuration builder for test and development configurations.

use crate::{
	ApiConfig, CatalogConfig, Config, ContractConfig, OrderConfig, RolesConfig, StorageConfig,
	TransitionPolicy,
};
use std::collections::HashMap;

/// Builder for creating `Config` instances with a fluent API.
///
/// Starts from the default deployment (default catalog and roles, in-memory
/// ledger) so tests only spell out what they change.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	contract_id: String,
	catalog: CatalogConfig,
	roles: RolesConfig,
	transition_policy: TransitionPolicy,
	storage_primary: String,
	storage_implementations: HashMap<String, toml::Value>,
	api: Option<ApiConfig>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		let mut storage_implementations = HashMap::new();
		storage_implementations.insert(
			"memory".to_string(),
			toml::Value::Table(toml::map::Map::new()),
		);

		Self {
			contract_id: "test-contract".to_string(),
			catalog: CatalogConfig::default(),
			roles: RolesConfig::default(),
			transition_policy: TransitionPolicy::Permissive,
			storage_primary: "memory".to_string(),
			storage_implementations,
			api: None,
		}
	}

	pub fn contract_id(mut self, id: impl Into<String>) -> Self {
		self.contract_id = id.into();
		self
	}

	pub fn catalog(mut self, catalog: CatalogConfig) -> Self {
		self.catalog = catalog;
		self
	}

	pub fn roles(mut self, roles: RolesConfig) -> Self {
		self.roles = roles;
		self
	}

	pub fn transition_policy(mut self, policy: TransitionPolicy) -> Self {
		self.transition_policy = policy;
		self
	}

	/// Adds a storage implementation and makes it primary.
	pub fn storage(mut self, name: impl Into<String>, config: toml::Value) -> Self {
		let name = name.into();
		self.storage_implementations.insert(name.clone(), config);
		self.storage_primary = name;
		self
	}

	pub fn api(mut self, api: Option<ApiConfig>) -> Self {
		self.api = api;
		self
	}

	pub fn build(self) -> Config {
		Config {
			contract: ContractConfig {
				id: self.contract_id,
			},
			catalog: self.catalog,
			roles: self.roles,
			order: OrderConfig {
				transition_policy: self.transition_policy,
			},
			storage: StorageConfig {
				primary: self.storage_primary,
				implementations: self.storage_implementations,
			},
			api: self.api,
		}
	}
}
