//! Configuration module for the supply-chain order contract.
//!
//! This module provides structures and utilities for managing contract
//! configuration. The product catalog and the role to organization mapping
//! live here instead of being compiled in, so a deployment can change them
//! without rebuilding.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

#[cfg(any(test, feature = "testing"))]
pub mod builders {
	pub mod config;
}
mod loader;

use regex::Regex;
use scm_types::Role;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the contract host.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this contract deployment.
	pub contract: ContractConfig,
	/// The product that can be ordered and its parts.
	#[serde(default)]
	pub catalog: CatalogConfig,
	/// Expected credentials for every organizational role.
	#[serde(default)]
	pub roles: RolesConfig,
	/// Order lifecycle policy.
	#[serde(default)]
	pub order: OrderConfig,
	/// Ledger storage backends.
	pub storage: StorageConfig,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Identity of this contract deployment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContractConfig {
	/// Name of the deployed contract, used in logs.
	pub id: String,
}

/// The single orderable product and the parts it is built from.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
	/// The only product id accepted by `placeProductOrder`.
	pub product_id: Uuid,
	/// Whitelist of part ids that may be ordered for the product.
	pub part_ids: Vec<Uuid>,
	/// Number of parts required to complete an order.
	/// Defaults to the number of whitelisted parts.
	#[serde(default)]
	pub parts_total_count: Option<usize>,
}

impl CatalogConfig {
	/// Number of part orders an order needs before it is complete.
	pub fn total_parts(&self) -> usize {
		self.parts_total_count.unwrap_or(self.part_ids.len())
	}

	/// Whether the given id is a whitelisted part of the product.
	pub fn is_valid_part(&self, part_id: &Uuid) -> bool {
		self.part_ids.contains(part_id)
	}
}

impl Default for CatalogConfig {
	fn default() -> Self {
		Self {
			product_id: Uuid::from_u128(0x97fac27b_c25c_4e4e_951e_e22d216ef1e7),
			part_ids: vec![
				Uuid::from_u128(0xbdc24678_9e47_48b7_934c_d1620cb2f757),
				Uuid::from_u128(0xdb419975_8ae0_4e0a_b4ce_0dfd239065d3),
			],
			parts_total_count: None,
		}
	}
}

/// Credentials a caller must present to act as a given role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct OrganizationConfig {
	/// MSP identifier of the organization.
	pub msp_id: String,
	/// Common name of the CA issuing the organization's certificates.
	pub issuer_common_name: String,
}

impl OrganizationConfig {
	fn new(msp_id: &str, issuer_common_name: &str) -> Self {
		Self {
			msp_id: msp_id.to_string(),
			issuer_common_name: issuer_common_name.to_string(),
		}
	}
}

/// Role to organization mapping.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RolesConfig {
	pub supplier: OrganizationConfig,
	pub producer: OrganizationConfig,
	pub distributor: OrganizationConfig,
	pub customer: OrganizationConfig,
}

impl RolesConfig {
	/// Returns the expected credentials for a role.
	pub fn organization(&self, role: Role) -> &OrganizationConfig {
		match role {
			Role::Supplier => &self.supplier,
			Role::Producer => &self.producer,
			Role::Distributor => &self.distributor,
			Role::Customer => &self.customer,
		}
	}
}

impl Default for RolesConfig {
	fn default() -> Self {
		Self {
			supplier: OrganizationConfig::new("SupplierMSP", "ca.supplier.scmn.com"),
			producer: OrganizationConfig::new("ProducerMSP", "ca.producer.scmn.com"),
			distributor: OrganizationConfig::new("DistributorMSP", "ca.distributor.scmn.com"),
			customer: OrganizationConfig::new("CustomerMSP", "ca.customer.scmn.com"),
		}
	}
}

/// Whether order state changes must follow the lifecycle adjacency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
	/// Any valid state may be entered from any state, given the right role.
	#[default]
	Permissive,
	/// Only lifecycle-adjacent transitions are accepted.
	Strict,
}

/// Configuration for order processing.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OrderConfig {
	#[serde(default)]
	pub transition_policy: TransitionPolicy,
}

/// Configuration for the ledger storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives and
	/// resolving environment variables.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Validates the configuration to ensure all required fields are properly set.
	///
	/// - Contract id is not empty
	/// - Catalog whitelists at least one part, without duplicates, and the
	///   required part count is reachable
	/// - Every role has non-empty credentials and no two roles share them
	/// - Primary storage is one of the configured implementations
	fn validate(&self) -> Result<(), ConfigError> {
		if self.contract.id.is_empty() {
			return Err(ConfigError::Validation("Contract ID cannot be empty".into()));
		}

		self.validate_catalog()?;
		self.validate_roles()?;

		if self.storage.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one storage implementation must be configured".into(),
			));
		}
		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}

		Ok(())
	}

	fn validate_catalog(&self) -> Result<(), ConfigError> {
		let catalog = &self.catalog;
		if catalog.part_ids.is_empty() {
			return Err(ConfigError::Validation(
				"Catalog must whitelist at least one part".into(),
			));
		}

		let mut seen = HashSet::new();
		for part_id in &catalog.part_ids {
			if !seen.insert(part_id) {
				return Err(ConfigError::Validation(format!(
					"Duplicate part id '{}' in catalog",
					part_id
				)));
			}
		}

		let total = catalog.total_parts();
		if total == 0 || total > catalog.part_ids.len() {
			return Err(ConfigError::Validation(format!(
				"parts_total_count must be between 1 and {} (number of whitelisted parts), got {}",
				catalog.part_ids.len(),
				total
			)));
		}

		Ok(())
	}

	fn validate_roles(&self) -> Result<(), ConfigError> {
		let mut owners: HashMap<&OrganizationConfig, Role> = HashMap::new();
		for role in Role::ALL {
			let organization = self.roles.organization(role);
			if organization.msp_id.is_empty() || organization.issuer_common_name.is_empty() {
				return Err(ConfigError::Validation(format!(
					"Role '{}' must have msp_id and issuer_common_name",
					role
				)));
			}
			if let Some(existing) = owners.insert(organization, role) {
				return Err(ConfigError::Validation(format!(
					"Roles '{}' and '{}' share the same credentials",
					existing, role
				)));
			}
		}
		Ok(())
	}
}

/// Parses configuration from a TOML string.
///
/// Environment variables are resolved and the configuration is validated
/// after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
