//! Main entry point for the supply-chain order contract host.
//!
//! This binary hosts the contract outside of a ledger peer. It either serves
//! the HTTP API, or runs a single invocation from the command line and
//! prints the payload.

use clap::{Parser, Subcommand};
use scm_access::InvocationIdentity;
use scm_config::Config;
use scm_core::{ScmBuilder, ScmContract, ScmFactories};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

mod apis;
mod server;

/// Command-line arguments for the contract host.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml", global = true)]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info", global = true)]
	log_level: String,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Serve the HTTP API (default)
	Serve,
	/// Invoke a single contract function and print its payload
	Invoke {
		/// Contract function name, e.g. placeProductOrder
		function: String,

		/// Positional arguments of the function
		args: Vec<String>,

		/// MSP id of the caller
		#[arg(long, env = "SCM_MSP_ID")]
		msp_id: Option<String>,

		/// Common name of the caller's certificate issuer
		#[arg(long, env = "SCM_ISSUER_CN")]
		issuer_cn: Option<String>,
	},
}

/// Errors raised by the host before the contract is involved.
#[derive(Debug, Error)]
enum ServiceError {
	#[error("Configuration path is not valid UTF-8: {0}")]
	InvalidConfigPath(String),
	#[error("API server is not enabled; set [api] enabled = true")]
	ApiDisabled,
}

/// Main entry point for the contract host.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the contract on the configured ledger
/// 5. Serves the API or runs one invocation
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	// Logs go to stderr so invocation payloads own stdout
	fmt()
		.with_env_filter(env_filter)
		.with_writer(std::io::stderr)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	let config_path = args
		.config
		.to_str()
		.ok_or_else(|| ServiceError::InvalidConfigPath(args.config.display().to_string()))?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.contract.id);

	let contract = Arc::new(build_contract(config.clone())?);

	match args.command.unwrap_or(Command::Serve) {
		Command::Serve => {
			let api_config = config
				.api
				.clone()
				.filter(|api| api.enabled)
				.ok_or(ServiceError::ApiDisabled)?;
			server::start_server(api_config, contract).await?;
			tracing::info!("Stopped API server");
		},
		Command::Invoke {
			function,
			args,
			msp_id,
			issuer_cn,
		} => {
			let identity = InvocationIdentity::new(msp_id, issuer_cn);
			let payload = contract.invoke(&function, &args, &identity).await?;
			println!("{}", render_payload(&payload));
		},
	}

	Ok(())
}

/// Renders an invocation payload for the terminal, pretty-printing JSON.
fn render_payload(payload: &[u8]) -> String {
	match serde_json::from_slice::<serde_json::Value>(payload) {
		Ok(value) => serde_json::to_string_pretty(&value)
			.unwrap_or_else(|_| String::from_utf8_lossy(payload).into_owned()),
		Err(_) => String::from_utf8_lossy(payload).into_owned(),
	}
}

/// Builds the contract on the configured ledger backend.
fn build_contract(config: Config) -> Result<ScmContract, Box<dyn std::error::Error>> {
	let builder = ScmBuilder::new(config);

	let mut storage_factories = HashMap::new();
	for (name, factory) in scm_storage::get_all_implementations() {
		tracing::debug!("Registering storage implementation: {}", name);
		storage_factories.insert(name.to_string(), factory);
	}

	let factories = ScmFactories { storage_factories };

	Ok(builder.build(factories)?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use scm_config::builders::config::ConfigBuilder;
	use tempfile::tempdir;

	#[test]
	fn test_args_default_values() {
		let args = Args::parse_from(["scm"]);
		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");
		assert!(args.command.is_none());
	}

	#[test]
	fn test_invoke_args() {
		let args = Args::parse_from([
			"scm",
			"--config",
			"custom.toml",
			"invoke",
			"changeProductOrderState",
			"97fac27b-c25c-4e4e-951e-e22d216ef1e7",
			"REJECTED",
			"",
			"--msp-id",
			"SupplierMSP",
			"--issuer-cn",
			"ca.supplier.scmn.com",
		]);

		assert_eq!(args.config, PathBuf::from("custom.toml"));
		match args.command {
			Some(Command::Invoke {
				function,
				args,
				msp_id,
				issuer_cn,
			}) => {
				assert_eq!(function, "changeProductOrderState");
				assert_eq!(args.len(), 3);
				assert_eq!(args[2], "");
				assert_eq!(msp_id.as_deref(), Some("SupplierMSP"));
				assert_eq!(issuer_cn.as_deref(), Some("ca.supplier.scmn.com"));
			},
			other => panic!("unexpected command: {:?}", other),
		}
	}

	#[test]
	fn test_render_payload() {
		assert_eq!(render_payload(b"abc-123"), "abc-123");
		assert_eq!(render_payload(b"[]"), "[]");
	}

	#[tokio::test]
	async fn test_build_contract_with_minimal_config() {
		let contract = build_contract(ConfigBuilder::new().build()).unwrap();
		assert_eq!(contract.config().contract.id, "test-contract");

		let identity = InvocationIdentity::default();
		let payload = contract
			.invoke("queryAllProductOrders", &[], &identity)
			.await
			.unwrap();
		assert_eq!(payload, b"[]");
	}

	#[tokio::test]
	async fn test_build_contract_from_file_config() {
		let temp_dir = tempdir().unwrap();
		let ledger_dir = temp_dir.path().join("ledger");
		let config_path = temp_dir.path().join("scm.toml");

		let config_content = format!(
			r#"
[contract]
id = "file-contract"

[storage]
primary = "file"

[storage.implementations.file]
storage_path = "{}"
"#,
			ledger_dir.display()
		);
		std::fs::write(&config_path, config_content).unwrap();

		let config = Config::from_file(config_path.to_str().unwrap())
			.await
			.unwrap();
		let contract = build_contract(config).unwrap();
		assert_eq!(contract.config().contract.id, "file-contract");
		assert!(ledger_dir.exists());
	}

	#[tokio::test]
	async fn test_build_contract_rejects_unregistered_backend() {
		let config = ConfigBuilder::new()
			.storage("redis", toml::Value::Table(toml::map::Map::new()))
			.build();
		match build_contract(config) {
			Err(err) => assert!(err.to_string().contains("redis")),
			Ok(_) => panic!("redis is not a registered ledger backend"),
		}
	}
}
