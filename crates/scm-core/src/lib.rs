//! Core contract logic for the supply-chain order ledger.
//!
//! Ties the order and part order state machines to the ledger and the
//! access control gates, and routes named commands with positional string
//! arguments to them. Hosts (the CLI, the HTTP API) only ever call
//! [`ScmContract::invoke`].

use scm_access::{AccessControl, IdentityProvider};
use scm_config::Config;
use scm_storage::LedgerService;
use scm_types::ProductOrder;
use std::sync::Arc;
use tracing::instrument;

pub mod builder;
pub mod error;
pub mod router;
pub mod state;

pub use builder::{BuilderError, ScmBuilder, ScmFactories};
pub use error::{ContractError, ErrorKind};
pub use router::Command;
pub use state::{OrderStateMachine, OrderStore, PartOrderStateMachine};

/// The deployed contract.
///
/// Owns one order store shared by both state machines, so part order
/// changes and order changes go through the same write path.
pub struct ScmContract {
	/// Contract configuration.
	config: Config,
	/// Persistence of product orders.
	store: Arc<OrderStore>,
	/// Product order lifecycle.
	orders: OrderStateMachine,
	/// Part order lifecycle.
	part_orders: PartOrderStateMachine,
}

impl ScmContract {
	pub fn new(config: Config, ledger: Arc<LedgerService>) -> Self {
		let store = Arc::new(OrderStore::new(ledger));
		let access = Arc::new(AccessControl::new(config.roles.clone()));
		let orders = OrderStateMachine::new(
			store.clone(),
			access.clone(),
			config.catalog.clone(),
			config.order.transition_policy,
		);
		let part_orders = PartOrderStateMachine::new(store.clone(), access);

		Self {
			config,
			store,
			orders,
			part_orders,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn store(&self) -> &OrderStore {
		&self.store
	}

	pub fn orders(&self) -> &OrderStateMachine {
		&self.orders
	}

	pub fn part_orders(&self) -> &PartOrderStateMachine {
		&self.part_orders
	}

	/// Routes a named command and runs it on behalf of `caller`.
	///
	/// Returns the command's payload: the new order id for
	/// `placeProductOrder`, a JSON array of orders for the queries and an
	/// empty payload otherwise.
	#[instrument(skip_all, fields(contract = %self.config.contract.id, function = %function))]
	pub async fn invoke(
		&self,
		function: &str,
		args: &[String],
		caller: &dyn IdentityProvider,
	) -> Result<Vec<u8>, ContractError> {
		let command = Command::parse(function, args)?;
		let is_query = command.is_query();
		let payload = self.execute(command, caller).await?;
		if !is_query {
			tracing::debug!(function, payload_len = payload.len(), "Ledger updated");
		}
		Ok(payload)
	}

	/// Runs an already routed command.
	pub async fn execute(
		&self,
		command: Command,
		caller: &dyn IdentityProvider,
	) -> Result<Vec<u8>, ContractError> {
		match command {
			Command::PlaceProductOrder { product_id } => {
				let order = self.orders.place_order(caller, &product_id).await?;
				Ok(order.key().into_bytes())
			},
			Command::OrderProductPart {
				order_id,
				product_part_id,
			} => {
				self.orders
					.request_part_order(caller, &order_id, &product_part_id)
					.await?;
				Ok(Vec::new())
			},
			Command::ChangeProductOrderState {
				order_id,
				new_state,
				rejecter,
			} => {
				self.orders
					.change_order_state(caller, &order_id, &new_state, &rejecter)
					.await?;
				Ok(Vec::new())
			},
			Command::ChangeProductPartOrderState {
				order_id,
				part_order_id,
				new_state,
			} => {
				self.part_orders
					.change_part_order_state(caller, &order_id, &part_order_id, &new_state)
					.await?;
				Ok(Vec::new())
			},
			Command::QueryAllProductOrders => encode(&self.orders.query_all_orders().await?),
			Command::QueryProductOrderHistory { order_id } => {
				encode(&self.orders.query_order_history(&order_id).await?)
			},
		}
	}
}

fn encode(orders: &[ProductOrder]) -> Result<Vec<u8>, ContractError> {
	serde_json::to_vec(orders).map_err(|e| ContractError::Storage(e.to_string()))
}
