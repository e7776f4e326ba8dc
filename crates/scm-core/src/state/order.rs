//! Order state machine implementation.
//!
//! Places product orders, appends part orders to them and moves them through
//! their lifecycle: ORDERED -> ACCEPTED -> MANUFACTURED -> DELIVERED, with
//! REJECTED reachable from any non-terminal state. Every state change is
//! guarded by the role responsible for it.

use super::{parse_id, OrderStore};
use crate::error::append_error;
use crate::ContractError;
use once_cell::sync::Lazy;
use scm_access::{caller_identity, AccessControl, IdentityProvider};
use scm_config::{CatalogConfig, TransitionPolicy};
use scm_types::{now, truncate_id, OrderState, ProductOrder, ProductPartOrder, Role};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

/// Roles allowed to reject an order.
const REJECTERS: [Role; 3] = [Role::Producer, Role::Supplier, Role::Distributor];

/// Manages product orders and their lifecycle.
pub struct OrderStateMachine {
	store: Arc<OrderStore>,
	access: Arc<AccessControl>,
	catalog: CatalogConfig,
	policy: TransitionPolicy,
}

impl OrderStateMachine {
	pub fn new(
		store: Arc<OrderStore>,
		access: Arc<AccessControl>,
		catalog: CatalogConfig,
		policy: TransitionPolicy,
	) -> Self {
		Self {
			store,
			access,
			catalog,
			policy,
		}
	}

	/// Places a new order for the catalog product. Customer only.
	pub async fn place_order(
		&self,
		caller: &dyn IdentityProvider,
		product_id: &str,
	) -> Result<ProductOrder, ContractError> {
		let identity = caller_identity(caller)?;
		self.access.authenticate(Role::Customer, &identity)?;

		let product_id = Uuid::parse_str(product_id)
			.ok()
			.filter(|id| *id == self.catalog.product_id)
			.ok_or_else(|| ContractError::InvalidProductId(product_id.to_string()))?;

		let order = ProductOrder::new(product_id, self.catalog.total_parts(), now());
		self.store.insert_order(&order).await?;

		tracing::info!(
			order_id = %truncate_id(&order.key()),
			customer = %identity.msp_id,
			"Order placed"
		);
		Ok(order)
	}

	/// Orders one part of the product for an existing order. Producer only.
	pub async fn request_part_order(
		&self,
		caller: &dyn IdentityProvider,
		order_id: &str,
		product_part_id: &str,
	) -> Result<ProductPartOrder, ContractError> {
		let identity = caller_identity(caller)?;
		self.access.authenticate(Role::Producer, &identity)?;

		let order_id = parse_id(order_id, "product order id")?;
		let product_part_id = Uuid::parse_str(product_part_id)
			.ok()
			.filter(|id| self.catalog.is_valid_part(id))
			.ok_or_else(|| ContractError::InvalidPartId(product_part_id.to_string()))?;

		let part = ProductPartOrder::new(product_part_id, now());
		let appended = part.clone();
		let order = self
			.store
			.update_order_with(&order_id, |order| {
				order
					.append_part_order(part)
					.map_err(|e| append_error(e, &product_part_id))
			})
			.await?;

		tracing::info!(
			order_id = %truncate_id(&order.key()),
			part_order_id = %truncate_id(&appended.order_id.to_string()),
			parts_ordered = order.part_orders().len(),
			parts_total = order.product_parts_total_count,
			"Part ordered"
		);
		Ok(appended)
	}

	/// Moves an order to `new_state` on behalf of the role responsible for it.
	///
	/// `rejecter` is recorded as the rejecting organization when the order
	/// is rejected and the value is non-empty.
	pub async fn change_order_state(
		&self,
		caller: &dyn IdentityProvider,
		order_id: &str,
		new_state: &str,
		rejecter: &str,
	) -> Result<ProductOrder, ContractError> {
		let new_state: OrderState = new_state
			.parse()
			.map_err(|_| ContractError::InvalidState(new_state.to_string()))?;

		let roles = required_roles(new_state)?;
		let identity = caller_identity(caller)?;
		match roles {
			[role] => self.access.authenticate(*role, &identity)?,
			_ => {
				self.access.authenticate_any(
					roles,
					&identity,
					&format!("new product order state {}", new_state),
				)?;
			},
		}

		let order_id = parse_id(order_id, "product order id")?;
		let policy = self.policy;
		let mut previous = new_state;
		let order = self
			.store
			.update_order_with(&order_id, |order| {
				previous = order.state;
				if policy == TransitionPolicy::Strict && !is_valid_transition(order.state, new_state)
				{
					return Err(ContractError::InvalidTransition {
						from: order.state,
						to: new_state,
					});
				}
				apply_transition(order, new_state, rejecter);
				Ok(())
			})
			.await?;

		tracing::info!(
			order_id = %truncate_id(&order.key()),
			from = %previous,
			to = %new_state,
			caller = %identity.msp_id,
			"Order state changed"
		);
		Ok(order)
	}

	/// Every order on the ledger. Visible to everyone.
	pub async fn query_all_orders(&self) -> Result<Vec<ProductOrder>, ContractError> {
		let orders = self.store.all_orders().await?;
		tracing::debug!(count = orders.len(), "Queried all orders");
		Ok(orders)
	}

	/// Every stored version of an order, oldest first. Visible to everyone.
	pub async fn query_order_history(
		&self,
		order_id: &str,
	) -> Result<Vec<ProductOrder>, ContractError> {
		let order_id = parse_id(order_id, "product order id")?;
		let history = self.store.order_history(&order_id).await?;
		tracing::debug!(
			order_id = %truncate_id(&order_id.to_string()),
			versions = history.len(),
			"Queried order history"
		);
		Ok(history)
	}
}

/// Roles allowed to move an order into `state`.
fn required_roles(state: OrderState) -> Result<&'static [Role], ContractError> {
	match state {
		OrderState::Accepted | OrderState::Manufactured => Ok(&[Role::Producer]),
		OrderState::Delivered => Ok(&[Role::Distributor]),
		OrderState::Rejected => Ok(&REJECTERS),
		OrderState::Ordered => Err(ContractError::UnknownStateAuthMapping(
			state.to_string(),
		)),
	}
}

/// Writes the new state and the fields that go with it.
///
/// Timestamps are set once; re-entering a state keeps the original stamp.
fn apply_transition(order: &mut ProductOrder, new_state: OrderState, rejecter: &str) {
	order.state = new_state;
	match new_state {
		OrderState::Manufactured => {
			order.manufactured_timestamp.get_or_insert_with(now);
		},
		OrderState::Delivered => {
			order.delivered_timestamp.get_or_insert_with(now);
		},
		OrderState::Rejected if !rejecter.is_empty() => {
			order.msp_id_of_rejecter = Some(rejecter.to_string());
		},
		_ => {},
	}
}

/// Checks a transition against the lifecycle adjacency.
fn is_valid_transition(from: OrderState, to: OrderState) -> bool {
	// Static transition table - each state maps to allowed next states
	static TRANSITIONS: Lazy<HashMap<OrderState, HashSet<OrderState>>> = Lazy::new(|| {
		let mut m = HashMap::new();
		m.insert(
			OrderState::Ordered,
			HashSet::from([OrderState::Accepted, OrderState::Rejected]),
		);
		m.insert(
			OrderState::Accepted,
			HashSet::from([OrderState::Manufactured, OrderState::Rejected]),
		);
		m.insert(
			OrderState::Manufactured,
			HashSet::from([OrderState::Delivered, OrderState::Rejected]),
		);
		for state in OrderState::ALL.into_iter().filter(OrderState::is_terminal) {
			m.insert(state, HashSet::new());
		}
		m
	});

	TRANSITIONS.get(&from).is_some_and(|set| set.contains(&to))
}
