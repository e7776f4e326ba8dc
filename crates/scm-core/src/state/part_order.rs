//! Part order state machine.
//!
//! Part orders live inside their parent order, so every change loads the
//! parent, mutates exactly one nested record and stores the parent again.

use super::{parse_id, OrderStore};
use crate::ContractError;
use scm_access::{caller_identity, AccessControl, IdentityProvider};
use scm_types::{now, truncate_id, PartOrderState, ProductPartOrder, Role};
use std::sync::Arc;

/// Manages the state of part orders nested in product orders.
pub struct PartOrderStateMachine {
	store: Arc<OrderStore>,
	access: Arc<AccessControl>,
}

impl PartOrderStateMachine {
	pub fn new(store: Arc<OrderStore>, access: Arc<AccessControl>) -> Self {
		Self { store, access }
	}

	/// Moves a part order to `new_state`.
	///
	/// The producer may put a part back to ORDERED; only the supplier marks
	/// it DELIVERED.
	pub async fn change_part_order_state(
		&self,
		caller: &dyn IdentityProvider,
		order_id: &str,
		part_order_id: &str,
		new_state: &str,
	) -> Result<ProductPartOrder, ContractError> {
		let new_state: PartOrderState = new_state
			.parse()
			.map_err(|_| ContractError::InvalidPartState(new_state.to_string()))?;

		let identity = caller_identity(caller)?;
		self.access.authenticate(required_role(new_state), &identity)?;

		let order_id = parse_id(order_id, "product order id")?;
		let part_order_id = parse_id(part_order_id, "product part order id")?;

		let order = self
			.store
			.update_order_with(&order_id, |order| {
				let part = order
					.part_order_mut(&part_order_id)
					.ok_or_else(|| ContractError::PartOrderNotFound(part_order_id.to_string()))?;
				part.state = new_state;
				if new_state == PartOrderState::Delivered {
					part.delivered_timestamp.get_or_insert_with(now);
				}
				Ok(())
			})
			.await?;

		let part = order
			.part_orders()
			.iter()
			.find(|part| part.order_id == part_order_id)
			.cloned()
			.ok_or_else(|| ContractError::PartOrderNotFound(part_order_id.to_string()))?;

		tracing::info!(
			order_id = %truncate_id(&order_id.to_string()),
			part_order_id = %truncate_id(&part_order_id.to_string()),
			state = %new_state,
			caller = %identity.msp_id,
			"Part order state changed"
		);
		Ok(part)
	}
}

fn required_role(state: PartOrderState) -> Role {
	match state {
		PartOrderState::Ordered => Role::Producer,
		PartOrderState::Delivered => Role::Supplier,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::*;
	use crate::ErrorKind;
	use scm_config::TransitionPolicy;
	use uuid::Uuid;

	async fn order_with_part(
		contract: &crate::ScmContract,
	) -> (scm_types::ProductOrder, ProductPartOrder) {
		let order = place(contract).await;
		let part = contract
			.orders()
			.request_part_order(&producer(), &order.key(), PART_A)
			.await
			.unwrap();
		(load(contract, &order).await, part)
	}

	#[tokio::test]
	async fn test_supplier_delivers_part() {
		let contract = contract(TransitionPolicy::Permissive);
		let (order, part) = order_with_part(&contract).await;

		let delivered = contract
			.part_orders()
			.change_part_order_state(
				&supplier(),
				&order.key(),
				&part.order_id.to_string(),
				"DELIVERED",
			)
			.await
			.unwrap();
		assert_eq!(delivered.state, PartOrderState::Delivered);
		assert!(delivered.delivered_timestamp.unwrap() >= part.ordered_timestamp);

		let stored = load(&contract, &order).await;
		assert_eq!(stored.part_orders(), &[delivered]);
		assert_eq!(stored.state, order.state);
	}

	#[tokio::test]
	async fn test_producer_reorders_part() {
		let contract = contract(TransitionPolicy::Permissive);
		let (order, part) = order_with_part(&contract).await;
		let part_id = part.order_id.to_string();

		let delivered = contract
			.part_orders()
			.change_part_order_state(&supplier(), &order.key(), &part_id, "DELIVERED")
			.await
			.unwrap();
		let reordered = contract
			.part_orders()
			.change_part_order_state(&producer(), &order.key(), &part_id, "ORDERED")
			.await
			.unwrap();
		assert_eq!(reordered.state, PartOrderState::Ordered);
		assert_eq!(reordered.delivered_timestamp, delivered.delivered_timestamp);
	}

	#[tokio::test]
	async fn test_wrong_role_leaves_part_unchanged() {
		let contract = contract(TransitionPolicy::Permissive);
		let (order, part) = order_with_part(&contract).await;
		let part_id = part.order_id.to_string();

		for caller in [producer(), distributor(), customer()] {
			let err = contract
				.part_orders()
				.change_part_order_state(&caller, &order.key(), &part_id, "DELIVERED")
				.await
				.unwrap_err();
			assert_eq!(err.kind(), ErrorKind::Authentication);
		}
		for caller in [supplier(), distributor(), customer()] {
			assert!(matches!(
				contract
					.part_orders()
					.change_part_order_state(&caller, &order.key(), &part_id, "ORDERED")
					.await,
				Err(ContractError::AuthenticationFailed { .. })
			));
		}

		assert_eq!(load(&contract, &order).await, order);
	}

	#[tokio::test]
	async fn test_part_state_validation() {
		let contract = contract(TransitionPolicy::Permissive);
		let (order, part) = order_with_part(&contract).await;
		let part_id = part.order_id.to_string();
		let machine = contract.part_orders();

		assert!(matches!(
			machine
				.change_part_order_state(&supplier(), &order.key(), &part_id, "ACCEPTED")
				.await,
			Err(ContractError::InvalidPartState(_))
		));
		assert!(matches!(
			machine
				.change_part_order_state(&supplier(), "x", &part_id, "DELIVERED")
				.await,
			Err(ContractError::MalformedId { .. })
		));
		assert!(matches!(
			machine
				.change_part_order_state(&supplier(), &order.key(), "y", "DELIVERED")
				.await,
			Err(ContractError::MalformedId { .. })
		));
	}

	#[tokio::test]
	async fn test_missing_order_and_part() {
		let contract = contract(TransitionPolicy::Permissive);
		let (order, part) = order_with_part(&contract).await;
		let machine = contract.part_orders();

		assert!(matches!(
			machine
				.change_part_order_state(
					&supplier(),
					&Uuid::from_u128(3).to_string(),
					&part.order_id.to_string(),
					"DELIVERED"
				)
				.await,
			Err(ContractError::OrderNotFound(_))
		));

		let err = machine
			.change_part_order_state(
				&supplier(),
				&order.key(),
				&Uuid::from_u128(4).to_string(),
				"DELIVERED",
			)
			.await
			.unwrap_err();
		assert!(matches!(err, ContractError::PartOrderNotFound(_)));
		assert_eq!(err.kind(), ErrorKind::NotFound);
		assert_eq!(load(&contract, &order).await, order);
	}
}
