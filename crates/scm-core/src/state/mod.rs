//! State management for product orders and their part orders.

pub mod order;
pub mod part_order;
pub mod store;

pub use order::OrderStateMachine;
pub use part_order::PartOrderStateMachine;
pub use store::OrderStore;

use crate::ContractError;
use uuid::Uuid;

/// Parses an identifier argument, naming it in the error.
pub(crate) fn parse_id(value: &str, what: &'static str) -> Result<Uuid, ContractError> {
	Uuid::parse_str(value).map_err(|_| ContractError::MalformedId {
		what,
		value: value.to_string(),
	})
}
