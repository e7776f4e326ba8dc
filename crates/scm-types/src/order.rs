//! Order records and lifecycle states.
//!
//! A [`ProductOrder`] is the only entity with its own ledger key. Its part
//! orders live inside it and are reached exclusively through the parent, so
//! the parent is loaded, mutated and stored as one unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Returned when a string does not name a member of a state enum.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown state '{0}'")]
pub struct UnknownStateError(pub String);

/// Lifecycle state of a product order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
	/// Placed by a customer, not yet looked at by the producer.
	Ordered,
	/// Accepted by the producer.
	Accepted,
	/// Manufactured by the producer.
	Manufactured,
	/// Delivered by the distributor. Terminal.
	Delivered,
	/// Rejected by one of the supply-chain parties. Terminal.
	Rejected,
}

impl OrderState {
	/// All order states in lifecycle order.
	pub const ALL: [OrderState; 5] = [
		OrderState::Ordered,
		OrderState::Accepted,
		OrderState::Manufactured,
		OrderState::Delivered,
		OrderState::Rejected,
	];

	/// Returns the wire representation of the state.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderState::Ordered => "ORDERED",
			OrderState::Accepted => "ACCEPTED",
			OrderState::Manufactured => "MANUFACTURED",
			OrderState::Delivered => "DELIVERED",
			OrderState::Rejected => "REJECTED",
		}
	}

	/// Whether no further transition is expected out of this state.
	pub fn is_terminal(&self) -> bool {
		matches!(self, OrderState::Delivered | OrderState::Rejected)
	}
}

impl fmt::Display for OrderState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrderState {
	type Err = UnknownStateError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		OrderState::ALL
			.into_iter()
			.find(|state| state.as_str() == s)
			.ok_or_else(|| UnknownStateError(s.to_string()))
	}
}

/// Lifecycle state of a part order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartOrderState {
	/// Requested from the supplier by the producer.
	Ordered,
	/// Delivered to the producer by the supplier.
	Delivered,
}

impl PartOrderState {
	pub const ALL: [PartOrderState; 2] = [PartOrderState::Ordered, PartOrderState::Delivered];

	pub fn as_str(&self) -> &'static str {
		match self {
			PartOrderState::Ordered => "ORDERED",
			PartOrderState::Delivered => "DELIVERED",
		}
	}
}

impl fmt::Display for PartOrderState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for PartOrderState {
	type Err = UnknownStateError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		PartOrderState::ALL
			.into_iter()
			.find(|state| state.as_str() == s)
			.ok_or_else(|| UnknownStateError(s.to_string()))
	}
}

/// Sub-order for one component of the ordered product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPartOrder {
	/// Identifier of this part order.
	pub order_id: Uuid,
	/// Catalog identifier of the ordered part.
	pub product_part_id: Uuid,
	pub ordered_timestamp: DateTime<Utc>,
	#[serde(default, deserialize_with = "unset_timestamp")]
	pub delivered_timestamp: Option<DateTime<Utc>>,
	pub state: PartOrderState,
}

impl ProductPartOrder {
	/// Creates a fresh part order in state `ORDERED`.
	pub fn new(product_part_id: Uuid, ordered_at: DateTime<Utc>) -> Self {
		Self {
			order_id: Uuid::new_v4(),
			product_part_id,
			ordered_timestamp: ordered_at,
			delivered_timestamp: None,
			state: PartOrderState::Ordered,
		}
	}
}

/// Reasons a part order cannot be appended to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PartAppendError {
	#[error("all product parts are already ordered")]
	AllPartsOrdered,
	#[error("product part already ordered")]
	PartAlreadyOrdered,
}

/// Product order as persisted on the ledger.
///
/// Field order and names form the storage contract; changing either breaks
/// compatibility with records already on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductOrder {
	pub order_id: Uuid,
	pub product_id: Uuid,
	pub product_parts_total_count: usize,
	/// Part orders in arrival order. Only grows, through
	/// [`ProductOrder::append_part_order`].
	#[serde(default)]
	product_part_orders: Vec<ProductPartOrder>,
	pub ordered_timestamp: DateTime<Utc>,
	#[serde(default, deserialize_with = "unset_timestamp")]
	pub manufactured_timestamp: Option<DateTime<Utc>>,
	#[serde(default, deserialize_with = "unset_timestamp")]
	pub delivered_timestamp: Option<DateTime<Utc>>,
	pub state: OrderState,
	#[serde(default, deserialize_with = "unset_string")]
	pub msp_id_of_rejecter: Option<String>,
}

impl ProductOrder {
	/// Creates a new order in state `ORDERED` with no part orders.
	pub fn new(product_id: Uuid, product_parts_total_count: usize, ordered_at: DateTime<Utc>) -> Self {
		Self {
			order_id: Uuid::new_v4(),
			product_id,
			product_parts_total_count,
			product_part_orders: Vec::new(),
			ordered_timestamp: ordered_at,
			manufactured_timestamp: None,
			delivered_timestamp: None,
			state: OrderState::Ordered,
			msp_id_of_rejecter: None,
		}
	}

	/// Ledger key under which this order is stored.
	pub fn key(&self) -> String {
		self.order_id.to_string()
	}

	pub fn part_orders(&self) -> &[ProductPartOrder] {
		&self.product_part_orders
	}

	/// Whether every required part has been ordered.
	pub fn all_parts_ordered(&self) -> bool {
		self.product_part_orders.len() >= self.product_parts_total_count
	}

	/// Whether a part order for the given catalog part already exists.
	pub fn has_part(&self, product_part_id: &Uuid) -> bool {
		self.product_part_orders
			.iter()
			.any(|part| &part.product_part_id == product_part_id)
	}

	/// Appends a part order, keeping the count and uniqueness invariants.
	pub fn append_part_order(&mut self, part: ProductPartOrder) -> Result<(), PartAppendError> {
		if self.all_parts_ordered() {
			return Err(PartAppendError::AllPartsOrdered);
		}
		if self.has_part(&part.product_part_id) {
			return Err(PartAppendError::PartAlreadyOrdered);
		}
		self.product_part_orders.push(part);
		Ok(())
	}

	/// Looks up a nested part order by its own identifier.
	pub fn part_order_mut(&mut self, part_order_id: &Uuid) -> Option<&mut ProductPartOrder> {
		self.product_part_orders
			.iter_mut()
			.find(|part| &part.order_id == part_order_id)
	}
}

/// Seconds from the Unix epoch back to `0001-01-01T00:00:00Z`.
const ZERO_TIME_SECS: i64 = -62_135_596_800;

/// Reads an optional timestamp, treating the zero instant
/// `0001-01-01T00:00:00Z` as unset. Older records mark "not yet happened"
/// with it instead of `null`.
fn unset_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
	D: Deserializer<'de>,
{
	let value = Option::<DateTime<Utc>>::deserialize(deserializer)?;
	Ok(value.filter(|ts| ts.timestamp() != ZERO_TIME_SECS))
}

/// Reads an optional string, treating `""` as unset.
fn unset_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
	D: Deserializer<'de>,
{
	let value = Option::<String>::deserialize(deserializer)?;
	Ok(value.filter(|s| !s.is_empty()))
}
