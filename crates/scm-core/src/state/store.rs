//! Persistence of product orders on the ledger.

use crate::ContractError;
use scm_storage::LedgerService;
use scm_types::{truncate_id, ProductOrder};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Loads and stores product orders under their order id.
///
/// Mutations are read-modify-write cycles over a single key. They are
/// serialized within this process so two invocations never interleave
/// between the read and the write.
pub struct OrderStore {
	ledger: Arc<LedgerService>,
	write_guard: Mutex<()>,
}

impl OrderStore {
	pub fn new(ledger: Arc<LedgerService>) -> Self {
		Self {
			ledger,
			write_guard: Mutex::new(()),
		}
	}

	/// Gets an order by id.
	pub async fn get_order(&self, order_id: &Uuid) -> Result<ProductOrder, ContractError> {
		tracing::debug!(order_id = %truncate_id(&order_id.to_string()), "Loading order");
		self.ledger
			.retrieve(&order_id.to_string())
			.await?
			.ok_or_else(|| ContractError::OrderNotFound(order_id.to_string()))
	}

	/// Stores a new order.
	pub async fn insert_order(&self, order: &ProductOrder) -> Result<(), ContractError> {
		let _guard = self.write_guard.lock().await;
		self.ledger.store(&order.key(), order).await?;
		Ok(())
	}

	/// Updates an order with a closure and persists it.
	///
	/// Nothing is written when the order is missing or the closure fails, so
	/// a rejected update leaves the stored record untouched.
	pub async fn update_order_with<F>(
		&self,
		order_id: &Uuid,
		updater: F,
	) -> Result<ProductOrder, ContractError>
	where
		F: FnOnce(&mut ProductOrder) -> Result<(), ContractError>,
	{
		let _guard = self.write_guard.lock().await;

		let mut order = self.get_order(order_id).await?;
		updater(&mut order)?;

		self.ledger.store(&order.key(), &order).await?;
		Ok(order)
	}

	/// Every stored order in key order.
	pub async fn all_orders(&self) -> Result<Vec<ProductOrder>, ContractError> {
		Ok(self.ledger.scan("", "").await?)
	}

	/// Every stored version of an order, oldest first.
	pub async fn order_history(&self, order_id: &Uuid) -> Result<Vec<ProductOrder>, ContractError> {
		Ok(self.ledger.history(&order_id.to_string()).await?)
	}
}
