//! Read-only order endpoints.
//!
//! Both queries are visible to every participant, so they need no identity
//! headers.

use super::ApiError;
use scm_access::InvocationIdentity;
use scm_core::ScmContract;
use serde_json::Value;

/// Lists every order on the ledger.
pub async fn list_orders(contract: &ScmContract) -> Result<Value, ApiError> {
	query(contract, "queryAllProductOrders", Vec::new()).await
}

/// Lists every stored version of one order, oldest first.
pub async fn order_history(contract: &ScmContract, order_id: String) -> Result<Value, ApiError> {
	query(contract, "queryProductOrderHistory", vec![order_id]).await
}

async fn query(contract: &ScmContract, function: &str, args: Vec<String>) -> Result<Value, ApiError> {
	let payload = contract
		.invoke(function, &args, &InvocationIdentity::default())
		.await
		.map_err(|e| {
			tracing::warn!(function, error = %e, "Query failed");
			ApiError::from(e)
		})?;

	serde_json::from_slice(&payload)
		.map_err(|e| ApiError::from(scm_core::ContractError::Storage(e.to_string())))
}
