//! `POST /api/invoke`: runs any contract function.

use super::{ApiError, InvokeRequest, InvokeResponse};
use scm_access::InvocationIdentity;
use scm_core::ScmContract;
use scm_types::truncate_id;

/// Invokes a contract function on behalf of the caller named in the request.
pub async fn process_invoke_request(
	request: InvokeRequest,
	identity: InvocationIdentity,
	contract: &ScmContract,
) -> Result<InvokeResponse, ApiError> {
	tracing::debug!(
		function = %request.function,
		args = request.args.len(),
		msp_id = identity.msp_id.as_deref().unwrap_or("-"),
		"Invocation received"
	);

	match contract
		.invoke(&request.function, &request.args, &identity)
		.await
	{
		Ok(payload) => Ok(InvokeResponse::from_payload(&payload)),
		Err(e) => {
			tracing::warn!(
				function = %request.function,
				order_id = %request.args.first().map(|id| truncate_id(id)).unwrap_or_default(),
				error = %e,
				"Invocation rejected"
			);
			Err(ApiError::from(e))
		},
	}
}
