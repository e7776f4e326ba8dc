//! HTTP API handlers for the contract.
//!
//! Request and response shapes live here together with the mapping from
//! contract errors to HTTP status codes.

use axum::{
	http::{HeaderMap, StatusCode},
	response::{IntoResponse, Json, Response},
};
use scm_access::InvocationIdentity;
use scm_core::{ContractError, ErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod invoke;
pub mod orders;

/// Header carrying the caller's MSP id.
pub const MSP_ID_HEADER: &str = "x-msp-id";
/// Header carrying the common name of the caller's certificate issuer.
pub const ISSUER_CN_HEADER: &str = "x-issuer-cn";

/// Body of `POST /api/invoke`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InvokeRequest {
	/// Contract function name, e.g. `placeProductOrder`.
	pub function: String,
	/// Positional string arguments.
	#[serde(default)]
	pub args: Vec<String>,
}

/// Successful invocation result.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InvokeResponse {
	/// The command payload: JSON when the payload is JSON, a string
	/// otherwise, `null` when empty.
	pub payload: Value,
}

impl InvokeResponse {
	pub fn from_payload(payload: &[u8]) -> Self {
		let payload = if payload.is_empty() {
			Value::Null
		} else {
			serde_json::from_slice(payload)
				.unwrap_or_else(|_| Value::String(String::from_utf8_lossy(payload).into_owned()))
		};
		Self { payload }
	}
}

/// Error body returned by every endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
}

/// API error with its HTTP status.
#[derive(Debug)]
pub struct ApiError {
	pub status: StatusCode,
	pub body: ErrorResponse,
}

impl From<ContractError> for ApiError {
	fn from(err: ContractError) -> Self {
		let (status, code) = match (&err, err.kind()) {
			(ContractError::IdentityUnavailable(_), _) => {
				(StatusCode::UNAUTHORIZED, "IDENTITY_UNAVAILABLE")
			},
			(_, ErrorKind::Authentication) => (StatusCode::FORBIDDEN, ErrorKind::Authentication.as_str()),
			(_, ErrorKind::Validation) => (StatusCode::BAD_REQUEST, ErrorKind::Validation.as_str()),
			(_, ErrorKind::NotFound) => (StatusCode::NOT_FOUND, ErrorKind::NotFound.as_str()),
			(_, ErrorKind::Conflict) => (StatusCode::CONFLICT, ErrorKind::Conflict.as_str()),
			(_, ErrorKind::Storage) => {
				(StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Storage.as_str())
			},
		};

		Self {
			status,
			body: ErrorResponse {
				error: code.to_string(),
				message: err.to_string(),
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		(self.status, Json(self.body)).into_response()
	}
}

/// Reads the caller identity from the request headers. Missing or
/// non-UTF-8 headers are left empty for the identity gate to reject.
pub fn identity_from_headers(headers: &HeaderMap) -> InvocationIdentity {
	let header = |name: &str| {
		headers
			.get(name)
			.and_then(|value| value.to_str().ok())
			.map(str::to_string)
	};
	InvocationIdentity::new(header(MSP_ID_HEADER), header(ISSUER_CN_HEADER))
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::http::HeaderValue;

	#[test]
	fn test_payload_conversion() {
		assert_eq!(InvokeResponse::from_payload(b"").payload, Value::Null);
		assert_eq!(
			InvokeResponse::from_payload(b"[]").payload,
			Value::Array(vec![])
		);
		assert_eq!(
			InvokeResponse::from_payload(b"97fac27b-c25c-4e4e-951e-e22d216ef1e7").payload,
			Value::String("97fac27b-c25c-4e4e-951e-e22d216ef1e7".to_string())
		);
	}

	#[test]
	fn test_status_mapping() {
		let cases = [
			(
				ContractError::AuthenticationFailed {
					expected: "DistributorMSP".into(),
					actual: "ProducerMSP".into(),
				},
				StatusCode::FORBIDDEN,
			),
			(
				ContractError::IdentityUnavailable("missing MSP id".into()),
				StatusCode::UNAUTHORIZED,
			),
			(ContractError::InvalidState("BOGUS".into()), StatusCode::BAD_REQUEST),
			(ContractError::OrderNotFound("x".into()), StatusCode::NOT_FOUND),
			(ContractError::AllPartsOrdered, StatusCode::CONFLICT),
			(
				ContractError::Storage("disk full".into()),
				StatusCode::INTERNAL_SERVER_ERROR,
			),
		];

		for (err, status) in cases {
			assert_eq!(ApiError::from(err).status, status);
		}
	}

	#[test]
	fn test_identity_from_headers() {
		let mut headers = HeaderMap::new();
		headers.insert(MSP_ID_HEADER, HeaderValue::from_static("SupplierMSP"));
		let identity = identity_from_headers(&headers);
		assert_eq!(identity.msp_id.as_deref(), Some("SupplierMSP"));
		assert_eq!(identity.issuer_common_name, None);
	}
}
