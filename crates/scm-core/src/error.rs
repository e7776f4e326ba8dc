//! Failures surfaced to the invoker of a contract command.

use scm_access::{AuthError, IdentityError};
use scm_storage::StorageError;
use scm_types::{OrderState, PartAppendError};
use std::fmt;
use thiserror::Error;

/// Broad category of a [`ContractError`].
///
/// Hosts map these to their own status codes; none of them is retried by
/// the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// The caller does not act as the required role.
	Authentication,
	/// The invocation itself is malformed.
	Validation,
	/// The order or part order does not exist.
	NotFound,
	/// The request conflicts with the current order state.
	Conflict,
	/// The ledger failed to read or write.
	Storage,
}

impl ErrorKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			ErrorKind::Authentication => "AUTHENTICATION_FAILED",
			ErrorKind::Validation => "VALIDATION_ERROR",
			ErrorKind::NotFound => "NOT_FOUND",
			ErrorKind::Conflict => "CONFLICT",
			ErrorKind::Storage => "STORAGE_ERROR",
		}
	}
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Errors returned by contract operations.
#[derive(Debug, Error)]
pub enum ContractError {
	#[error("Authentication failed: expected '{expected}' but caller is '{actual}'")]
	AuthenticationFailed { expected: String, actual: String },
	#[error("Authentication failed for {0}")]
	NoRoleMatched(String),
	#[error("Identity unavailable: {0}")]
	IdentityUnavailable(String),
	#[error("Incorrect number of arguments for {function}: expected {expected}, got {actual}")]
	ArgumentCountMismatch {
		function: String,
		expected: usize,
		actual: usize,
	},
	#[error("Invalid contract function name: {0}")]
	UnknownFunction(String),
	#[error("Invalid {what}: '{value}'")]
	MalformedId { what: &'static str, value: String },
	#[error("Invalid product id: '{0}'")]
	InvalidProductId(String),
	#[error("Invalid product part id: '{0}'")]
	InvalidPartId(String),
	#[error("Invalid product order state: '{0}'")]
	InvalidState(String),
	#[error("Invalid product part order state: '{0}'")]
	InvalidPartState(String),
	#[error("Could not check authentication because of unknown state '{0}'")]
	UnknownStateAuthMapping(String),
	#[error("Invalid state transition from {from} to {to}")]
	InvalidTransition { from: OrderState, to: OrderState },
	#[error("Could not locate product order with id '{0}'")]
	OrderNotFound(String),
	#[error("Could not locate product part order with id '{0}'")]
	PartOrderNotFound(String),
	#[error("All product parts are already ordered")]
	AllPartsOrdered,
	#[error("Product part already ordered: '{0}'")]
	PartAlreadyOrdered(String),
	#[error("Storage error: {0}")]
	Storage(String),
}

impl ContractError {
	/// Category of this error.
	pub fn kind(&self) -> ErrorKind {
		match self {
			ContractError::AuthenticationFailed { .. }
			| ContractError::NoRoleMatched(_)
			| ContractError::IdentityUnavailable(_) => ErrorKind::Authentication,
			ContractError::ArgumentCountMismatch { .. }
			| ContractError::UnknownFunction(_)
			| ContractError::MalformedId { .. }
			| ContractError::InvalidProductId(_)
			| ContractError::InvalidPartId(_)
			| ContractError::InvalidState(_)
			| ContractError::InvalidPartState(_)
			| ContractError::UnknownStateAuthMapping(_)
			| ContractError::InvalidTransition { .. } => ErrorKind::Validation,
			ContractError::OrderNotFound(_) | ContractError::PartOrderNotFound(_) => {
				ErrorKind::NotFound
			},
			ContractError::AllPartsOrdered | ContractError::PartAlreadyOrdered(_) => {
				ErrorKind::Conflict
			},
			ContractError::Storage(_) => ErrorKind::Storage,
		}
	}
}

impl From<AuthError> for ContractError {
	fn from(err: AuthError) -> Self {
		match err {
			AuthError::Failed { expected, actual } => {
				ContractError::AuthenticationFailed { expected, actual }
			},
			AuthError::NoneMatched(action) => ContractError::NoRoleMatched(action),
		}
	}
}

impl From<IdentityError> for ContractError {
	fn from(err: IdentityError) -> Self {
		match err {
			IdentityError::Unavailable(reason) => ContractError::IdentityUnavailable(reason),
		}
	}
}

impl From<StorageError> for ContractError {
	fn from(err: StorageError) -> Self {
		ContractError::Storage(err.to_string())
	}
}

/// Converts a rejected append, naming the offending part.
pub(crate) fn append_error(err: PartAppendError, product_part_id: &uuid::Uuid) -> ContractError {
	match err {
		PartAppendError::AllPartsOrdered => ContractError::AllPartsOrdered,
		PartAppendError::PartAlreadyOrdered => {
			ContractError::PartAlreadyOrdered(product_part_id.to_string())
		},
	}
}
