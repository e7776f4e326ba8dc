//! Authentication gate.
//!
//! Maps each role to the credentials configured for it and checks callers
//! against them. A caller acts as a role only when both its MSP id and its
//! certificate issuer match the configured pair.

use scm_config::{OrganizationConfig, RolesConfig};
use scm_types::{CallerIdentity, Role};
use thiserror::Error;

/// Errors raised when a caller does not act as the required role.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
	#[error("Authentication failed: expected '{expected}' but caller is '{actual}'")]
	Failed { expected: String, actual: String },
	#[error("Authentication failed for {0}")]
	NoneMatched(String),
}

/// Role based access control over the configured organizations.
#[derive(Debug, Clone)]
pub struct AccessControl {
	roles: RolesConfig,
}

impl AccessControl {
	pub fn new(roles: RolesConfig) -> Self {
		Self { roles }
	}

	/// Returns the role whose credentials the caller presents, if any.
	///
	/// Configuration guarantees role credentials are distinct, so at most one
	/// role matches.
	pub fn resolve_role(&self, identity: &CallerIdentity) -> Option<Role> {
		Role::ALL
			.into_iter()
			.find(|role| matches(self.roles.organization(*role), identity))
	}

	/// Checks that the caller acts as `role`.
	pub fn authenticate(&self, role: Role, identity: &CallerIdentity) -> Result<(), AuthError> {
		let expected = self.roles.organization(role);
		if matches(expected, identity) {
			tracing::debug!(%role, caller = %identity, "Caller authenticated");
			return Ok(());
		}
		tracing::debug!(%role, caller = %identity, "Caller rejected");
		Err(AuthError::Failed {
			expected: expected.msp_id.clone(),
			actual: identity.msp_id.clone(),
		})
	}

	/// Checks that the caller acts as one of `roles` and returns that role.
	///
	/// The role is resolved once and tested for membership. On failure only
	/// `action` is reported, not which roles were tried.
	pub fn authenticate_any(
		&self,
		roles: &[Role],
		identity: &CallerIdentity,
		action: &str,
	) -> Result<Role, AuthError> {
		match self.resolve_role(identity) {
			Some(role) if roles.contains(&role) => {
				tracing::debug!(%role, caller = %identity, "Caller authenticated");
				Ok(role)
			},
			_ => {
				tracing::debug!(caller = %identity, action, "Caller matches none of the allowed roles");
				Err(AuthError::NoneMatched(action.to_string()))
			},
		}
	}
}

fn matches(expected: &OrganizationConfig, identity: &CallerIdentity) -> bool {
	expected.msp_id == identity.msp_id && expected.issuer_common_name == identity.issuer_common_name
}

#[cfg(test)]
mod tests {
	use super::*;

	fn access() -> AccessControl {
		AccessControl::new(RolesConfig::default())
	}

	fn producer() -> CallerIdentity {
		CallerIdentity::new("ProducerMSP", "ca.producer.scmn.com")
	}

	#[test]
	fn test_authenticate_matching_role() {
		assert!(access().authenticate(Role::Producer, &producer()).is_ok());
		assert!(access()
			.authenticate(
				Role::Customer,
				&CallerIdentity::new("CustomerMSP", "ca.customer.scmn.com")
			)
			.is_ok());
	}

	#[test]
	fn test_authenticate_wrong_role_reports_msp_ids() {
		let err = access()
			.authenticate(Role::Distributor, &producer())
			.unwrap_err();
		assert_eq!(
			err,
			AuthError::Failed {
				expected: "DistributorMSP".to_string(),
				actual: "ProducerMSP".to_string(),
			}
		);
	}

	#[test]
	fn test_issuer_must_match_too() {
		let forged = CallerIdentity::new("ProducerMSP", "ca.customer.scmn.com");
		assert!(access().authenticate(Role::Producer, &forged).is_err());
		assert_eq!(access().resolve_role(&forged), None);
	}

	#[test]
	fn test_resolve_role() {
		assert_eq!(access().resolve_role(&producer()), Some(Role::Producer));
		assert_eq!(
			access().resolve_role(&CallerIdentity::new("SupplierMSP", "ca.supplier.scmn.com")),
			Some(Role::Supplier)
		);
		assert_eq!(
			access().resolve_role(&CallerIdentity::new("OtherMSP", "ca.other.com")),
			None
		);
	}

	#[test]
	fn test_authenticate_any() {
		let allowed = [Role::Producer, Role::Supplier, Role::Distributor];

		assert_eq!(
			access().authenticate_any(&allowed, &producer(), "REJECTED"),
			Ok(Role::Producer)
		);

		let customer = CallerIdentity::new("CustomerMSP", "ca.customer.scmn.com");
		assert_eq!(
			access().authenticate_any(&allowed, &customer, "REJECTED"),
			Err(AuthError::NoneMatched("REJECTED".to_string()))
		);

		let stranger = CallerIdentity::new("OtherMSP", "ca.other.com");
		assert!(access()
			.authenticate_any(&allowed, &stranger, "REJECTED")
			.is_err());
	}

	#[test]
	fn test_custom_role_credentials() {
		let mut roles = RolesConfig::default();
		roles.producer.msp_id = "FactoryMSP".to_string();
		let access = AccessControl::new(roles);

		assert!(access.authenticate(Role::Producer, &producer()).is_err());
		assert!(access
			.authenticate(
				Role::Producer,
				&CallerIdentity::new("FactoryMSP", "ca.producer.scmn.com")
			)
			.is_ok());
	}
}
