//! Identity gate.

use scm_types::CallerIdentity;
use thiserror::Error;

/// Errors raised while looking up the caller's identity.
///
/// These are deterministic failures of the execution context, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
	#[error("Identity unavailable: {0}")]
	Unavailable(String),
}

/// Source of the invoking participant's identity.
///
/// The two lookups mirror what a ledger peer exposes: the MSP id of the
/// creator and the X.509 certificate it signed with.
pub trait IdentityProvider: Send + Sync {
	/// MSP identifier of the caller's organization.
	fn msp_id(&self) -> Result<String, IdentityError>;

	/// Common name of the issuer of the caller's certificate.
	fn issuer_common_name(&self) -> Result<String, IdentityError>;
}

/// Resolves the caller's identity, failing if either lookup fails.
pub fn caller_identity(provider: &dyn IdentityProvider) -> Result<CallerIdentity, IdentityError> {
	let msp_id = provider.msp_id()?;
	let issuer_common_name = provider.issuer_common_name()?;
	Ok(CallerIdentity {
		msp_id,
		issuer_common_name,
	})
}

/// A fixed identity that the host already verified.
impl IdentityProvider for CallerIdentity {
	fn msp_id(&self) -> Result<String, IdentityError> {
		Ok(self.msp_id.clone())
	}

	fn issuer_common_name(&self) -> Result<String, IdentityError> {
		Ok(self.issuer_common_name.clone())
	}
}

/// Identity values handed over by the host for a single invocation, such as
/// request headers or command-line flags. Either value may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationIdentity {
	pub msp_id: Option<String>,
	pub issuer_common_name: Option<String>,
}

impl InvocationIdentity {
	pub fn new(msp_id: Option<String>, issuer_common_name: Option<String>) -> Self {
		Self {
			msp_id,
			issuer_common_name,
		}
	}
}

fn required(value: &Option<String>, what: &str) -> Result<String, IdentityError> {
	match value.as_deref().map(str::trim) {
		Some(v) if !v.is_empty() => Ok(v.to_string()),
		_ => Err(IdentityError::Unavailable(format!("missing {}", what))),
	}
}

impl IdentityProvider for InvocationIdentity {
	fn msp_id(&self) -> Result<String, IdentityError> {
		required(&self.msp_id, "MSP id")
	}

	fn issuer_common_name(&self) -> Result<String, IdentityError> {
		required(&self.issuer_common_name, "certificate issuer")
	}
}
