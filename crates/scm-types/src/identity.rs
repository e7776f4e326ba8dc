//! Organizational roles and caller identities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Organizational role taking part in the supply chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	/// Delivers parts to the producer.
	Supplier,
	/// Accepts and manufactures product orders, orders parts.
	Producer,
	/// Delivers finished products to the customer.
	Distributor,
	/// Places product orders.
	Customer,
}

impl Role {
	pub const ALL: [Role; 4] = [
		Role::Supplier,
		Role::Producer,
		Role::Distributor,
		Role::Customer,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			Role::Supplier => "supplier",
			Role::Producer => "producer",
			Role::Distributor => "distributor",
			Role::Customer => "customer",
		}
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Identity asserted by the credential of the invoking participant.
///
/// Verification of the credential itself happens outside the contract; by
/// the time a `CallerIdentity` exists both values are trusted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallerIdentity {
	/// MSP (membership service provider) identifier of the caller's organization.
	pub msp_id: String,
	/// Common name of the certificate issuer.
	pub issuer_common_name: String,
}

impl CallerIdentity {
	pub fn new(msp_id: impl Into<String>, issuer_common_name: impl Into<String>) -> Self {
		Self {
			msp_id: msp_id.into(),
			issuer_common_name: issuer_common_name.into(),
		}
	}
}

impl fmt::Display for CallerIdentity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} ({})", self.msp_id, self.issuer_common_name)
	}
}
