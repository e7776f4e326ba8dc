//! Common types module for the supply-chain order contract.
//!
//! This module defines the records persisted on the ledger, the closed state
//! enums of both state machines and the organizational roles that guard them.
//! Every other crate in the workspace builds on these types.

/// Organizational roles and caller identities.
pub mod identity;
/// Product orders, part orders and their lifecycle states.
pub mod order;
/// Registry trait for named backend implementations.
pub mod registry;
/// Small helpers shared across crates.
pub mod utils;
/// Configuration validation types for backend-specific TOML tables.
pub mod validation;

pub use identity::{CallerIdentity, Role};
pub use order::{
	OrderState, PartAppendError, PartOrderState, ProductOrder, ProductPartOrder,
	UnknownStateError,
};
pub use registry::ImplementationRegistry;
pub use utils::{now, truncate_id};
pub use validation::{ConfigSchema, Field, FieldType, Schema, ValidationError};
