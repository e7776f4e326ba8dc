//! Registry trait for self-registering implementations.
//!
//! Pluggable backends (currently ledger storage) expose a `Registry` struct
//! that ties the name used in configuration files to a factory function.

/// Base trait for implementation registries.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation,
	/// e.g. "memory" for `storage.implementations.memory`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Returns the factory that builds the implementation from its TOML table.
	fn factory() -> Self::Factory;
}
