//! Access control for the supply-chain order contract.
//!
//! Two gates sit in front of every state change:
//! - the identity gate ([`identity`]) asks the execution context who is
//!   calling, as an organization id plus certificate issuer name;
//! - the authentication gate ([`auth`]) decides whether that caller acts as
//!   the role a transition requires.
//!
//! Credential verification itself (signatures, MSP membership proofs) is the
//! host's job; this crate only consumes its result.

pub mod auth;
pub mod identity;

pub use auth::{AccessControl, AuthError};
pub use identity::{caller_identity, IdentityError, IdentityProvider, InvocationIdentity};
