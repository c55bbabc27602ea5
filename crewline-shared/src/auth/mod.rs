//! Caller identity and invitation secrets
//!
//! # Modules
//!
//! - [`session`]: typed session context passed into engine operations
//! - [`token`]: invitation token generation and SHA-256 hashing
//!
//! Credential verification and password hashing happen outside this crate;
//! the engine only receives the results.

pub mod session;
pub mod token;

pub use session::SessionContext;
