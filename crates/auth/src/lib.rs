//! `tenantdesk-auth`: identity primitives and the authorization policy engine.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod fields;
pub mod password;
pub mod permissions;
pub mod roles;
pub mod token;

pub use authorize::{Action, Decision, Denial, Target, authorize};
pub use claims::{Claims, JwtClaims, TokenValidationError, validate_claims};
pub use fields::{Field, FieldMask};
pub use password::{PasswordError, hash_password, verify_dummy, verify_password};
pub use permissions::Capability;
pub use roles::Role;
pub use token::{IssuedToken, TokenError, TokenService};
