//! `guichet-auth` — identity, access policy, and credential boundaries.
//!
//! This crate is intentionally decoupled from HTTP and storage: the policy
//! engine takes in-memory values only, and the token/credential primitives
//! sit behind traits.

pub mod claims;
pub mod password;
pub mod policy;
pub mod token;

pub use claims::{Claim, JwtClaims};
pub use password::{Argon2CredentialHasher, CredentialHasher, PasswordError};
pub use policy::UserEditGrant;
pub use token::{Hs256TokenCodec, TokenCodec, TokenError};
