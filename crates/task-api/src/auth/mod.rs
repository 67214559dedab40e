//! Credential lifecycle: token codec, typed claims, password hashing, revocation.

pub mod claims;
pub mod codec;
pub mod password;
pub mod revocation;

pub use claims::{AuthenticatedUser, BearerToken, Claims};
pub use codec::{CodecError, TokenCodec};
pub use revocation::{RevocationRegistry, RevocationService};
