use serde::{Deserialize, Serialize};

/// Account identifier. Unique across the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[repr(transparent)]
pub struct Email(pub String);

/// Encoded argon2 hash, salt and parameters included. Never compare these by equality.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[repr(transparent)]
pub struct HashedPassword(pub String);

/// The verified subject of the token presented with the current request.
///
/// Only [`crate::with_identity`] constructs one of these for a live request, after the
/// token's signature and expiry have been checked.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[repr(transparent)]
pub struct RequestIdentity(pub String);

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct Claims {
    pub(crate) sub: String,
    pub(crate) iat: u64,
    pub(crate) exp: u64,
    pub(crate) iss: String,
}
