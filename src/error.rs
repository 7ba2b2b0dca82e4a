use warp::reject::Reject;

use crate::store::StoreError;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed or its signature does not match")]
    Invalid,
    #[error("token has expired")]
    Expired,
}

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("an account with that email already exists")]
    DuplicateAccount,
    #[error("no account with that email")]
    AccountNotFound,
    #[error("password does not match")]
    InvalidCredentials,
    #[error("authentication required")]
    Unauthenticated,
    #[error("password hashing or token signing failed: {0}")]
    InternalCrypto(String),
    #[error("error during database operation")]
    Persistence {
        #[from]
        source: StoreError,
    },
}

impl Reject for AuthError {}

#[derive(thiserror::Error, Debug)]
pub enum ResourceError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("error during database operation")]
    Persistence {
        #[from]
        source: StoreError,
    },
}

impl Reject for ResourceError {}
