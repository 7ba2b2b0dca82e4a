use std::{sync::Arc, time::Duration};

use serde_json::Value;
use tokio::sync::OnceCell;

use crate::{
    error::{AuthError, TokenError},
    password::{HashParams, PasswordHasher},
    store::{Predicate, Record, Store, StoreError},
    token::{TokenConfig, TokenService},
    types::{Email, HashedPassword},
};

pub const USERS_TABLE: &str = "users";

/// Lifetime of tokens handed out by [`Auth::login`].
pub const LOGIN_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Clone)]
pub struct AuthConfig {
    pub token: TokenConfig,
    /// How long login tokens remain valid. After this interval, the client will have to re-login.
    pub token_lifetime: Duration,
    pub hash_params: HashParams,
}

impl AuthConfig {
    pub fn new(token: TokenConfig) -> Self {
        Self {
            token,
            token_lifetime: LOGIN_TOKEN_LIFETIME,
            hash_params: HashParams::default(),
        }
    }
}

/// Account operations plus the token verifier used by [`crate::with_identity`].
///
/// Holds no mutable state; share it behind an `Arc` across every request.
pub struct Auth {
    hasher: PasswordHasher,
    tokens: TokenService,
    token_lifetime: Duration,
    store: Arc<dyn Store>,
    /// Verified against when the email is unknown, so both login failures cost one hash.
    dummy_hash: OnceCell<HashedPassword>,
}

impl Auth {
    pub fn new(config: AuthConfig, store: Arc<dyn Store>) -> Self {
        Self {
            hasher: PasswordHasher::new(config.hash_params),
            tokens: TokenService::new(&config.token),
            token_lifetime: config.token_lifetime,
            store,
            dummy_hash: OnceCell::new(),
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn verify_token(&self, token: &str) -> Result<String, TokenError> {
        self.tokens.verify(token)
    }

    /// Register a new account. No token is issued; the client logs in separately.
    pub async fn signup(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<Email, AuthError> {
        let (email, password) = require_credentials(email, password)?;

        let hashed_password = self.hasher.hash(password).await?;

        let mut fields = Record::new();
        fields.insert("email".into(), Value::from(email.0.clone()));
        fields.insert("password".into(), Value::from(hashed_password.0));

        self.store
            .create(USERS_TABLE, fields)
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation { .. } => AuthError::DuplicateAccount,
                source => AuthError::Persistence { source },
            })?;

        tracing::info!(email = %email.0, "account created");

        Ok(email)
    }

    /// Check the credentials and issue an identity token for the account's email.
    pub async fn login(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<String, AuthError> {
        let (email, password) = require_credentials(email, password)?;

        let user = self
            .store
            .find_one(USERS_TABLE, &Predicate::eq("email", email.0.clone()))
            .await?;

        let Some(user) = user else {
            let dummy_hash = self
                .dummy_hash
                .get_or_try_init(|| self.hasher.hash("not a real password"))
                .await?;
            self.hasher.verify(password, dummy_hash).await;
            return Err(AuthError::AccountNotFound);
        };

        let hashed_password = user
            .get("password")
            .and_then(Value::as_str)
            .map(|hash| HashedPassword(hash.to_owned()))
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.hasher.verify(password, &hashed_password).await {
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(&email.0, self.token_lifetime)?;

        tracing::info!(email = %email.0, "login succeeded");

        Ok(token)
    }
}

fn require_credentials<'a>(
    email: Option<&'a str>,
    password: Option<&'a str>,
) -> Result<(Email, &'a str), AuthError> {
    let email = email
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or(AuthError::Validation("Please provide an email"))?;

    let password = password
        .filter(|p| !p.is_empty())
        .ok_or(AuthError::Validation("Please provide a password"))?;

    Ok((Email(email.to_owned()), password))
}
