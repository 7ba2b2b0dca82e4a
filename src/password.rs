use argon2::{Config, Variant};
use rand::{rngs::OsRng, RngCore};

use crate::{error::AuthError, types::HashedPassword};

const SALT_LEN: usize = 16;

/// Argon2id work factor. Parameters are encoded into every hash, so changing them
/// does not invalidate previously stored passwords.
#[derive(Debug, Clone, Copy)]
pub struct HashParams {
    /// Memory cost in KiB.
    pub mem_cost: u32,
    pub time_cost: u32,
    pub lanes: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            mem_cost: 19 * 1024,
            time_cost: 2,
            lanes: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordHasher {
    params: HashParams,
}

impl PasswordHasher {
    pub fn new(params: HashParams) -> Self {
        Self { params }
    }

    /// Salted one-way hash of `password`. Runs on the blocking pool.
    pub async fn hash(&self, password: &str) -> Result<HashedPassword, AuthError> {
        let password = password.to_owned();
        let params = self.params;

        tokio::task::spawn_blocking(move || {
            let mut salt = [0u8; SALT_LEN];
            OsRng.fill_bytes(&mut salt);

            let config = Config {
                variant: Variant::Argon2id,
                mem_cost: params.mem_cost,
                time_cost: params.time_cost,
                lanes: params.lanes,
                ..Config::default()
            };

            argon2::hash_encoded(password.as_bytes(), &salt, &config)
                .map(HashedPassword)
                .map_err(|e| AuthError::InternalCrypto(e.to_string()))
        })
        .await
        .map_err(|e| AuthError::InternalCrypto(e.to_string()))?
    }

    /// Whether `password` produces `hash`. A hash that cannot be decoded never matches.
    pub async fn verify(&self, password: &str, hash: &HashedPassword) -> bool {
        let password = password.to_owned();
        let hash = hash.0.clone();

        tokio::task::spawn_blocking(move || {
            argon2::verify_encoded(&hash, password.as_bytes()).unwrap_or(false)
        })
        .await
        .unwrap_or(false)
    }
}
