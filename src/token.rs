use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    error::{AuthError, TokenError},
    types::Claims,
};

#[derive(Clone)]
pub struct TokenConfig {
    /// The issuer for identity tokens. Tokens naming any other issuer are rejected.
    pub issuer: String,
    /// The secret used to sign tokens.
    /// If the secret changes, every outstanding token stops verifying.
    pub secret: String,
}

/// Issues and verifies HS256 identity tokens. Stateless: nothing is recorded per token.
#[derive(Clone)]
pub struct TokenService {
    issuer: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenService {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            issuer: config.issuer.clone(),
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
        }
    }

    pub fn issue(&self, subject: &str, ttl: Duration) -> Result<String, AuthError> {
        self.issue_at(subject, ttl, SystemTime::now())
    }

    /// Sign a token for `subject` as if issued at `now`, expiring at `now + ttl`.
    pub fn issue_at(
        &self,
        subject: &str,
        ttl: Duration,
        now: SystemTime,
    ) -> Result<String, AuthError> {
        let iat = unix_seconds(now)?;

        let claims = Claims {
            sub: subject.to_owned(),
            iat,
            exp: iat.saturating_add(ttl.as_secs()),
            iss: self.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InternalCrypto(e.to_string()))
    }

    /// Check signature, issuer and expiry, returning the token's subject.
    ///
    /// A token is expired once the current second reaches its `exp`; there is no leeway.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);
        validation.leeway = 0;
        // jsonwebtoken accepts `exp == now`; expiry is checked below instead.
        validation.validate_exp = false;

        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| TokenError::Invalid)?;

        let now = unix_seconds(SystemTime::now()).map_err(|_| TokenError::Invalid)?;
        if data.claims.exp <= now {
            return Err(TokenError::Expired);
        }

        Ok(data.claims.sub)
    }
}

fn unix_seconds(time: SystemTime) -> Result<u64, AuthError> {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| AuthError::InternalCrypto(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> TokenService {
        TokenService::new(&TokenConfig {
            issuer: "job-board-tests".into(),
            secret: secret.into(),
        })
    }

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    #[test]
    fn issued_token_verifies_to_its_subject() {
        let tokens = service("secret");
        let token = tokens.issue("a@b.com", DAY).unwrap();

        assert_eq!(tokens.verify(&token).unwrap(), "a@b.com");
    }

    #[test]
    fn zero_ttl_is_already_expired() {
        let tokens = service("secret");
        let token = tokens.issue("a@b.com", Duration::ZERO).unwrap();

        assert_eq!(tokens.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn elapsed_token_is_expired() {
        let tokens = service("secret");
        let issued = SystemTime::now() - Duration::from_secs(2 * 60 * 60);
        let token = tokens
            .issue_at("a@b.com", Duration::from_secs(60 * 60), issued)
            .unwrap();

        assert_eq!(tokens.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn flipped_byte_is_invalid() {
        let tokens = service("secret");
        let token = tokens.issue("a@b.com", DAY).unwrap();

        for index in [0, token.len() / 2, token.len() - 5] {
            let mut bytes = token.clone().into_bytes();
            if bytes[index] == b'.' {
                continue;
            }
            bytes[index] = if bytes[index] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();

            assert_eq!(tokens.verify(&tampered), Err(TokenError::Invalid));
        }
    }

    #[test]
    fn other_secret_or_issuer_is_invalid() {
        let token = service("secret-a").issue("a@b.com", DAY).unwrap();
        assert_eq!(service("secret-b").verify(&token), Err(TokenError::Invalid));

        let foreign = TokenService::new(&TokenConfig {
            issuer: "someone-else".into(),
            secret: "secret-a".into(),
        })
        .issue("a@b.com", DAY)
        .unwrap();
        assert_eq!(service("secret-a").verify(&foreign), Err(TokenError::Invalid));
    }

    #[test]
    fn garbage_is_invalid() {
        let tokens = service("secret");

        assert_eq!(tokens.verify(""), Err(TokenError::Invalid));
        assert_eq!(tokens.verify("fake token"), Err(TokenError::Invalid));
    }
}
