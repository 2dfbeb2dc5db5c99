use chrono::{Duration, Local};
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{
    database::schema::{Id, User},
    error::{Error, HtmlError},
};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub email: String,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, email: String, ttl: Duration) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + ttl).timestamp();

        Self {
            user_id: id,
            email,
            iat,
            exp,
        }
    }

    pub fn is_expired(&self) -> bool {
        (self.exp - Local::now().timestamp()).is_negative()
    }
}

/// Issues and verifies HMAC-SHA256 signed session tokens.
#[derive(Clone)]
pub struct TokenSigner {
    key: Hmac<Sha256>,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self, Error> {
        let key: Hmac<Sha256> = Hmac::new_from_slice(secret)
            .map_err(|_| HtmlError::InternalServerError.new("Invalid signing key"))?;

        Ok(Self { key, ttl })
    }

    pub fn generate(&self, user: &User) -> Result<String, Error> {
        let claims = JwtSessionData::new(user.id, user.email.to_owned(), self.ttl);

        claims.sign_with_key(&self.key).map_err(|e| {
            log::error!("Failed to sign session token: {e}");
            HtmlError::InternalServerError.default()
        })
    }

    pub fn verify(&self, token: &str) -> Result<JwtSessionData, Error> {
        let session: JwtSessionData = token
            .verify_with_key(&self.key)
            .map_err(|_| HtmlError::Unauthorized.new("Invalid token."))?;

        if session.is_expired() {
            return Err(HtmlError::Unauthorized.new("Token has expired."));
        }
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 4,
            email: String::from("a@x.com"),
            name: String::from("A"),
            password: String::new(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
        }
    }

    #[test]
    fn issued_token_verifies() {
        let signer = TokenSigner::new(b"secret", Duration::hours(1)).unwrap();
        let token = signer.generate(&user()).unwrap();

        let session = signer.verify(&token).unwrap();
        assert_eq!(session.user_id, 4);
        assert_eq!(session.email, "a@x.com");
    }

    #[test]
    fn token_from_other_key_is_rejected() {
        let signer = TokenSigner::new(b"secret", Duration::hours(1)).unwrap();
        let other = TokenSigner::new(b"another", Duration::hours(1)).unwrap();
        let token = other.generate(&user()).unwrap();

        let err = signer.verify(&token).unwrap_err();
        assert_eq!(err.kind, HtmlError::Unauthorized);
    }

    #[test]
    fn expired_token_is_rejected() {
        let signer = TokenSigner::new(b"secret", Duration::hours(-1)).unwrap();
        let token = signer.generate(&user()).unwrap();

        assert!(signer.verify(&token).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let signer = TokenSigner::new(b"secret", Duration::hours(1)).unwrap();
        assert!(signer.verify("not.a.token").is_err());
    }
}
