//! Manage json web tokens.

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use serde::{Deserialize, Serialize};

use crate::account::Account;

pub const TOKEN_TYPE: &str = "Bearer";
const DEFAULT_AUDIENCE: &str = "accounts";

type Result<T> = std::result::Result<T, jsonwebtoken::errors::Error>;

/// Pieces of information asserted on a JWT.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Recipients that the JWT is intended for.
    pub aud: String,
    /// Expiration time, in seconds since epoch.
    pub exp: u64,
    /// Issued at, in seconds since epoch.
    pub iat: u64,
    /// Instance that issued the JWT.
    pub iss: String,
    /// Account ID.
    pub sub: String,
    pub email: String,
    pub account_type: String,
}

/// Signed credential handed out on login.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub token: String,
    pub token_type: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
}

/// Manage JWT tokens.
#[derive(Clone)]
pub struct TokenManager {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    expiration: u64,
}

impl TokenManager {
    /// Create a new [`TokenManager`] signing with an HMAC `secret`.
    pub fn new(issuer: &str, secret: &[u8], expiration: u64) -> Self {
        Self {
            algorithm: Algorithm::HS256,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.to_owned(),
            audience: DEFAULT_AUDIENCE.to_owned(),
            expiration,
        }
    }

    /// Set `audience` field on JWT.
    pub fn audience(mut self, audience: &str) -> Self {
        self.audience = audience.to_owned();
        self
    }

    /// Create a new token for `account`.
    pub fn create(&self, account: &Account) -> Result<Token> {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let claims = Claims {
            aud: self.audience.clone(),
            exp: now.saturating_add(self.expiration),
            iat: now,
            iss: self.issuer.clone(),
            sub: account.id.to_string(),
            email: account.email.clone(),
            account_type: account.account_type.to_string(),
        };

        let token =
            encode(&Header::new(self.algorithm), &claims, &self.encoding_key)?;

        Ok(Token {
            token,
            token_type: TOKEN_TYPE.to_owned(),
            expires_in: self.expiration,
        })
    }

    /// Decode and check a token.
    pub fn decode(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);

        Ok(decode::<Claims>(token, &self.decoding_key, &validation)?.claims)
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("expiration", &self.expiration)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::account::AccountType;

    fn account() -> Account {
        Account {
            id: 42,
            name: "Rachel".into(),
            email: "rachel@example.com".into(),
            password_hash: String::default(),
            account_type: AccountType::Organizer,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_create_and_decode() {
        let manager = TokenManager::new("accounts-test", b"secret", 60);
        let token = manager.create(&account()).unwrap();

        assert_eq!(token.token_type, TOKEN_TYPE);
        assert_eq!(token.expires_in, 60);

        let claims = manager.decode(&token.token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.email, "rachel@example.com");
        assert_eq!(claims.account_type, "ORGANIZER");
        assert_eq!(claims.iss, "accounts-test");
        assert_eq!(claims.aud, DEFAULT_AUDIENCE);
        assert_eq!(claims.exp, claims.iat + 60);
    }

    #[test]
    fn test_huge_expiration_saturates() {
        let manager = TokenManager::new("accounts-test", b"secret", u64::MAX);
        let token = manager.create(&account()).unwrap();

        assert_eq!(token.expires_in, u64::MAX);
        let claims = manager.decode(&token.token).unwrap();
        assert_eq!(claims.exp, u64::MAX);
    }

    #[test]
    fn test_reject_foreign_token() {
        let manager = TokenManager::new("accounts-test", b"secret", 60);
        let other = TokenManager::new("accounts-test", b"another secret", 60);

        let token = other.create(&account()).unwrap();
        assert!(manager.decode(&token.token).is_err());
        assert!(manager.decode("not.a.jwt").is_err());
    }

    #[test]
    fn test_reject_other_audience() {
        let manager = TokenManager::new("accounts-test", b"secret", 60);
        let other = manager.clone().audience("somewhere-else");

        let token = other.create(&account()).unwrap();
        assert!(manager.decode(&token.token).is_err());
        assert!(other.decode(&token.token).is_ok());
    }
}
