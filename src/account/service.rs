use std::sync::Arc;

use crate::account::{
    Account, AccountError, AccountStore, AccountType, NewAccount, Result,
    normalize_email,
};
use crate::crypto::{Password, PasswordHasher};
use crate::telemetry;
use crate::token::{Token, TokenManager};

/// Data required to register an account.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: Password,
    /// Free text, parsed into [`AccountType`].
    pub account_type: String,
}

/// Account manager.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    hasher: Arc<dyn PasswordHasher>,
    token: TokenManager,
}

impl AccountService {
    /// Create a new [`AccountService`].
    pub fn new(
        store: Arc<dyn AccountStore>,
        hasher: Arc<dyn PasswordHasher>,
        token: TokenManager,
    ) -> Self {
        Self {
            store,
            hasher,
            token,
        }
    }

    /// Register a new account.
    ///
    /// The email pre-check gives a clean error in the common case; the store
    /// rejects the duplicates that race past it.
    pub async fn register(&self, registration: Registration) -> Result<Account> {
        let email = normalize_email(&registration.email);

        if self.store.find_by_email(&email).await?.is_some() {
            tracing::debug!("registration rejected, email already in use");
            return Err(AccountError::DuplicateEmail);
        }

        let account_type: AccountType = registration.account_type.parse()?;
        let password_hash = self.hash(registration.password).await?;

        let account = self
            .store
            .save(NewAccount {
                name: registration.name.trim().to_owned(),
                email,
                password_hash,
                account_type,
                created_at: chrono::Utc::now(),
            })
            .await?;

        tracing::info!(account_id = account.id, %account_type, "account created");
        telemetry::record_account_created(account_type);

        Ok(account)
    }

    /// Find an account using its identifier.
    pub async fn find_by_id(&self, id: i64) -> Result<Account> {
        self.store.find_by_id(id).await?.ok_or(AccountError::NotFound)
    }

    /// Check credentials and issue a token.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn authenticate(
        &self,
        email: &str,
        password: Password,
    ) -> Result<Token> {
        let email = normalize_email(email);

        let Some(account) = self.store.find_by_email(&email).await? else {
            tracing::info!(reason = "unknown_email", "authentication failed");
            telemetry::record_authentication("unknown_email");
            return Err(AccountError::InvalidCredentials);
        };

        if !self.verify(password, account.password_hash.clone()).await? {
            tracing::info!(
                account_id = account.id,
                reason = "password_mismatch",
                "authentication failed"
            );
            telemetry::record_authentication("password_mismatch");
            return Err(AccountError::InvalidCredentials);
        }

        let token = self.token.create(&account)?;

        tracing::info!(account_id = account.id, "authentication successful");
        telemetry::record_authentication("success");

        Ok(token)
    }

    async fn hash(&self, password: Password) -> Result<String> {
        let hasher = Arc::clone(&self.hasher);
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(crate::crypto::CryptoError::from)??;

        Ok(hash)
    }

    async fn verify(&self, password: Password, hash: String) -> Result<bool> {
        let hasher = Arc::clone(&self.hasher);
        let matches =
            tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
                .await
                .map_err(crate::crypto::CryptoError::from)??;

        Ok(matches)
    }
}
