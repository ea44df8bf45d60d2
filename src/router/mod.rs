//! HTTP API.

pub mod accounts;
pub mod login;
pub mod metrics;
pub mod register;
pub mod status;

use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError};

use crate::error::ServerError;

/// JSON body checked with [`Validate`] before reaching the handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct Valid<T>(pub T);

impl<T, S> FromRequest<S> for Valid<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Valid(value))
    }
}

/// Reject values made only of whitespace.
pub fn validate_not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }

    Ok(())
}

/// In-memory state with cheap hashing, for handler tests.
#[cfg(test)]
pub(crate) fn state() -> crate::AppState {
    state_with(crate::config::AccessPolicy::Authenticated)
}

#[cfg(test)]
pub(crate) fn state_with(policy: crate::config::AccessPolicy) -> crate::AppState {
    use std::sync::Arc;

    use crate::account::{AccountService, MemoryAccountStore};
    use crate::config::Configuration;
    use crate::crypto::tests::fast_hasher;
    use crate::token::TokenManager;

    let mut config = Configuration::default();
    config.security.account_lookup = policy;

    let token = TokenManager::new(&config.name, b"test secret", config.token.expiration);

    crate::AppState {
        accounts: AccountService::new(
            Arc::new(MemoryAccountStore::new()),
            Arc::new(fast_hasher()),
            token.clone(),
        ),
        config: Arc::new(config),
        token,
        metrics: None,
    }
}
