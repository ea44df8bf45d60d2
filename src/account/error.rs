//! Account-level errors.

use crate::crypto::CryptoError;

pub type Result<T> = std::result::Result<T, AccountError>;

/// Errors returned by account operations.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("email is already registered")]
    DuplicateEmail,
    #[error("invalid account type {0:?}, expected NORMAL or ORGANIZER")]
    InvalidAccountType(String),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("account not found")]
    NotFound,

    #[error("account store unavailable")]
    StoreUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error(transparent)]
    Hashing(#[from] CryptoError),
    #[error("token signing failed")]
    Token(#[from] jsonwebtoken::errors::Error),
}

impl AccountError {
    pub fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::StoreUnavailable(Box::new(err))
    }
}

pub trait ToStoreError<T> {
    fn catch(self) -> Result<T>;
}

impl<T, E> ToStoreError<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn catch(self) -> Result<T> {
        self.map_err(AccountError::store)
    }
}
