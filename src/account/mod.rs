//! Accounts: entity, storage and business rules.

mod error;
mod memory;
mod repository;
mod service;

pub use error::*;
pub use memory::*;
pub use repository::*;
pub use service::*;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account as saved on database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub account_type: AccountType,
    pub created_at: DateTime<Utc>,
}

/// Account waiting for an identifier from the store.
#[derive(Clone, Debug, PartialEq)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub account_type: AccountType,
    pub created_at: DateTime<Utc>,
}

impl NewAccount {
    /// Attach the identifier assigned by the store.
    pub fn with_id(self, id: i64) -> Account {
        Account {
            id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            account_type: self.account_type,
            created_at: self.created_at,
        }
    }
}

/// Permission tier of an [`Account`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountType {
    Normal,
    Organizer,
}

impl AccountType {
    /// Canonical upper-case label, as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Normal => "NORMAL",
            AccountType::Organizer => "ORGANIZER",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = AccountError;

    /// Case-insensitive. `ORGANIZADOR` is kept as an alias of `ORGANIZER`
    /// for clients of the first API version.
    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_uppercase().as_str() {
            "NORMAL" => Ok(AccountType::Normal),
            "ORGANIZER" | "ORGANIZADOR" => Ok(AccountType::Organizer),
            _ => Err(AccountError::InvalidAccountType(value.to_owned())),
        }
    }
}

/// Canonical form used for lookups and storage.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
