//! In-process account store.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::account::{Account, AccountError, AccountStore, NewAccount, Result};

#[derive(Debug, Default)]
struct Accounts {
    last_id: i64,
    by_id: HashMap<i64, Account>,
    by_email: HashMap<String, i64>,
}

/// Account store kept in memory, lost on restart.
///
/// Used when no PostgreSQL instance is configured, and by tests.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<Accounts>,
}

impl MemoryAccountStore {
    /// Create an empty [`MemoryAccountStore`].
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> AccountError {
    AccountError::store(std::io::Error::other("account store lock poisoned"))
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Account>> {
        let accounts = self.accounts.read().map_err(poisoned)?;
        Ok(accounts.by_id.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let accounts = self.accounts.read().map_err(poisoned)?;
        Ok(accounts
            .by_email
            .get(email)
            .and_then(|id| accounts.by_id.get(id))
            .cloned())
    }

    async fn save(&self, account: NewAccount) -> Result<Account> {
        let mut accounts = self.accounts.write().map_err(poisoned)?;

        if accounts.by_email.contains_key(&account.email) {
            return Err(AccountError::DuplicateEmail);
        }

        accounts.last_id += 1;
        let account = account.with_id(accounts.last_id);

        accounts.by_email.insert(account.email.clone(), account.id);
        accounts.by_id.insert(account.id, account.clone());

        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::account::AccountType;

    fn new_account(email: &str) -> NewAccount {
        NewAccount {
            name: "José de Alencar".into(),
            email: email.into(),
            password_hash: "hash".into(),
            account_type: AccountType::Normal,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_assigns_ids() {
        let store = MemoryAccountStore::new();

        let first = store.save(new_account("a@example.com")).await.unwrap();
        let second = store.save(new_account("b@example.com")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(store.find_by_id(2).await.unwrap(), Some(second));
        assert_eq!(store.find_by_email("a@example.com").await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_missing_account() {
        let store = MemoryAccountStore::new();

        assert!(store.find_by_id(1).await.unwrap().is_none());
        assert!(store.find_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let store = MemoryAccountStore::new();

        store.save(new_account("same@example.com")).await.unwrap();
        let err = store.save(new_account("same@example.com")).await.unwrap_err();

        assert!(matches!(err, AccountError::DuplicateEmail));
        assert!(store.find_by_id(2).await.unwrap().is_none());
    }
}
