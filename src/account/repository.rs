//! Handle database requests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::account::{Account, AccountError, NewAccount, Result, ToStoreError};

/// Port for account persistence.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Find an account by its identifier.
    async fn find_by_id(&self, id: i64) -> Result<Option<Account>>;

    /// Find an account by its normalized email.
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Persist a new account and return it with its assigned identifier.
    ///
    /// Fails with [`AccountError::DuplicateEmail`] when the email is taken.
    async fn save(&self, account: NewAccount) -> Result<Account>;
}

/// Row of the `accounts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct AccountRecord {
    id: i64,
    name: String,
    email: String,
    password_hash: String,
    account_type: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AccountRecord> for Account {
    type Error = AccountError;

    fn try_from(record: AccountRecord) -> Result<Self> {
        // An unknown label means the table was written by something else.
        let account_type = record
            .account_type
            .parse()
            .map_err(|err: AccountError| AccountError::store(err))?;

        Ok(Account {
            id: record.id,
            name: record.name,
            email: record.email,
            password_hash: record.password_hash,
            account_type,
            created_at: record.created_at,
        })
    }
}

const SELECT_ACCOUNT: &str = r#"
    SELECT id, name, email, password_hash, account_type, created_at
    FROM accounts
"#;

/// PostgreSQL account store.
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    /// Create a new [`PgAccountStore`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Account>> {
        let record = sqlx::query_as::<_, AccountRecord>(&format!(
            "{SELECT_ACCOUNT} WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .catch()?;

        record.map(Account::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let record = sqlx::query_as::<_, AccountRecord>(&format!(
            "{SELECT_ACCOUNT} WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .catch()?;

        record.map(Account::try_from).transpose()
    }

    async fn save(&self, account: NewAccount) -> Result<Account> {
        let record = sqlx::query_as::<_, AccountRecord>(
            r#"
            INSERT INTO accounts (name, email, password_hash, account_type, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, password_hash, account_type, created_at
            "#,
        )
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.account_type.as_str())
        .bind(account.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match err.as_database_error() {
            Some(db) if db.is_unique_violation() => AccountError::DuplicateEmail,
            _ => AccountError::store(err),
        })?;

        Account::try_from(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountType;

    fn new_account(email: &str) -> NewAccount {
        NewAccount {
            name: "Dragão do Mar".into(),
            email: email.into(),
            password_hash: "$argon2id$v=19$m=1024,t=1,p=1$c2FsdA$aGFzaA".into(),
            account_type: AccountType::Normal,
            created_at: Utc::now(),
        }
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_save_and_find(pool: PgPool) {
        let store = PgAccountStore::new(pool);

        let saved = store.save(new_account("dragao@example.com")).await.unwrap();
        assert!(saved.id > 0);

        let by_id = store.find_by_id(saved.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "dragao@example.com");
        assert_eq!(by_id.account_type, AccountType::Normal);

        let by_email = store.find_by_email("dragao@example.com").await.unwrap();
        assert_eq!(by_email.map(|a| a.id), Some(saved.id));

        assert!(store.find_by_id(saved.id + 1).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_unique_email(pool: PgPool) {
        let store = PgAccountStore::new(pool);

        store.save(new_account("twice@example.com")).await.unwrap();
        let err = store.save(new_account("twice@example.com")).await.unwrap_err();
        assert!(matches!(err, AccountError::DuplicateEmail));
    }
}
