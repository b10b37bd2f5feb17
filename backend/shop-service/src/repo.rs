//! Shop account storage

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use error_types::ServiceError;
use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    pub mobile: String,
    pub pass_hash: String,
    pub nick_name: String,
    pub age: i64,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub mobile: String,
    pub pass_hash: String,
    pub nick_name: String,
    pub age: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("record not found")]
    NotFound,

    #[error("mobile {0} is already registered")]
    DuplicateMobile(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<RepoError> for ServiceError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => ServiceError::not_found("record not found"),
            RepoError::DuplicateMobile(_) => ServiceError::invalid_params(err.to_string()),
            RepoError::Storage(_) => ServiceError::internal(err),
        }
    }
}

#[async_trait]
pub trait AccountRepo: Send + Sync {
    async fn create(&self, account: NewAccount) -> Result<Account, RepoError>;

    async fn get(&self, id: i64) -> Result<Account, RepoError>;

    async fn find_by_mobile(&self, mobile: &str) -> Result<Account, RepoError>;
}

/// Process-local store keyed by id, with a unique mobile index
#[derive(Debug)]
pub struct InMemoryAccountRepo {
    accounts: DashMap<i64, Account>,
    by_mobile: DashMap<String, i64>,
    next_id: AtomicI64,
}

impl Default for InMemoryAccountRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAccountRepo {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            by_mobile: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl AccountRepo for InMemoryAccountRepo {
    async fn create(&self, account: NewAccount) -> Result<Account, RepoError> {
        let slot = match self.by_mobile.entry(account.mobile.clone()) {
            Entry::Occupied(_) => return Err(RepoError::DuplicateMobile(account.mobile)),
            Entry::Vacant(slot) => slot,
        };

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stored = Account {
            id,
            mobile: account.mobile,
            pass_hash: account.pass_hash,
            nick_name: account.nick_name,
            age: account.age,
        };
        self.accounts.insert(id, stored.clone());
        slot.insert(id);

        tracing::debug!(user_id = id, "Account created");
        Ok(stored)
    }

    async fn get(&self, id: i64) -> Result<Account, RepoError> {
        self.accounts
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(RepoError::NotFound)
    }

    async fn find_by_mobile(&self, mobile: &str) -> Result<Account, RepoError> {
        let id = *self.by_mobile.get(mobile).ok_or(RepoError::NotFound)?;
        self.get(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use error_types::ErrorKind;

    fn new_account(mobile: &str) -> NewAccount {
        NewAccount {
            mobile: mobile.to_string(),
            pass_hash: "hash".to_string(),
            nick_name: "nick".to_string(),
            age: 30,
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let repo = InMemoryAccountRepo::new();
        let created = repo.create(new_account("13800138000")).await.unwrap();

        assert_eq!(created.id, 1);
        assert_eq!(repo.get(1).await.unwrap(), created);
        assert_eq!(repo.find_by_mobile("13800138000").await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_duplicate_mobile_is_invalid_params() {
        let repo = InMemoryAccountRepo::new();
        repo.create(new_account("13800138000")).await.unwrap();

        let err = repo.create(new_account("13800138000")).await.unwrap_err();
        assert!(matches!(err, RepoError::DuplicateMobile(_)));
        assert_eq!(ServiceError::from(err).kind(), ErrorKind::InvalidParams);
    }

    #[tokio::test]
    async fn test_missing_records() {
        let repo = InMemoryAccountRepo::new();
        assert!(matches!(repo.get(9).await, Err(RepoError::NotFound)));
        assert!(matches!(
            repo.find_by_mobile("13800138000").await,
            Err(RepoError::NotFound)
        ));
        assert_eq!(
            ServiceError::from(RepoError::NotFound).kind(),
            ErrorKind::NotFound
        );
    }
}
