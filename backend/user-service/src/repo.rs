//! User storage
//!
//! `UserRepo` is the persistence seam; `InMemoryUserRepo` keeps records in
//! process, ordered by id for paging.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use error_types::ServiceError;
use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub mobile: String,
    pub pass_hash: String,
    pub nick_name: String,
    pub age: i64,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub mobile: String,
    pub pass_hash: String,
    pub nick_name: String,
    pub age: i64,
}

/// Partial update; `None` leaves the stored value alone.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub nick_name: Option<String>,
    pub age: Option<i64>,
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
pub trait UserRepo: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<UserRecord, RepoError>;

    async fn get(&self, id: i64) -> Result<UserRecord, RepoError>;

    async fn find_by_mobile(&self, mobile: &str) -> Result<UserRecord, RepoError>;

    async fn update(&self, id: i64, changes: UserChanges) -> Result<UserRecord, RepoError>;

    /// Remove and return the record.
    async fn delete(&self, id: i64) -> Result<UserRecord, RepoError>;

    /// Records in ascending id order, skipping `offset`.
    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<UserRecord>, RepoError>;
}

#[derive(Debug)]
pub struct InMemoryUserRepo {
    users: DashMap<i64, UserRecord>,
    by_mobile: DashMap<String, i64>,
    next_id: AtomicI64,
}

impl Default for InMemoryUserRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserRepo {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            by_mobile: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl UserRepo for InMemoryUserRepo {
    async fn create(&self, user: NewUser) -> Result<UserRecord, RepoError> {
        let slot = match self.by_mobile.entry(user.mobile.clone()) {
            Entry::Occupied(_) => return Err(RepoError::DuplicateMobile(user.mobile)),
            Entry::Vacant(slot) => slot,
        };

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = UserRecord {
            id,
            mobile: user.mobile,
            pass_hash: user.pass_hash,
            nick_name: user.nick_name,
            age: user.age,
        };
        self.users.insert(id, record.clone());
        slot.insert(id);

        tracing::debug!(user_id = id, "User created");
        Ok(record)
    }

    async fn get(&self, id: i64) -> Result<UserRecord, RepoError> {
        self.users
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(RepoError::NotFound)
    }

    async fn find_by_mobile(&self, mobile: &str) -> Result<UserRecord, RepoError> {
        let id = *self.by_mobile.get(mobile).ok_or(RepoError::NotFound)?;
        self.get(id).await
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<UserRecord, RepoError> {
        let mut entry = self.users.get_mut(&id).ok_or(RepoError::NotFound)?;
        let record = entry.value_mut();
        if let Some(nick_name) = changes.nick_name {
            record.nick_name = nick_name;
        }
        if let Some(age) = changes.age {
            record.age = age;
        }
        Ok(record.clone())
    }

    async fn delete(&self, id: i64) -> Result<UserRecord, RepoError> {
        let (_, record) = self.users.remove(&id).ok_or(RepoError::NotFound)?;
        self.by_mobile.remove(&record.mobile);

        tracing::debug!(user_id = id, "User deleted");
        Ok(record)
    }

    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<UserRecord>, RepoError> {
        let mut ids: Vec<i64> = self.users.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();

        Ok(ids
            .into_iter()
            .skip(offset)
            .filter_map(|id| self.users.get(&id).map(|entry| entry.value().clone()))
            .take(limit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(mobile: &str) -> NewUser {
        NewUser {
            mobile: mobile.to_string(),
            pass_hash: "hash".to_string(),
            nick_name: format!("user-{mobile}"),
            age: 20,
        }
    }

    async fn seeded(count: usize) -> InMemoryUserRepo {
        let repo = InMemoryUserRepo::new();
        for i in 0..count {
            repo.create(new_user(&format!("1380000{i:04}"))).await.unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn test_update_is_partial() {
        let repo = seeded(1).await;

        let updated = repo
            .update(
                1,
                UserChanges {
                    nick_name: None,
                    age: Some(41),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.age, 41);
        assert_eq!(updated.nick_name, "user-13800000000");
        assert_eq!(repo.get(1).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_delete_frees_mobile() {
        let repo = seeded(1).await;

        let removed = repo.delete(1).await.unwrap();
        assert!(matches!(repo.get(1).await, Err(RepoError::NotFound)));
        assert!(matches!(repo.delete(1).await, Err(RepoError::NotFound)));

        let again = repo.create(new_user(&removed.mobile)).await.unwrap();
        assert_eq!(again.id, 2);
    }

    #[tokio::test]
    async fn test_list_pages_in_id_order() {
        let repo = seeded(5).await;

        let ids = |users: Vec<UserRecord>| users.into_iter().map(|u| u.id).collect::<Vec<_>>();
        assert_eq!(ids(repo.list(0, 2).await.unwrap()), vec![1, 2]);
        assert_eq!(ids(repo.list(2, 2).await.unwrap()), vec![3, 4]);
        assert_eq!(ids(repo.list(4, 2).await.unwrap()), vec![5]);
        assert!(repo.list(10, 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_mobile() {
        let repo = seeded(1).await;
        let err = repo.create(new_user("13800000000")).await.unwrap_err();
        assert!(matches!(err, RepoError::DuplicateMobile(_)));
    }
}
