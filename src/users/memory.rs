use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    repo::{StoreError, UserStore},
    repo_types::{UniqueField, User},
};

/// In-process user store. One lock covers the uniqueness check and the write.
#[derive(Default)]
pub struct MemoryUserStore {
    rows: Mutex<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }
}

fn conflict(rows: &HashMap<Uuid, User>, user: &User) -> Option<UniqueField> {
    rows.values().filter(|r| r.id != user.id).find_map(|r| {
        if r.email == user.email {
            Some(UniqueField::Email)
        } else if r.username == user.username {
            Some(UniqueField::Username)
        } else {
            None
        }
    })
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: &User) -> Result<User, StoreError> {
        let mut rows = self.rows.lock().await;
        if rows.contains_key(&user.id) {
            return Err(StoreError::DuplicateId(user.id));
        }
        if let Some(field) = conflict(&rows, user) {
            return Err(StoreError::Duplicate(field));
        }
        rows.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn update(&self, user: &User) -> Result<User, StoreError> {
        let mut rows = self.rows.lock().await;
        if !rows.contains_key(&user.id) {
            return Err(StoreError::NotFound);
        }
        if let Some(field) = conflict(&rows, user) {
            return Err(StoreError::Duplicate(field));
        }
        rows.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.rows.lock().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let rows = self.rows.lock().await;
        Ok(rows.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let rows = self.rows.lock().await;
        Ok(rows.values().find(|u| u.username == username).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::{
        dto::SignupRequest,
        pipeline::{self, Draft, SaveContext},
    };
    use time::OffsetDateTime;

    fn user(email: &str, username: &str) -> User {
        let req = SignupRequest {
            email: email.into(),
            username: username.into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            password: "Abcdef1!".into(),
            password_confirm: "Abcdef1!".into(),
            ..Default::default()
        };
        let ctx = SaveContext {
            now: OffsetDateTime::now_utc(),
            hash_cost: 4,
        };
        pipeline::run(Draft::create(req), &ctx).unwrap()
    }

    #[tokio::test]
    async fn reused_id_is_not_reported_as_a_field_conflict() {
        let store = MemoryUserStore::new();
        let first = user("jane@example.com", "jane_doe");
        store.insert(&first).await.unwrap();

        let mut clash = user("other@example.com", "other_user");
        clash.id = first.id;
        let err = store.insert(&clash).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(id) if id == first.id));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn same_email_is_a_field_conflict() {
        let store = MemoryUserStore::new();
        store.insert(&user("jane@example.com", "jane_doe")).await.unwrap();
        let err = store
            .insert(&user("jane@example.com", "someone_else"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(UniqueField::Email)));
    }
}
