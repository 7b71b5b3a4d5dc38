use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{SignupRequest, UpdateUserRequest},
    error::UserError,
    pipeline::{self, Draft, SaveContext},
    repo::UserStore,
    repo_types::{UniqueField, User},
};

/// Create/update entry points: stage a draft, run the pre-save pipeline, persist.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    hash_cost: u32,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, hash_cost: u32) -> Self {
        Self { store, hash_cost }
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    pub async fn create(&self, req: SignupRequest) -> Result<User, UserError> {
        // Skip the hash for obvious duplicates; the store still decides races.
        let email = req.email.trim().to_lowercase();
        if !email.is_empty() && self.store.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(UserError::UniquenessViolation(UniqueField::Email));
        }
        let username = req.username.trim();
        if !username.is_empty() && self.store.find_by_username(username).await?.is_some() {
            warn!(username = %username, "username already taken");
            return Err(UserError::UniquenessViolation(UniqueField::Username));
        }

        let prepared = self.prepare(Draft::create(req)).await?;
        let user = self.store.insert(&prepared).await.map_err(|e| {
            warn!(error = %e, email = %prepared.email, "user insert rejected");
            UserError::from(e)
        })?;
        info!(user_id = %user.id, username = %user.username, "user created");
        Ok(user)
    }

    pub async fn update(&self, id: Uuid, patch: UpdateUserRequest) -> Result<User, UserError> {
        let current = self.store.find_by_id(id).await?.ok_or(UserError::NotFound)?;
        let mut draft = Draft::update(current);
        draft.apply(patch);
        let password_changed = draft.is_password_modified();

        let prepared = self.prepare(draft).await?;
        let user = self.store.update(&prepared).await.map_err(|e| {
            warn!(error = %e, user_id = %id, "user update rejected");
            UserError::from(e)
        })?;
        info!(user_id = %user.id, password_changed, "user updated");
        Ok(user)
    }

    pub async fn get(&self, id: Uuid) -> Result<User, UserError> {
        self.store.find_by_id(id).await?.ok_or(UserError::NotFound)
    }

    /// Runs the pipeline on the blocking pool; bcrypt at cost 12 takes long
    /// enough to stall a runtime worker.
    async fn prepare(&self, draft: Draft) -> Result<User, UserError> {
        let ctx = SaveContext {
            now: OffsetDateTime::now_utc(),
            hash_cost: self.hash_cost,
        };
        tokio::task::spawn_blocking(move || pipeline::run(draft, &ctx))
            .await
            .map_err(|e| UserError::Internal(format!("pipeline task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::memory::MemoryUserStore;

    fn service() -> (UserService, Arc<MemoryUserStore>) {
        let store = Arc::new(MemoryUserStore::new());
        (UserService::new(store.clone(), 4), store)
    }

    fn signup(email: &str, username: &str) -> SignupRequest {
        SignupRequest {
            email: email.into(),
            username: username.into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            password: "Abcdef1!".into(),
            password_confirm: "Abcdef1!".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_persists_hashed_record() {
        let (svc, store) = service();
        let user = svc.create(signup("jane@example.com", "jane_doe")).await.unwrap();

        let stored = store.find_by_id(user.id).await.unwrap().expect("row stored");
        assert_ne!(stored.password_hash, "Abcdef1!");
        assert!(stored.compare_password("Abcdef1!").unwrap());
        assert_eq!(stored.roles, vec!["user".to_string()]);
        assert!(stored.password_changed_at.is_none());
    }

    #[tokio::test]
    async fn concurrent_signups_with_same_email_yield_one_winner() {
        let (svc, store) = service();
        let a = svc.clone();
        let b = svc.clone();
        let (ra, rb) = tokio::join!(
            tokio::spawn(async move { a.create(signup("dup@example.com", "first_user")).await }),
            tokio::spawn(async move { b.create(signup("DUP@example.com", "second_user")).await }),
        );
        let results = [ra.unwrap(), rb.unwrap()];

        let ok = results.iter().filter(|r| r.is_ok()).count();
        let dup = results
            .iter()
            .filter(|r| matches!(r, Err(UserError::UniquenessViolation(UniqueField::Email))))
            .count();
        assert_eq!((ok, dup), (1, 1));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn duplicate_username_is_reported() {
        let (svc, _) = service();
        svc.create(signup("a@example.com", "same_name")).await.unwrap();
        let err = svc.create(signup("b@example.com", "same_name")).await.unwrap_err();
        assert!(matches!(err, UserError::UniquenessViolation(UniqueField::Username)));
    }

    #[tokio::test]
    async fn updating_first_name_keeps_password_changed_at() {
        let (svc, _) = service();
        let user = svc.create(signup("jane@example.com", "jane_doe")).await.unwrap();

        let updated = svc
            .update(
                user.id,
                UpdateUserRequest {
                    first_name: Some("Janet".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.first_name, "Janet");
        assert_eq!(updated.password_changed_at, user.password_changed_at);
        assert_eq!(updated.password_hash, user.password_hash);
    }

    #[tokio::test]
    async fn updating_password_sets_password_changed_at() {
        let (svc, _) = service();
        let user = svc.create(signup("jane@example.com", "jane_doe")).await.unwrap();

        let updated = svc
            .update(
                user.id,
                UpdateUserRequest {
                    password: Some("N3wPass!word".into()),
                    password_confirm: Some("N3wPass!word".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let changed_at = updated.password_changed_at.expect("stamped");
        assert!(changed_at > user.created_at);
        assert!(updated.compare_password("N3wPass!word").unwrap());
    }

    #[tokio::test]
    async fn failed_validation_persists_nothing() {
        let (svc, store) = service();
        let mut req = signup("jane@example.com", "jane_doe");
        req.password_confirm = "nope".into();
        let err = svc.create(req).await.unwrap_err();
        assert!(matches!(err, UserError::Validation(_)));
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn overlong_password_is_rejected_before_hashing() {
        let (svc, store) = service();
        let long = format!("Abcdef1!{}", "x".repeat(80));
        let mut req = signup("jane@example.com", "jane_doe");
        req.password = long.clone();
        req.password_confirm = long;
        let err = svc.create(req).await.unwrap_err();
        match err {
            UserError::Validation(errs) => assert!(errs.for_field("password").is_some()),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn update_of_unknown_user_is_not_found() {
        let (svc, _) = service();
        let err = svc
            .update(Uuid::new_v4(), UpdateUserRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::NotFound));
    }
}
