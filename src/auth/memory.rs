use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::repo::{StoreError, UserStore};
use crate::auth::repo_types::{NewUser, Role, User, UserChanges};

/// Process-local user store. Uniqueness is checked and applied under one
/// write lock, so it holds under concurrent registration.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_unique(
    users: &[User],
    skip: Option<Uuid>,
    username: Option<&str>,
    email: Option<&str>,
) -> Result<(), StoreError> {
    let is_other = |u: &&User| Some(u.id) != skip;
    if let Some(username) = username {
        if users.iter().filter(is_other).any(|u| u.username == username) {
            return Err(StoreError::UsernameTaken);
        }
    }
    if let Some(email) = email {
        if users.iter().filter(is_other).any(|u| u.email == email) {
            return Err(StoreError::EmailTaken);
        }
    }
    Ok(())
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        check_unique(&users, None, Some(&new.username), Some(&new.email))?;
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.users.read().await.clone())
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        let Some(idx) = users.iter().position(|u| u.id == id) else {
            return Ok(None);
        };
        check_unique(
            &users,
            Some(id),
            changes.username.as_deref(),
            changes.email.as_deref(),
        )?;

        let user = &mut users[idx];
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() != before)
    }

    async fn count_by_role(&self, role: Role) -> Result<i64, StoreError> {
        let users = self.users.read().await;
        Ok(users.iter().filter(|u| u.role == role).count() as i64)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn new_user(username: &str, email: &str, role: Role) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            password_hash: "hash".into(),
            role,
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_username_or_email() {
        let store = MemoryUserStore::new();
        store
            .insert(new_user("alice", "alice@x.com", Role::User))
            .await
            .expect("first insert");

        let err = store
            .insert(new_user("alice", "other@x.com", Role::User))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UsernameTaken));

        let err = store
            .insert(new_user("bob", "alice@x.com", Role::User))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::EmailTaken));

        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_duplicate_registrations_only_one_wins() {
        let store = Arc::new(MemoryUserStore::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .insert(new_user("racer", &format!("racer{i}@x.com"), Role::User))
                    .await
            }));
        }
        let mut ok = 0;
        for h in handles {
            if h.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
    }

    #[tokio::test]
    async fn update_ignores_own_values_but_not_others() {
        let store = MemoryUserStore::new();
        let alice = store
            .insert(new_user("alice", "alice@x.com", Role::User))
            .await
            .unwrap();
        store
            .insert(new_user("bob", "bob@x.com", Role::User))
            .await
            .unwrap();

        // Re-submitting the same username/email is not a conflict with itself.
        let same = UserChanges {
            username: Some("alice".into()),
            email: Some("alice@x.com".into()),
            password_hash: None,
        };
        let updated = store.update(alice.id, same).await.unwrap().unwrap();
        assert_eq!(updated.password_hash, "hash");

        let steal = UserChanges {
            email: Some("bob@x.com".into()),
            ..Default::default()
        };
        let err = store.update(alice.id, steal).await.unwrap_err();
        assert!(matches!(err, StoreError::EmailTaken));

        let missing = store
            .update(Uuid::new_v4(), UserChanges::default())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn delete_twice_reports_missing() {
        let store = MemoryUserStore::new();
        let user = store
            .insert(new_user("alice", "alice@x.com", Role::Admin))
            .await
            .unwrap();
        assert_eq!(store.count_by_role(Role::Admin).await.unwrap(), 1);

        assert!(store.delete(user.id).await.unwrap());
        assert!(!store.delete(user.id).await.unwrap());
        assert!(store.find_by_id(user.id).await.unwrap().is_none());
        assert_eq!(store.count_by_role(Role::Admin).await.unwrap(), 0);
    }
}
