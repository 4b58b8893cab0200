use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        password::hash_password,
        repo::UserStore,
        repo_types::{User, UserChanges},
        services::{require_email, require_password, require_username},
    },
    error::AppError,
    users::dto::UpdateUserRequest,
};

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("User {id} not found"))
}

/// Validates the supplied fields and turns them into store changes.
/// Nothing is hashed or written if any field is invalid.
fn into_changes(req: UpdateUserRequest) -> Result<UserChanges, AppError> {
    let username = req.username.as_deref().map(require_username).transpose()?;
    let email = req.email.as_deref().map(require_email).transpose()?;
    let password_hash = match req.password.as_deref() {
        Some(password) => {
            require_password(password)?;
            Some(hash_password(password)?)
        }
        None => None,
    };
    Ok(UserChanges {
        username,
        email,
        password_hash,
    })
}

pub async fn get_profile(store: &dyn UserStore, caller_id: Uuid) -> Result<User, AppError> {
    store
        .find_by_id(caller_id)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %caller_id, "token for a user that no longer exists");
            AppError::Unauthorized("User not found".into())
        })
}

/// Applies an update to `id`. Username/email uniqueness is checked by the
/// store against every other user.
pub async fn update_user(
    store: &dyn UserStore,
    id: Uuid,
    req: UpdateUserRequest,
) -> Result<User, AppError> {
    let changes = into_changes(req)?;
    let password_changed = changes.password_hash.is_some();
    let user = store
        .update(id, changes)
        .await
        .map_err(|e| {
            warn!(error = %e, user_id = %id, "update rejected by store");
            AppError::from(e)
        })?
        .ok_or_else(|| not_found(id))?;
    info!(user_id = %user.id, password_changed, "user updated");
    Ok(user)
}

pub async fn get_all_users(store: &dyn UserStore) -> Result<Vec<User>, AppError> {
    Ok(store.list().await?)
}

pub async fn get_user_by_id(store: &dyn UserStore, id: Uuid) -> Result<User, AppError> {
    store.find_by_id(id).await?.ok_or_else(|| not_found(id))
}

pub async fn delete_user(store: &dyn UserStore, id: Uuid) -> Result<(), AppError> {
    if !store.delete(id).await? {
        return Err(not_found(id));
    }
    info!(user_id = %id, "user deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        memory::MemoryUserStore,
        password::verify_password,
        repo_types::{NewUser, Role},
    };

    async fn seed(store: &MemoryUserStore, username: &str) -> User {
        store
            .insert(NewUser {
                username: username.into(),
                email: format!("{username}@x.com"),
                password_hash: hash_password("old-pw").unwrap(),
                role: Role::User,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn update_without_password_keeps_hash() {
        let store = MemoryUserStore::new();
        let alice = seed(&store, "alice").await;

        let updated = update_user(
            &store,
            alice.id,
            UpdateUserRequest {
                username: Some("alice2".into()),
                email: Some("Alice2@X.com".into()),
                password: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.username, "alice2");
        assert_eq!(updated.email, "alice2@x.com");
        assert_eq!(updated.password_hash, alice.password_hash);
        assert_eq!(updated.id, alice.id);
    }

    #[tokio::test]
    async fn update_with_password_rehashes() {
        let store = MemoryUserStore::new();
        let alice = seed(&store, "alice").await;

        let updated = update_user(
            &store,
            alice.id,
            UpdateUserRequest {
                password: Some("new-pw".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(verify_password("new-pw", &updated.password_hash).unwrap());
        assert!(!verify_password("old-pw", &updated.password_hash).unwrap());
    }

    #[tokio::test]
    async fn update_validates_and_detects_conflicts() {
        let store = MemoryUserStore::new();
        let alice = seed(&store, "alice").await;
        seed(&store, "bob").await;

        let err = update_user(
            &store,
            alice.id,
            UpdateUserRequest {
                email: Some("broken".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = update_user(
            &store,
            alice.id,
            UpdateUserRequest {
                username: Some("bob".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = update_user(&store, Uuid::new_v4(), UpdateUserRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_then_lookup_is_not_found() {
        let store = MemoryUserStore::new();
        let alice = seed(&store, "alice").await;

        delete_user(&store, alice.id).await.unwrap();
        assert!(matches!(
            delete_user(&store, alice.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            get_user_by_id(&store, alice.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            get_profile(&store, alice.id).await.unwrap_err(),
            AppError::Unauthorized(_)
        ));
        assert!(get_all_users(&store).await.unwrap().is_empty());
    }
}
