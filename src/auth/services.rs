use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_dummy, verify_password},
        repo::UserStore,
        repo_types::{NewUser, Role, User},
    },
    error::AppError,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Checks the username field and returns it trimmed.
pub(crate) fn require_username(username: &str) -> Result<String, AppError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::BadRequest("Username is required".into()));
    }
    Ok(username.to_string())
}

/// Checks the email field and returns it normalised.
pub(crate) fn require_email(email: &str) -> Result<String, AppError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(AppError::BadRequest("Email is required".into()));
    }
    if !is_valid_email(&email) {
        return Err(AppError::BadRequest("Invalid email".into()));
    }
    Ok(email)
}

pub(crate) fn require_password(password: &str) -> Result<(), AppError> {
    if password.is_empty() {
        return Err(AppError::BadRequest("Password is required".into()));
    }
    Ok(())
}

/// Validates, hashes and stores a new account with `role`, then signs a token
/// for it. Duplicate username or email surfaces as a conflict from the store.
pub async fn register(
    store: &dyn UserStore,
    keys: &JwtKeys,
    req: RegisterRequest,
    role: Role,
) -> Result<(User, String), AppError> {
    let username = require_username(&req.username)?;
    let email = require_email(&req.email)?;
    require_password(&req.password)?;

    let password_hash = hash_password(&req.password)?;
    let user = store
        .insert(NewUser {
            username,
            email,
            password_hash,
            role,
        })
        .await
        .map_err(|e| {
            warn!(error = %e, "registration rejected by store");
            AppError::from(e)
        })?;

    let token = keys.sign(&user)?;
    info!(user_id = %user.id, username = %user.username, role = %user.role, "user registered");
    Ok((user, token))
}

/// Verifies credentials and signs a token for the account.
///
/// Unknown usernames and wrong passwords produce the same error.
pub async fn login(
    store: &dyn UserStore,
    keys: &JwtKeys,
    req: LoginRequest,
) -> Result<(User, String), AppError> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest(
            "Username and password are required".into(),
        ));
    }

    let invalid = || AppError::Unauthorized("Invalid credentials".into());

    let Some(user) = store.find_by_username(req.username.trim()).await? else {
        verify_dummy(&req.password);
        warn!(username = %req.username, "login unknown username");
        return Err(invalid());
    };

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    let token = keys.sign(&user)?;
    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok((user, token))
}
