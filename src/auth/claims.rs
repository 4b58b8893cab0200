use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo_types::Role;

/// JWT payload used for authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,        // user ID
    pub username: String, // username at issue time
    pub role: Role,       // USER or ADMIN
    pub iat: usize,       // issued at (unix timestamp)
    pub exp: usize,       // expires at (unix timestamp)
    pub iss: String,      // issuer
    pub aud: String,      // audience
}

/// Identity resolved from a verified token, handed to handlers explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

impl From<Claims> for Caller {
    fn from(c: Claims) -> Self {
        Self {
            id: c.sub,
            username: c.username,
            role: c.role,
        }
    }
}
