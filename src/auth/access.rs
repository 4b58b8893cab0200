//! Route-level access control.
//!
//! Every protected route is listed in [`ROUTE_POLICIES`]. The [`enforce`]
//! middleware looks the request up, resolves the caller from the bearer token,
//! and runs [`authorize`] before the handler is reached. Handlers then receive
//! the caller through the [`AuthUser`](super::extractors::AuthUser) extractor.

use axum::{
    extract::{FromRef, Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{claims::Caller, extractors::bearer_token, jwt::JwtKeys, repo_types::Role};
use crate::{error::AppError, state::AppState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// No token needed; any token sent is ignored.
    Public,
    Authenticated,
    AdminOnly,
    /// The caller must be an admin or the user named by the `:id` segment.
    SelfOrAdmin,
    /// Admin caller, unless admin sign-up is open (configured, or no admin
    /// exists yet).
    AdminRegistration,
}

/// Method, path template and policy. Literal routes precede `:id` routes that
/// could shadow them.
pub const ROUTE_POLICIES: &[(&str, &str, Policy)] = &[
    ("GET", "/health", Policy::Public),
    ("POST", "/auth/register", Policy::Public),
    ("POST", "/auth/register/admin", Policy::AdminRegistration),
    ("POST", "/auth/login", Policy::Public),
    ("GET", "/users/profile", Policy::Authenticated),
    ("PUT", "/users/profile", Policy::Authenticated),
    ("GET", "/users", Policy::AdminOnly),
    ("GET", "/users/:id", Policy::SelfOrAdmin),
    ("PUT", "/users/:id", Policy::AdminOnly),
    ("DELETE", "/users/:id", Policy::AdminOnly),
];

/// Matches `path` against a template, returning the `:param` segment if any.
fn match_template<'p>(template: &str, path: &'p str) -> Option<Option<&'p str>> {
    let mut tpl = template.trim_start_matches('/').split('/');
    let mut segs = path.trim_start_matches('/').split('/');
    let mut captured = None;
    loop {
        match (tpl.next(), segs.next()) {
            (None, None) => return Some(captured),
            (Some(t), Some(s)) if t.starts_with(':') && !s.is_empty() => captured = Some(s),
            (Some(t), Some(s)) if t == s => {}
            _ => return None,
        }
    }
}

/// Finds the policy for a request; `None` for routes outside the table.
pub fn lookup<'p>(method: &str, path: &'p str) -> Option<(Policy, Option<&'p str>)> {
    ROUTE_POLICIES
        .iter()
        .filter(|(m, _, _)| *m == method)
        .find_map(|(_, tpl, policy)| match_template(tpl, path).map(|id| (*policy, id)))
}

fn require_admin(caller: &Caller) -> Result<(), AppError> {
    match caller.role {
        Role::Admin => Ok(()),
        Role::User => Err(AppError::Forbidden("Admin role required".into())),
    }
}

/// Decides whether `caller` may proceed under `policy`.
///
/// `target` is the parsed `:id` segment. `admin_signup_open` only matters for
/// [`Policy::AdminRegistration`].
pub fn authorize(
    policy: Policy,
    caller: Option<&Caller>,
    target: Option<Uuid>,
    admin_signup_open: bool,
) -> Result<(), AppError> {
    match policy {
        Policy::Public => Ok(()),
        Policy::AdminRegistration => match caller {
            _ if admin_signup_open => Ok(()),
            Some(caller) => require_admin(caller),
            None => Err(AppError::Unauthorized(
                "Admin registration requires an admin token".into(),
            )),
        },
        Policy::Authenticated | Policy::AdminOnly | Policy::SelfOrAdmin => {
            let caller = caller
                .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;
            match policy {
                Policy::AdminOnly => require_admin(caller),
                Policy::SelfOrAdmin => match caller.role {
                    Role::Admin => Ok(()),
                    Role::User if target == Some(caller.id) => Ok(()),
                    Role::User => Err(AppError::Forbidden("Access denied".into())),
                },
                _ => Ok(()),
            }
        }
    }
}

fn resolve_caller(state: &AppState, req: &Request) -> Result<Option<Caller>, AppError> {
    let Some(token) = bearer_token(req.headers())? else {
        return Ok(None);
    };
    let claims = JwtKeys::from_ref(state).verify(token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        AppError::Unauthorized("Invalid or expired token".into())
    })?;
    Ok(Some(Caller::from(claims)))
}

/// Middleware enforcing [`ROUTE_POLICIES`] on every request.
pub async fn enforce(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let matched = lookup(req.method().as_str(), req.uri().path())
        .map(|(policy, id)| (policy, id.and_then(|s| Uuid::parse_str(s).ok())));
    let Some((policy, target)) = matched else {
        return Ok(next.run(req).await);
    };

    let caller = match policy {
        Policy::Public => None,
        // A stale token must not block sign-up while it is open; `authorize`
        // still demands an admin when it is not.
        Policy::AdminRegistration => resolve_caller(&state, &req).unwrap_or(None),
        _ => resolve_caller(&state, &req)?,
    };

    let admin_signup_open = match (policy, &caller) {
        (Policy::AdminRegistration, Some(Caller { role: Role::Admin, .. })) => false,
        (Policy::AdminRegistration, _) => {
            state.config.open_admin_registration
                || state.store.count_by_role(Role::Admin).await? == 0
        }
        _ => false,
    };

    if let Err(e) = authorize(policy, caller.as_ref(), target, admin_signup_open) {
        warn!(
            method = %req.method(),
            path = %req.uri().path(),
            caller = ?caller.as_ref().map(|c| c.id),
            reason = %e,
            "access denied"
        );
        return Err(e);
    }

    if let Some(caller) = caller {
        debug!(
            user_id = %caller.id,
            username = %caller.username,
            role = %caller.role,
            ?policy,
            "access granted"
        );
        req.extensions_mut().insert(caller);
    }
    Ok(next.run(req).await)
}
