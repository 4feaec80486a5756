use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{FromRef, FromRequestParts, Path, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::{
    error::ApiError,
    models::UserSnapshot,
    ownership::{OwnershipResolver, PathIds},
    token::{self, TokenService},
};

/// AuthUser Extractor Result
///
/// The identity embedded in a verified credential. Nothing here is re-read from
/// storage: the claims are the source of truth for who the caller is, and ownership
/// is resolved separately per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub is_admin: bool,
}

impl From<UserSnapshot> for AuthUser {
    fn from(user: UserSnapshot) -> Self {
        Self {
            id: user.id,
            username: user.username,
            is_admin: user.is_admin,
        }
    }
}

impl From<&AuthUser> for UserSnapshot {
    fn from(user: &AuthUser) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_admin: user.is_admin,
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Reads the credential (cookie first, then Bearer), verifies it with the shared
/// [`TokenService`] and caches the result in the request extensions, so a guard
/// layer and the handler behind it verify only once.
///
/// Rejection: `ApiError::AuthenticationMissing` (401) on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenService: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let tokens = TokenService::from_ref(state);
        let raw = token::credential_from_headers(&parts.headers)
            .ok_or(ApiError::AuthenticationMissing)?;
        let claims = tokens.verify(&raw)?;

        let user = AuthUser::from(claims.user_data);
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

// --- Decisions ---

/// Admin-only policy.
pub fn check_admin(user: &AuthUser) -> Result<(), ApiError> {
    if user.is_admin {
        Ok(())
    } else {
        Err(ApiError::AuthorizationDenied)
    }
}

/// Owner-or-admin policy. `owner` is `None` when the resolver failed; no caller id
/// equals it, so only an administrator passes.
pub fn check_owner_or_admin(user: &AuthUser, owner: Option<i64>) -> Result<(), ApiError> {
    if user.is_admin || owner == Some(user.id) {
        Ok(())
    } else {
        Err(ApiError::AuthorizationDenied)
    }
}

// --- Middleware ---

/// require_authenticated
///
/// Gate for the authenticated router: the `AuthUser` extractor rejects with 401
/// before the handler runs.
pub async fn require_authenticated(_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// require_admin
///
/// 401 without a valid credential, 403 for a valid non-admin one.
pub async fn require_admin(
    user: AuthUser,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    check_admin(&user).inspect_err(|_| {
        warn!(user_id = user.id, uri = %request.uri(), "admin route denied");
    })?;
    Ok(next.run(request).await)
}

/// OwnerGuard
///
/// State of one owner-or-admin layer: the token service plus the resolver for the
/// resource kind the guarded routes address.
#[derive(Clone)]
pub struct OwnerGuard {
    pub tokens: TokenService,
    pub resolver: Arc<dyn OwnershipResolver>,
}

impl OwnerGuard {
    pub fn new(tokens: TokenService, resolver: Arc<dyn OwnershipResolver>) -> Self {
        Self { tokens, resolver }
    }
}

impl FromRef<OwnerGuard> for TokenService {
    fn from_ref(guard: &OwnerGuard) -> TokenService {
        guard.tokens.clone()
    }
}

/// require_owner_or_admin
///
/// Resolves the owner fresh from storage on every request. A resolver error is
/// logged and becomes "no owner", never a 500.
pub async fn require_owner_or_admin(
    State(guard): State<OwnerGuard>,
    user: AuthUser,
    Path(params): Path<HashMap<String, String>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let owner = match guard.resolver.resolve(&PathIds::new(params)).await {
        Ok(owner) => Some(owner),
        Err(e) => {
            debug!(user_id = user.id, error = %e, "owner unresolved");
            None
        }
    };

    check_owner_or_admin(&user, owner).inspect_err(|_| {
        warn!(
            user_id = user.id,
            owner = ?owner,
            uri = %request.uri(),
            "owner-or-admin route denied"
        );
    })?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, is_admin: bool) -> AuthUser {
        AuthUser {
            id,
            username: format!("user{id}"),
            is_admin,
        }
    }

    #[test]
    fn admin_policy_only_admits_admins() {
        assert!(check_admin(&user(1, true)).is_ok());
        assert!(matches!(
            check_admin(&user(2, false)),
            Err(ApiError::AuthorizationDenied)
        ));
    }

    #[test]
    fn owner_passes_and_stranger_is_denied() {
        assert!(check_owner_or_admin(&user(2, false), Some(2)).is_ok());
        assert!(matches!(
            check_owner_or_admin(&user(3, false), Some(2)),
            Err(ApiError::AuthorizationDenied)
        ));
    }

    #[test]
    fn admin_passes_regardless_of_owner() {
        assert!(check_owner_or_admin(&user(1, true), Some(2)).is_ok());
        assert!(check_owner_or_admin(&user(1, true), None).is_ok());
    }

    #[test]
    fn unresolved_owner_fails_closed() {
        assert!(check_owner_or_admin(&user(0, false), None).is_err());
        assert!(check_owner_or_admin(&user(2, false), None).is_err());
    }
}
