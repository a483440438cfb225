//! Request authentication.
//!
//! Identity verification lives upstream; the bearer token arriving here is a
//! pre-verified uid from the identity provider. This layer resolves the uid
//! to a user record and attaches it to the request.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

use crate::db::{AppState, queries};
use crate::error::AppError;
use crate::models::User;
use crate::util::extract_bearer_token;

/// Authenticated caller, available to handlers via request extensions.
#[derive(Clone)]
pub struct AuthContext {
    pub user: User,
}

impl AuthContext {
    pub fn uid(&self) -> &str {
        &self.user.id
    }

    pub fn require_admin(&self) -> crate::error::Result<()> {
        if self.user.role.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin privileges required".into()))
        }
    }
}

/// Resolve the bearer uid to a user and stash it in request extensions.
/// Unknown uids get 401; the resolved user drives all authorization below.
pub async fn user_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let uid = match extract_bearer_token(req.headers()) {
        Some(uid) => uid.to_string(),
        None => return Err(StatusCode::UNAUTHORIZED),
    };

    let conn = state.db.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get database connection in auth middleware");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let user = queries::get_user_by_id(&conn, &uid).map_err(|e| {
        tracing::error!(error = %e, "user lookup failed in auth middleware");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    match user {
        Some(user) => {
            req.extensions_mut().insert(AuthContext { user });
            Ok(next.run(req).await)
        }
        None => Err(StatusCode::UNAUTHORIZED),
    }
}
