use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;

use super::error::AuthError;
use crate::token::TokenService;
use crate::types::{Claims, User};

/// Authenticated user extracted from the session token.
///
/// Looks at the token header, the token cookie (with the XSRF header check)
/// and the token query parameter. Returns `401 Unauthorized` when no valid,
/// unexpired user token is present.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected(user: AuthUser) -> impl IntoResponse {
///     format!("Hello, {} ({})", user.name(), user.id())
/// }
///
/// // Optional: accessible to both authenticated and anonymous users
/// async fn public(user: Option<AuthUser>) -> impl IntoResponse {
///     match user {
///         Some(u) => format!("Hello, {}", u.name()),
///         None => "Hello, guest".to_string(),
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub claims: Claims,
    pub token: String,
    user: User,
}

impl AuthUser {
    #[must_use]
    pub fn user(&self) -> &User {
        &self.user
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.user.name
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.user.id
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    Arc<TokenService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = Arc::<TokenService>::from_ref(state);

        let (claims, token) = tokens.get(&parts.headers, &parts.uri).map_err(|e| {
            tracing::debug!(error = %e, "Request not authenticated");
            AuthError::Unauthenticated
        })?;

        let user = claims.user.clone().ok_or(AuthError::Unauthenticated)?;

        Ok(Self {
            claims,
            token,
            user,
        })
    }
}

impl<S> OptionalFromRequestParts<S> for AuthUser
where
    Arc<TokenService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Option<Self>, Self::Rejection> {
        Ok(<Self as FromRequestParts<S>>::from_request_parts(parts, state)
            .await
            .ok())
    }
}
