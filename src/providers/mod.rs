//! Login strategies.
//!
//! Each provider owns its login routes and mints sessions through the shared
//! [`TokenService`]. [`AuthRoutes`](crate::AuthRoutes) mounts them under
//! `{auth_path}/{name}`.

mod confirm;
mod direct;
#[cfg(feature = "oauth")]
mod oauth;
mod traits;

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum::routing::get;
use axum::Router;
use axum_extra::extract::CookieJar;

use crate::token::{IssuedToken, TokenService};

pub use confirm::{ConfirmProvider, DEFAULT_TEMPLATE};
pub use direct::{DirectProvider, MAX_HTTP_BODY_SIZE};
#[cfg(feature = "oauth")]
pub use oauth::{BearerTokenHook, OAuthConfig, OAuthProvider, UserAttributes, UserData};
pub use traits::{CredChecker, CredCheckerFunc, Sender, SenderFunc, UserIdFunc};

/// A named login strategy.
pub trait Provider: Send + Sync + 'static {
    /// Path segment under the auth prefix. Must be unique per router.
    fn name(&self) -> &str;

    /// Routes relative to `{auth_path}/{name}`, state already applied.
    fn routes(self: Arc<Self>) -> Router;
}

/// `GET /logout` clearing both session cookies.
pub(crate) fn logout_router(tokens: Arc<TokenService>) -> Router {
    Router::new()
        .route("/logout", get(logout))
        .with_state(tokens)
}

async fn logout(State(tokens): State<Arc<TokenService>>) -> CookieJar {
    tokens.reset()
}

/// Respond to a completed login: redirect to `from` when given, otherwise
/// return the user as JSON. The session token travels with either.
fn session_response(issued: IssuedToken, from: Option<&str>) -> Response {
    match from.filter(|f| !f.is_empty()) {
        Some(from) => (issued, Redirect::temporary(from)).into_response(),
        None => {
            let user = issued.claims.user.clone();
            (issued, Json(user)).into_response()
        }
    }
}

/// Query flags use `"1"` for true.
fn flag(value: Option<&str>) -> bool {
    value == Some("1")
}
