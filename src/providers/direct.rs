use std::sync::Arc;

use axum::Router;
use axum::body::{self, Body};
use axum::extract::{Query, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Method};
use axum::response::Response;
use axum::routing::any;
use serde::Deserialize;

use super::traits::{CredChecker, CredCheckerDyn, UserIdFunc};
use super::{Provider, flag, logout_router, session_response};
use crate::ident::{random_token_id, user_id};
use crate::middleware::AuthError;
use crate::token::TokenService;
use crate::types::{Claims, User};

/// Largest accepted login body.
pub const MAX_HTTP_BODY_SIZE: usize = 1024 * 1024;

/// Username/password login checked by a [`CredChecker`].
///
/// Accepts `GET /login?user=&passwd=&aud=` or a `POST` with the same fields
/// as JSON or form data.
pub struct DirectProvider {
    name: String,
    tokens: Arc<TokenService>,
    checker: Option<Arc<dyn CredCheckerDyn>>,
    user_id_fn: Option<Arc<UserIdFunc>>,
}

impl DirectProvider {
    #[must_use]
    pub fn new(name: impl Into<String>, tokens: Arc<TokenService>) -> Self {
        Self {
            name: name.into(),
            tokens,
            checker: None,
            user_id_fn: None,
        }
    }

    #[must_use]
    pub fn with_checker(mut self, checker: impl CredChecker) -> Self {
        self.checker = Some(Arc::new(checker));
        self
    }

    /// Derive the hashed part of the user id from more than the login name,
    /// e.g. a tenant header.
    #[must_use]
    pub fn with_user_id_func(
        mut self,
        f: impl Fn(&str, &HeaderMap) -> String + Send + Sync + 'static,
    ) -> Self {
        self.user_id_fn = Some(Arc::new(f));
        self
    }
}

impl Provider for DirectProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn routes(self: Arc<Self>) -> Router {
        let tokens = self.tokens.clone();
        Router::new()
            .route("/login", any(login))
            .with_state(self)
            .merge(logout_router(tokens))
    }
}

#[derive(Debug, Default, Deserialize)]
struct Credentials {
    #[serde(default)]
    user: String,
    #[serde(default)]
    passwd: String,
    #[serde(default)]
    aud: String,
}

#[derive(Deserialize)]
struct SessionParams {
    sess: Option<String>,
}

async fn login(
    State(provider): State<Arc<DirectProvider>>,
    request: Request,
) -> Result<Response, AuthError> {
    let (parts, body) = request.into_parts();

    let creds = if parts.method == Method::GET {
        Query::<Credentials>::try_from_uri(&parts.uri)
            .map(|Query(c)| c)
            .map_err(|e| AuthError::MalformedRequest(format!("failed to parse credentials: {e}")))?
    } else if parts.method == Method::POST {
        read_credentials(&parts.headers, body).await?
    } else {
        return Err(AuthError::MalformedRequest(format!(
            "method {} not allowed",
            parts.method
        )));
    };

    let session_only = Query::<SessionParams>::try_from_uri(&parts.uri)
        .map(|Query(p)| flag(p.sess.as_deref()))
        .unwrap_or(false);

    let checker = provider
        .checker
        .as_ref()
        .ok_or_else(|| AuthError::Misconfiguration("no credential checker".into()))?;

    let ok = checker
        .check_dyn(&creds.user, &creds.passwd)
        .await
        .map_err(|e| AuthError::Internal(format!("failed to check user credentials: {e}")))?;

    if !ok {
        tracing::warn!(provider = %provider.name, user = %creds.user, "Incorrect credentials");
        return Err(AuthError::Rejected("incorrect user or password".into()));
    }

    let key = match &provider.user_id_fn {
        Some(f) => f(&creds.user, &parts.headers),
        None => creds.user.clone(),
    };

    let claims = Claims::for_user(
        User::new(creds.user.as_str(), user_id(&provider.name, &key)),
        random_token_id(),
        creds.aud,
    )
    .with_session_only(session_only);

    let issued = provider.tokens.set(claims)?;

    tracing::info!(provider = %provider.name, user = %creds.user, "Login successful");

    Ok(session_response(issued, None))
}

/// Read credentials from a JSON or form-encoded body.
async fn read_credentials(headers: &HeaderMap, body: Body) -> Result<Credentials, AuthError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .map(|v| v.to_str())
        .transpose()
        .map_err(|_| AuthError::MalformedRequest("malformed content type".into()))?
        .unwrap_or_default();

    let media_type = match content_type.trim() {
        "" => None,
        value => Some(
            value
                .parse::<mime::Mime>()
                .map_err(|e| AuthError::MalformedRequest(format!("malformed content type: {e}")))?,
        ),
    };

    let bytes = body::to_bytes(body, MAX_HTTP_BODY_SIZE)
        .await
        .map_err(|e| AuthError::MalformedRequest(format!("failed to read request body: {e}")))?;

    if media_type.is_some_and(|m| m.essence_str() == mime::APPLICATION_JSON.essence_str()) {
        return serde_json::from_slice(&bytes)
            .map_err(|e| AuthError::MalformedRequest(format!("failed to parse credentials: {e}")));
    }

    let mut creds = Credentials::default();
    for (key, value) in url::form_urlencoded::parse(&bytes) {
        match key.as_ref() {
            "user" => creds.user = value.into_owned(),
            "passwd" => creds.passwd = value.into_owned(),
            "aud" => creds.aud = value.into_owned(),
            _ => {}
        }
    }
    Ok(creds)
}
