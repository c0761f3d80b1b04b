use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum_extra::extract::CookieJar;
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{AuthUrl, ClientId, CsrfToken, RedirectUrl, Scope, TokenResponse};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use time::{Duration, OffsetDateTime};
use url::Url;

use super::{Provider, logout_router, session_response};
use crate::error::Error;
use crate::ident::{random_token_id, user_id};
use crate::middleware::AuthError;
use crate::token::TokenService;
use crate::types::{Claims, Handshake, User};

/// Raw JSON object returned by the provider's userinfo endpoint.
pub type UserData = serde_json::Map<String, serde_json::Value>;

/// Maps a userinfo attribute name to the key it gets in [`User::attrs`].
pub type UserAttributes = HashMap<String, String>;

/// Receives the provider name, the mapped user and the provider's token
/// after a successful callback, e.g. to keep the access token for later API
/// calls.
pub type BearerTokenHook = dyn Fn(&str, &User, &BasicTokenResponse) + Send + Sync;

const HANDSHAKE_TTL: Duration = Duration::minutes(30);
const NOT_BEFORE_SKEW: Duration = Duration::minutes(1);

/// OAuth2 provider endpoints and client credentials.
///
/// Required fields are constructor parameters.
///
/// ```rust,ignore
/// let config = OAuthConfig::new(
///     "client-id",
///     "client-secret",
///     "https://github.com/login/oauth/authorize".parse()?,
///     "https://github.com/login/oauth/access_token".parse()?,
///     "https://api.github.com/user".parse()?,
///     "https://my-app.com/auth/github/callback".parse()?,
/// )
/// .with_scopes(vec!["read:user".into()]);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct OAuthConfig {
    pub(crate) client_id: String,
    pub(crate) client_secret: SecretString,
    pub(crate) auth_url: Url,
    pub(crate) token_url: Url,
    pub(crate) userinfo_url: Url,
    pub(crate) redirect_uri: Url,
    pub(crate) scopes: Vec<String>,
    pub(crate) user_attributes: UserAttributes,
}

impl OAuthConfig {
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        auth_url: Url,
        token_url: Url,
        userinfo_url: Url,
        redirect_uri: Url,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecretString::from(client_secret.into()),
            auth_url,
            token_url,
            userinfo_url,
            redirect_uri,
            scopes: Vec::new(),
            user_attributes: UserAttributes::new(),
        }
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Copy userinfo attributes into the session user's `attrs`.
    #[must_use]
    pub fn with_user_attributes(mut self, attributes: UserAttributes) -> Self {
        self.user_attributes = attributes;
        self
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }
}

/// Delegated login through an OAuth2 authorization-code flow.
///
/// `/login` stores a handshake token (random `state`, return address,
/// audience) in the session cookie and redirects to the provider.
/// `/callback` checks `state` against that cookie, exchanges the code,
/// fetches userinfo and mints the session.
pub struct OAuthProvider {
    name: String,
    tokens: Arc<TokenService>,
    config: OAuthConfig,
    client: BasicClient,
    map_user: Arc<dyn Fn(&UserData) -> User + Send + Sync>,
    bearer_token_hook: Option<Arc<BearerTokenHook>>,
    http: reqwest::Client,
}

impl OAuthProvider {
    /// `map_user` turns userinfo into a [`User`]. Its `id` is the raw
    /// provider-side id; it gets hashed and prefixed with the provider name.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        tokens: Arc<TokenService>,
        config: OAuthConfig,
        map_user: impl Fn(&UserData) -> User + Send + Sync + 'static,
    ) -> Self {
        let client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            None,
            AuthUrl::from_url(config.auth_url.clone()),
            None,
        )
        .set_redirect_uri(RedirectUrl::from_url(config.redirect_uri.clone()));

        Self {
            name: name.into(),
            tokens,
            config,
            client,
            map_user: Arc::new(map_user),
            bearer_token_hook: None,
            http: reqwest::Client::new(),
        }
    }

    #[must_use]
    pub fn with_bearer_token_hook(
        mut self,
        hook: impl Fn(&str, &User, &BasicTokenResponse) + Send + Sync + 'static,
    ) -> Self {
        self.bearer_token_hook = Some(Arc::new(hook));
        self
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    fn authorize_url(&self, state: CsrfToken) -> Url {
        let (url, _) = self
            .client
            .authorize_url(|| state)
            .add_scopes(self.config.scopes.iter().cloned().map(Scope::new))
            .url();
        url
    }

    /// Exchange an authorization code for the provider's tokens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or
    /// [`Error::OAuth`] if the token endpoint returns an error.
    async fn exchange_code(&self, code: &str) -> Result<BasicTokenResponse, Error> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret()),
        ];

        let response = self
            .http
            .post(self.config.token_url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&params)
            .send()
            .await?;

        let response = ensure_success(response, "token exchange").await?;
        response.json::<BasicTokenResponse>().await.map_err(Into::into)
    }

    async fn fetch_user_data(&self, access_token: &str) -> Result<UserData, Error> {
        let response = self
            .http
            .get(self.config.userinfo_url.clone())
            .bearer_auth(access_token)
            .send()
            .await?;

        let response = ensure_success(response, "userinfo request").await?;
        response.json::<UserData>().await.map_err(Into::into)
    }

    fn map(&self, data: &UserData) -> User {
        let mut user = (self.map_user)(data);
        user.id = user_id(&self.name, &user.id);

        for (from, to) in &self.config.user_attributes {
            if let Some(value) = data.get(from) {
                user.attrs.insert(to.clone(), value.clone());
            }
        }
        user
    }
}

impl Provider for OAuthProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn routes(self: Arc<Self>) -> Router {
        let tokens = self.tokens.clone();
        Router::new()
            .route("/login", get(login))
            .route("/callback", get(callback))
            .with_state(self)
            .merge(logout_router(tokens))
    }
}

#[derive(Deserialize)]
struct LoginParams {
    from: Option<String>,
    site: Option<String>,
    session: Option<String>,
}

async fn login(
    State(provider): State<Arc<OAuthProvider>>,
    Query(params): Query<LoginParams>,
) -> Result<Response, AuthError> {
    let state = CsrfToken::new_random();
    let now = OffsetDateTime::now_utc();

    let claims = Claims {
        handshake: Some(Handshake {
            id: random_token_id(),
            state: state.secret().clone(),
            from: params.from.filter(|f| !f.is_empty()),
        }),
        audience: params.site.unwrap_or_default(),
        expires_at: Some((now + HANDSHAKE_TTL).unix_timestamp()),
        not_before: Some((now - NOT_BEFORE_SKEW).unix_timestamp()),
        session_only: params
            .session
            .as_deref()
            .is_some_and(|s| !s.is_empty() && s != "0"),
        ..Claims::default()
    };

    let issued = provider.tokens.set(claims)?;
    let url = provider.authorize_url(state);

    Ok((issued, Redirect::to(url.as_str())).into_response())
}

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
}

async fn callback(
    State(provider): State<Arc<OAuthProvider>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<Response, AuthError> {
    let cookie = jar
        .get(provider.tokens.config().jwt_cookie_name())
        .ok_or_else(|| AuthError::Rejected("missing handshake token".into()))?;

    let oauth_claims = provider.tokens.parse(cookie.value()).map_err(|e| {
        tracing::warn!(provider = %provider.name, error = %e, "Handshake token rejected");
        AuthError::Rejected("failed to verify handshake token".into())
    })?;

    if provider.tokens.is_expired(&oauth_claims) {
        return Err(AuthError::Rejected("handshake token expired".into()));
    }

    let handshake = oauth_claims
        .handshake
        .as_ref()
        .ok_or_else(|| AuthError::Rejected("invalid handshake token".into()))?;

    if params.state.as_deref() != Some(handshake.state.as_str()) || handshake.state.is_empty() {
        tracing::warn!(provider = %provider.name, "OAuth state mismatch");
        return Err(AuthError::Rejected("unexpected state".into()));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AuthError::MalformedRequest("missing code".into()))?;

    let token = provider.exchange_code(&code).await?;
    let data = provider
        .fetch_user_data(token.access_token().secret())
        .await?;
    let user = provider.map(&data);

    if let Some(hook) = &provider.bearer_token_hook {
        hook(&provider.name, &user, &token);
    }

    let claims = Claims::for_user(user, random_token_id(), oauth_claims.audience.clone())
        .with_session_only(oauth_claims.session_only);
    let issued = provider.tokens.set(claims)?;

    tracing::info!(provider = %provider.name, "OAuth2 login successful");

    Ok(session_response(issued, handshake.from.as_deref()))
}

/// Checks HTTP response status; returns the response on success or an error with details.
async fn ensure_success(
    response: reqwest::Response,
    operation: &'static str,
) -> Result<reqwest::Response, Error> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(Error::OAuth {
        operation,
        status: Some(status),
        detail: body,
    })
}
