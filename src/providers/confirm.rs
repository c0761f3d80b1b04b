use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use super::traits::{Sender, SenderDyn};
use super::{Provider, flag, logout_router, session_response};
use crate::error::Error;
use crate::ident::{random_token_id, user_id};
use crate::middleware::AuthError;
use crate::token::TokenService;
use crate::types::{Claims, Handshake, User};

/// Message sent when no template is configured.
///
/// Variables: `user`, `address`, `site`, `token`.
pub const DEFAULT_TEMPLATE: &str =
    "Confirmation for {{user}} {{address}}, site {{site}}\n\nToken: {{token}}";

const MAX_INPUT_LEN: usize = 128;
const CONFIRMATION_TTL: Duration = Duration::minutes(30);
const NOT_BEFORE_SKEW: Duration = Duration::minutes(1);

/// Passwordless login in two requests.
///
/// `GET /login?user=&address=&site=` signs a confirmation token and hands it
/// to the [`Sender`]. `GET /login?token=` redeems it for a session. Nothing
/// is stored between the two: the confirmation token is the whole state.
pub struct ConfirmProvider {
    name: String,
    tokens: Arc<TokenService>,
    sender: Arc<dyn SenderDyn>,
    template: String,
    handlebars: Handlebars<'static>,
}

impl ConfirmProvider {
    #[must_use]
    pub fn new(name: impl Into<String>, tokens: Arc<TokenService>, sender: impl Sender) -> Self {
        let mut handlebars = Handlebars::new();
        // Messages are plain text, not HTML.
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.set_strict_mode(true);

        Self {
            name: name.into(),
            tokens,
            sender: Arc::new(sender),
            template: DEFAULT_TEMPLATE.to_string(),
            handlebars,
        }
    }

    /// Replace the confirmation message template (Handlebars syntax).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the template doesn't compile.
    pub fn with_template(mut self, template: impl Into<String>) -> Result<Self, Error> {
        let template = template.into();
        handlebars::Template::compile(&template)
            .map_err(|e| Error::Config(format!("confirmation template: {e}")))?;
        self.template = template;
        Ok(self)
    }

    async fn send_confirmation(&self, params: LoginParams) -> Result<Response, AuthError> {
        let user = sanitize(params.user.as_deref().unwrap_or_default());
        let address = sanitize(params.address.as_deref().unwrap_or_default());
        let site = sanitize(params.site.as_deref().unwrap_or_default());

        let id = Handshake::confirmation_id(&user, &address)
            .ok_or_else(|| AuthError::MalformedRequest("can't get user and address".into()))?;

        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            handshake: Some(Handshake {
                id,
                state: String::new(),
                from: params.from.filter(|f| !f.is_empty()),
            }),
            audience: site.clone(),
            expires_at: Some((now + CONFIRMATION_TTL).unix_timestamp()),
            not_before: Some((now - NOT_BEFORE_SKEW).unix_timestamp()),
            session_only: params
                .session
                .as_deref()
                .is_some_and(|s| !s.is_empty() && s != "0"),
            ..Claims::default()
        };

        let (token, _) = self.tokens.generate(claims)?;
        let text = self.render(&user, &address, &site, &token)?;

        self.sender
            .send_dyn(&address, &text)
            .await
            .map_err(|e| AuthError::Delivery(format!("failed to send confirmation: {e}")))?;

        tracing::info!(provider = %self.name, user = %user, "Confirmation sent");

        Ok(Json(Confirmation { user, address }).into_response())
    }

    fn redeem(&self, token: &str, session_only: bool) -> Result<Response, AuthError> {
        let confirmation = self.tokens.parse(token).map_err(|e| {
            tracing::warn!(provider = %self.name, error = %e, "Confirmation token rejected");
            AuthError::Rejected("failed to verify confirmation token".into())
        })?;

        if self.tokens.is_expired(&confirmation) {
            tracing::warn!(provider = %self.name, "Confirmation token expired");
            return Err(AuthError::Rejected("confirmation token expired".into()));
        }

        let handshake = confirmation
            .handshake
            .as_ref()
            .ok_or_else(|| AuthError::Rejected("invalid handshake token".into()))?;
        let (user, address) = handshake
            .split_id()
            .ok_or_else(|| AuthError::Rejected("invalid handshake token".into()))?;

        let claims = Claims::for_user(
            User::new(user, user_id(&self.name, address)),
            random_token_id(),
            confirmation.audience.clone(),
        )
        .with_session_only(session_only);

        let issued = self.tokens.set(claims)?;

        tracing::info!(provider = %self.name, user = %user, "Login confirmed");

        Ok(session_response(issued, handshake.from.as_deref()))
    }

    fn render(&self, user: &str, address: &str, site: &str, token: &str) -> Result<String, AuthError> {
        let data = MessageData {
            user,
            address,
            site,
            token,
        };
        self.handlebars
            .render_template(&self.template, &data)
            .map_err(|e| AuthError::Internal(format!("can't execute confirmation template: {e}")))
    }
}

impl Provider for ConfirmProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn routes(self: Arc<Self>) -> Router {
        let tokens = self.tokens.clone();
        Router::new()
            .route("/login", get(login))
            .with_state(self)
            .merge(logout_router(tokens))
    }
}

#[derive(Debug, Default, Deserialize)]
struct LoginParams {
    token: Option<String>,
    sess: Option<String>,
    user: Option<String>,
    address: Option<String>,
    site: Option<String>,
    from: Option<String>,
    session: Option<String>,
}

#[derive(Serialize)]
struct Confirmation {
    user: String,
    address: String,
}

#[derive(Serialize)]
struct MessageData<'a> {
    user: &'a str,
    address: &'a str,
    site: &'a str,
    token: &'a str,
}

async fn login(
    State(provider): State<Arc<ConfirmProvider>>,
    Query(params): Query<LoginParams>,
) -> Result<Response, AuthError> {
    match params.token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => provider.redeem(token, flag(params.sess.as_deref())),
        None => provider.send_confirmation(params).await,
    }
}

/// Strip newlines, trim, and cap the length of user-supplied text.
fn sanitize(input: &str) -> String {
    let flat: String = input.chars().filter(|c| !matches!(c, '\n' | '\r')).collect();
    flat.trim().chars().take(MAX_INPUT_LEN).collect()
}
