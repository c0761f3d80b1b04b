use axum_extra::extract::cookie::SameSite;
use time::Duration;

use crate::error::Error;

/// Token and cookie settings shared by every provider.
///
/// Built once at startup and owned by [`TokenService`](super::TokenService).
/// Use [`from_env()`](TokenConfig::from_env) for convention-based setup, or
/// [`default()`](TokenConfig::default) with `with_*` methods for full control.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub(crate) issuer: String,
    pub(crate) token_duration: Duration,
    pub(crate) cookie_duration: Duration,
    pub(crate) leeway: Duration,
    pub(crate) jwt_cookie_name: String,
    pub(crate) jwt_cookie_domain: Option<String>,
    pub(crate) jwt_header_key: String,
    pub(crate) xsrf_cookie_name: String,
    pub(crate) xsrf_header_key: String,
    pub(crate) jwt_query: String,
    pub(crate) secure_cookies: bool,
    pub(crate) same_site: Option<SameSite>,
    pub(crate) aud_secrets: bool,
    pub(crate) send_jwt_header: bool,
    pub(crate) disable_xsrf: bool,
    pub(crate) disable_iat: bool,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            issuer: "tokengate".into(),
            token_duration: Duration::minutes(15),
            cookie_duration: Duration::days(31),
            leeway: Duration::minutes(1),
            jwt_cookie_name: "JWT".into(),
            jwt_cookie_domain: None,
            jwt_header_key: "X-JWT".into(),
            xsrf_cookie_name: "XSRF-TOKEN".into(),
            xsrf_header_key: "X-XSRF-TOKEN".into(),
            jwt_query: "token".into(),
            secure_cookies: false,
            same_site: None,
            aud_secrets: false,
            send_jwt_header: false,
            disable_xsrf: false,
            disable_iat: false,
        }
    }
}

impl TokenConfig {
    /// Create config from environment variables. Unset variables keep defaults.
    ///
    /// # Env vars
    /// - `AUTH_ISSUER`: value of the `iss` claim
    /// - `AUTH_TOKEN_DURATION_SECS`: token lifetime
    /// - `AUTH_COOKIE_DURATION_SECS`: persistent cookie lifetime
    /// - `AUTH_COOKIE_DOMAIN`: `Domain` attribute of both cookies
    /// - `AUTH_SECURE_COOKIES`, `AUTH_AUD_SECRETS`, `AUTH_SEND_JWT_HEADER`,
    ///   `AUTH_DISABLE_XSRF`, `AUTH_DISABLE_IAT`: `"1"` or `"true"` to enable
    /// - `AUTH_SAME_SITE`: `strict`, `lax` or `none`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a value can't be parsed.
    pub fn from_env() -> Result<Self, Error> {
        let mut config = Self::default();

        if let Ok(issuer) = std::env::var("AUTH_ISSUER") {
            config = config.with_issuer(issuer);
        }
        if let Some(secs) = env_secs("AUTH_TOKEN_DURATION_SECS")? {
            config = config.with_token_duration(secs);
        }
        if let Some(secs) = env_secs("AUTH_COOKIE_DURATION_SECS")? {
            config = config.with_cookie_duration(secs);
        }
        if let Ok(domain) = std::env::var("AUTH_COOKIE_DOMAIN") {
            config = config.with_cookie_domain(domain);
        }
        if let Ok(value) = std::env::var("AUTH_SAME_SITE") {
            let same_site = match value.to_ascii_lowercase().as_str() {
                "strict" => SameSite::Strict,
                "lax" => SameSite::Lax,
                "none" => SameSite::None,
                other => {
                    return Err(Error::Config(format!(
                        "AUTH_SAME_SITE: expected strict, lax or none, got '{other}'"
                    )));
                }
            };
            config = config.with_same_site(same_site);
        }

        Ok(config
            .with_secure_cookies(env_flag("AUTH_SECURE_COOKIES"))
            .with_aud_secrets(env_flag("AUTH_AUD_SECRETS"))
            .with_send_jwt_header(env_flag("AUTH_SEND_JWT_HEADER"))
            .with_disable_xsrf(env_flag("AUTH_DISABLE_XSRF"))
            .with_disable_iat(env_flag("AUTH_DISABLE_IAT")))
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    #[must_use]
    pub fn with_token_duration(mut self, duration: Duration) -> Self {
        self.token_duration = duration;
        self
    }

    #[must_use]
    pub fn with_cookie_duration(mut self, duration: Duration) -> Self {
        self.cookie_duration = duration;
        self
    }

    /// Clock skew tolerated for `nbf`/`iat` (default: one minute).
    #[must_use]
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    #[must_use]
    pub fn with_jwt_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.jwt_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_cookie_domain(mut self, domain: impl Into<String>) -> Self {
        self.jwt_cookie_domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn with_jwt_header_key(mut self, key: impl Into<String>) -> Self {
        self.jwt_header_key = key.into();
        self
    }

    #[must_use]
    pub fn with_xsrf_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.xsrf_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_xsrf_header_key(mut self, key: impl Into<String>) -> Self {
        self.xsrf_header_key = key.into();
        self
    }

    #[must_use]
    pub fn with_jwt_query(mut self, query: impl Into<String>) -> Self {
        self.jwt_query = query.into();
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    /// Resolve a separate secret per audience.
    ///
    /// Adds an unverified pre-parse of incoming tokens to read `aud`.
    #[must_use]
    pub fn with_aud_secrets(mut self, enabled: bool) -> Self {
        self.aud_secrets = enabled;
        self
    }

    /// Deliver tokens in a header instead of cookies.
    #[must_use]
    pub fn with_send_jwt_header(mut self, enabled: bool) -> Self {
        self.send_jwt_header = enabled;
        self
    }

    #[must_use]
    pub fn with_disable_xsrf(mut self, disabled: bool) -> Self {
        self.disable_xsrf = disabled;
        self
    }

    #[must_use]
    pub fn with_disable_iat(mut self, disabled: bool) -> Self {
        self.disable_iat = disabled;
        self
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn token_duration(&self) -> Duration {
        self.token_duration
    }

    #[must_use]
    pub fn cookie_duration(&self) -> Duration {
        self.cookie_duration
    }

    #[must_use]
    pub fn jwt_cookie_name(&self) -> &str {
        &self.jwt_cookie_name
    }

    #[must_use]
    pub fn xsrf_cookie_name(&self) -> &str {
        &self.xsrf_cookie_name
    }

    #[must_use]
    pub fn jwt_header_key(&self) -> &str {
        &self.jwt_header_key
    }

    #[must_use]
    pub fn xsrf_header_key(&self) -> &str {
        &self.xsrf_header_key
    }
}

fn env_flag(name: &str) -> bool {
    matches!(std::env::var(name).as_deref(), Ok("1") | Ok("true"))
}

/// Upper bound for durations read from the environment (100 years).
const MAX_ENV_SECS: i64 = 100 * 365 * 24 * 60 * 60;

fn env_secs(name: &str) -> Result<Option<Duration>, Error> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|secs| (1..=MAX_ENV_SECS).contains(secs))
            .map(|secs| Some(Duration::seconds(secs)))
            .ok_or_else(|| {
                Error::Config(format!(
                    "{name}: expected 1..={MAX_ENV_SECS} seconds, got '{value}'"
                ))
            }),
        Err(_) => Ok(None),
    }
}
