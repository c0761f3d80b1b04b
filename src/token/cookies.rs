use std::convert::Infallible;

use axum::http::{HeaderName, HeaderValue};
use axum::response::{IntoResponseParts, ResponseParts};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::Cookie;
use time::{Duration, OffsetDateTime};

use super::config::TokenConfig;
use crate::types::Claims;

/// How a minted token reaches the client.
#[derive(Debug, Clone)]
pub enum Delivery {
    /// Raw token in a response header, no XSRF cookie.
    Header { name: HeaderName, value: HeaderValue },
    /// HTTP-only token cookie plus readable XSRF cookie.
    Cookies {
        jwt: Cookie<'static>,
        xsrf: Cookie<'static>,
    },
}

/// Result of minting a token: the signed string, the final claims and the
/// transport to attach to the response.
///
/// Implements [`IntoResponseParts`], so it can be returned alongside a body:
///
/// ```rust,ignore
/// let issued = tokens.set(claims)?;
/// Ok((issued, Json(user)))
/// ```
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
    pub delivery: Delivery,
}

impl IssuedToken {
    /// Token cookie, if delivered by cookie.
    #[must_use]
    pub fn jwt_cookie(&self) -> Option<&Cookie<'static>> {
        match &self.delivery {
            Delivery::Cookies { jwt, .. } => Some(jwt),
            Delivery::Header { .. } => None,
        }
    }

    /// XSRF cookie, if delivered by cookie.
    #[must_use]
    pub fn xsrf_cookie(&self) -> Option<&Cookie<'static>> {
        match &self.delivery {
            Delivery::Cookies { xsrf, .. } => Some(xsrf),
            Delivery::Header { .. } => None,
        }
    }
}

impl IntoResponseParts for IssuedToken {
    type Error = Infallible;

    fn into_response_parts(self, res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        match self.delivery {
            Delivery::Header { name, value } => {
                let mut res = res;
                res.headers_mut().insert(name, value);
                Ok(res)
            }
            Delivery::Cookies { jwt, xsrf } => {
                CookieJar::new().add(jwt).add(xsrf).into_response_parts(res)
            }
        }
    }
}

/// Create the token + XSRF cookie pair.
///
/// `persistent` selects between a browser-session cookie (no `Max-Age`) and
/// one living for the configured cookie duration.
pub(super) fn session_cookies(
    config: &TokenConfig,
    token: &str,
    xsrf: &str,
    persistent: bool,
) -> (Cookie<'static>, Cookie<'static>) {
    let max_age = persistent.then_some(config.cookie_duration);

    let jwt = scoped(config, &config.jwt_cookie_name, token, true, max_age);
    let xsrf = scoped(config, &config.xsrf_cookie_name, xsrf, false, max_age);

    (jwt, xsrf)
}

/// Create removal cookies for both session cookies.
pub(super) fn clear_session_cookies(config: &TokenConfig) -> (Cookie<'static>, Cookie<'static>) {
    let clear = |name: &str| {
        let mut cookie = scoped(config, name, "", false, Some(Duration::ZERO));
        cookie.set_expires(OffsetDateTime::UNIX_EPOCH);
        cookie
    };

    (clear(&config.jwt_cookie_name), clear(&config.xsrf_cookie_name))
}

fn scoped(
    config: &TokenConfig,
    name: &str,
    value: &str,
    http_only: bool,
    max_age: Option<Duration>,
) -> Cookie<'static> {
    let mut cookie = Cookie::build((name.to_string(), value.to_string()))
        .path("/")
        .http_only(http_only)
        .secure(config.secure_cookies)
        .build();

    if let Some(domain) = &config.jwt_cookie_domain {
        cookie.set_domain(domain.clone());
    }
    if let Some(same_site) = config.same_site {
        cookie.set_same_site(same_site);
    }
    if let Some(max_age) = max_age {
        cookie.set_max_age(max_age);
    }
    cookie
}

#[cfg(test)]
mod tests {
    use axum_extra::extract::cookie::SameSite;

    use super::*;

    #[test]
    fn session_cookie_has_no_max_age() {
        let (jwt, xsrf) = session_cookies(&TokenConfig::default(), "tkn", "xid", false);

        assert_eq!(jwt.value(), "tkn");
        assert_eq!(jwt.http_only(), Some(true));
        assert_eq!(jwt.path(), Some("/"));
        assert_eq!(jwt.max_age(), None);
        assert_eq!(xsrf.value(), "xid");
        assert_eq!(xsrf.http_only(), Some(false));
        assert_eq!(xsrf.max_age(), None);
    }

    #[test]
    fn persistent_cookie_uses_cookie_duration() {
        let config = TokenConfig::default()
            .with_cookie_duration(Duration::hours(2))
            .with_cookie_domain("example.com")
            .with_secure_cookies(true)
            .with_same_site(SameSite::Strict);
        let (jwt, xsrf) = session_cookies(&config, "tkn", "xid", true);

        assert_eq!(jwt.max_age(), Some(Duration::hours(2)));
        assert_eq!(xsrf.max_age(), Some(Duration::hours(2)));
        assert_eq!(jwt.domain(), Some("example.com"));
        assert_eq!(jwt.secure(), Some(true));
        assert_eq!(xsrf.same_site(), Some(SameSite::Strict));
    }

    #[test]
    fn clear_cookies_expire_immediately() {
        let (jwt, xsrf) = clear_session_cookies(&TokenConfig::default());

        for cookie in [jwt, xsrf] {
            assert_eq!(cookie.value(), "");
            assert_eq!(cookie.max_age(), Some(Duration::ZERO));
            assert_eq!(
                cookie.expires_datetime(),
                Some(OffsetDateTime::UNIX_EPOCH)
            );
        }
    }
}
