use std::collections::HashSet;
use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Uri};
use axum_extra::extract::CookieJar;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use time::OffsetDateTime;

use super::config::TokenConfig;
use super::cookies::{self, Delivery, IssuedToken};
use super::traits::{AudienceReader, ClaimsUpdater, SecretReader};
use crate::error::Error;
use crate::ident::random_token_id;
use crate::types::Claims;

/// Audience passed to the [`SecretReader`] when per-audience secrets are off.
pub const SENTINEL_AUDIENCE: &str = "ignore";

/// Mints, verifies and clears session tokens.
///
/// Holds only immutable configuration and the injected collaborators, so a
/// single instance is shared behind an `Arc` by every provider.
pub struct TokenService {
    config: TokenConfig,
    secret_reader: Arc<dyn SecretReader>,
    claims_updater: Option<Arc<dyn ClaimsUpdater>>,
    audience_reader: Option<Arc<dyn AudienceReader>>,
}

impl TokenService {
    #[must_use]
    pub fn new(config: TokenConfig, secret_reader: impl SecretReader) -> Self {
        Self {
            config,
            secret_reader: Arc::new(secret_reader),
            claims_updater: None,
            audience_reader: None,
        }
    }

    /// Adjust claims right before they are signed.
    #[must_use]
    pub fn with_claims_updater(mut self, updater: impl ClaimsUpdater) -> Self {
        self.claims_updater = Some(Arc::new(updater));
        self
    }

    /// Restrict accepted audiences, checked on both mint and parse.
    #[must_use]
    pub fn with_audience_reader(mut self, reader: impl AudienceReader) -> Self {
        self.audience_reader = Some(Arc::new(reader));
        self
    }

    #[must_use]
    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Signs claims into a token string without touching the response.
    ///
    /// Applies defaults first (`exp`, `iss`, `iat`, `jti`), then the claims
    /// updater, then the audience check, then secret lookup and HS256 signing.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the token duration overflows `exp`,
    /// [`Error::AudienceRejected`] / [`Error::AudienceUnavailable`] from the
    /// allow-list, [`Error::SecretUnavailable`] from the secret reader,
    /// [`Error::Signing`] if encoding fails.
    pub fn generate(&self, mut claims: Claims) -> Result<(String, Claims), Error> {
        let now = now_unix();

        if claims.expires_at.is_none() {
            let exp = now
                .checked_add(self.config.token_duration.whole_seconds())
                .ok_or_else(|| Error::Config("token duration overflows exp".into()))?;
            claims.expires_at = Some(exp);
        }
        if claims.issuer.is_empty() {
            claims.issuer.clone_from(&self.config.issuer);
        }
        if !self.config.disable_iat {
            claims.issued_at = Some(now);
        }
        if claims.id.is_empty() {
            claims.id = random_token_id();
        }

        if let Some(updater) = &self.claims_updater {
            claims = updater.update(claims);
        }

        self.check_audience(&claims.audience)?;
        if self.config.aud_secrets && claims.audience.trim().is_empty() {
            return Err(Error::AudienceRejected(
                "empty aud with per-audience secrets".into(),
            ));
        }

        let secret = self.secret_for(&claims.audience)?;
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
        )
        .map_err(|e| Error::Signing(e.to_string()))?;

        Ok((token, claims))
    }

    /// Mints a session token and prepares its delivery.
    ///
    /// The returned [`IssuedToken`] writes either the `X-JWT` header or the
    /// `JWT` + `XSRF-TOKEN` cookie pair when converted into response parts.
    /// Session-only and handshake tokens get browser-session cookies.
    ///
    /// # Errors
    ///
    /// Everything [`generate`](Self::generate) returns, plus
    /// [`Error::Config`] for an invalid header name.
    pub fn set(&self, claims: Claims) -> Result<IssuedToken, Error> {
        let (token, claims) = self.generate(claims)?;

        let delivery = if self.config.send_jwt_header {
            let name = HeaderName::try_from(self.config.jwt_header_key.as_str())
                .map_err(|e| Error::Config(format!("jwt header key: {e}")))?;
            let value =
                HeaderValue::from_str(&token).map_err(|e| Error::Signing(e.to_string()))?;
            Delivery::Header { name, value }
        } else {
            let persistent = !claims.session_only && !claims.is_handshake();
            let (jwt, xsrf) = cookies::session_cookies(&self.config, &token, &claims.id, persistent);
            Delivery::Cookies { jwt, xsrf }
        };

        Ok(IssuedToken {
            token,
            claims,
            delivery,
        })
    }

    /// Verifies a token and returns its claims.
    ///
    /// Expired tokens parse successfully; use [`is_expired`](Self::is_expired)
    /// to tell "expired" apart from "invalid".
    ///
    /// # Errors
    ///
    /// - [`Error::Malformed`]: undecodable token, or no `aud` while
    ///   per-audience secrets are on
    /// - [`Error::SecretUnavailable`]: secret reader failed
    /// - [`Error::Algorithm`]: not an HMAC token
    /// - [`Error::Signature`]: signature mismatch
    /// - [`Error::AudienceRejected`]: audience not allowed
    /// - [`Error::Invalid`]: claims fail structural validation
    pub fn parse(&self, token: &str) -> Result<Claims, Error> {
        let audience = if self.config.aud_secrets {
            fetch_audience(token)?
        } else {
            SENTINEL_AUDIENCE.to_string()
        };
        let secret = self.secret_for(&audience)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        let claims = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            &validation,
        )?
        .claims;

        self.check_audience(&claims.audience)?;
        self.validate(&claims, now_unix())?;

        Ok(claims)
    }

    /// Finds, verifies and XSRF-checks the token carried by a request.
    ///
    /// Lookup order: token header, token cookie, token query parameter. A
    /// cookie-borne token must be accompanied by an XSRF header equal to its
    /// `jti` unless XSRF protection is disabled.
    ///
    /// # Errors
    ///
    /// [`Error::NoToken`], [`Error::XsrfMismatch`], [`Error::Expired`], or
    /// anything [`parse`](Self::parse) returns.
    pub fn get(&self, headers: &HeaderMap, uri: &Uri) -> Result<(Claims, String), Error> {
        let (token, from_cookie) = self.find_token(headers, uri).ok_or(Error::NoToken)?;
        let claims = self.parse(&token)?;

        if from_cookie && !self.config.disable_xsrf {
            let xsrf = headers
                .get(self.config.xsrf_header_key.as_str())
                .and_then(|v| v.to_str().ok());
            if xsrf != Some(claims.id.as_str()) {
                tracing::debug!(jti = %claims.id, "XSRF header does not match token");
                return Err(Error::XsrfMismatch);
            }
        }

        if self.is_expired(&claims) {
            return Err(Error::Expired);
        }

        Ok((claims, token))
    }

    /// True iff the token's `exp` lies in the past.
    #[must_use]
    pub fn is_expired(&self, claims: &Claims) -> bool {
        Self::is_expired_at(claims, now_unix())
    }

    /// Expiry rule with an explicit clock.
    ///
    /// `now == exp` is still valid. A token without `exp` counts as expired.
    #[must_use]
    pub fn is_expired_at(claims: &Claims, now: i64) -> bool {
        claims.expires_at.is_none_or(|exp| now > exp)
    }

    /// Removal cookies for both the token and the XSRF cookie.
    #[must_use]
    pub fn reset(&self) -> CookieJar {
        let (jwt, xsrf) = cookies::clear_session_cookies(&self.config);
        CookieJar::new().add(jwt).add(xsrf)
    }

    fn secret_for(&self, audience: &str) -> Result<SecretString, Error> {
        let key = if self.config.aud_secrets {
            audience
        } else {
            SENTINEL_AUDIENCE
        };
        self.secret_reader
            .get(key)
            .map_err(|e| Error::SecretUnavailable(e.to_string()))
    }

    fn check_audience(&self, audience: &str) -> Result<(), Error> {
        let Some(reader) = &self.audience_reader else {
            return Ok(());
        };

        let allowed = reader
            .get()
            .map_err(|e| Error::AudienceUnavailable(e.to_string()))?;
        let wanted = audience.to_lowercase();

        if allowed.iter().any(|a| a.to_lowercase() == wanted) {
            Ok(())
        } else {
            Err(Error::AudienceRejected(format!("aud {audience:?} not allowed")))
        }
    }

    fn validate(&self, claims: &Claims, now: i64) -> Result<(), Error> {
        if claims.user.is_some() && claims.handshake.is_some() {
            return Err(Error::Invalid("both user and handshake present".into()));
        }
        if claims.user.as_ref().is_some_and(|u| u.id.is_empty()) {
            return Err(Error::Invalid("user without id".into()));
        }
        if claims.handshake.as_ref().is_some_and(|h| h.id.is_empty()) {
            return Err(Error::Invalid("handshake without id".into()));
        }
        if !self.config.issuer.is_empty() && claims.issuer != self.config.issuer {
            return Err(Error::Invalid(format!(
                "iss: expected '{}', got '{}'",
                self.config.issuer, claims.issuer
            )));
        }

        let skew = self.config.leeway.whole_seconds();
        if claims.not_before.is_some_and(|nbf| nbf > now + skew) {
            return Err(Error::Invalid("token not valid yet".into()));
        }
        if claims.issued_at.is_some_and(|iat| iat > now + skew) {
            return Err(Error::Invalid("token issued in the future".into()));
        }

        Ok(())
    }

    fn find_token(&self, headers: &HeaderMap, uri: &Uri) -> Option<(String, bool)> {
        if let Some(token) = headers
            .get(self.config.jwt_header_key.as_str())
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
        {
            return Some((token.to_string(), false));
        }

        let jar = CookieJar::from_headers(headers);
        if let Some(cookie) = jar
            .get(&self.config.jwt_cookie_name)
            .filter(|c| !c.value().is_empty())
        {
            return Some((cookie.value().to_string(), true));
        }

        uri.query()
            .and_then(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .find(|(k, _)| k == self.config.jwt_query.as_str())
                    .map(|(_, v)| v.into_owned())
            })
            .filter(|v| !v.is_empty())
            .map(|v| (v, false))
    }
}

#[derive(Deserialize)]
struct UnverifiedAudience {
    #[serde(default)]
    aud: String,
}

/// Reads `aud` without checking the signature, only to pick the secret.
fn fetch_audience(token: &str) -> Result<String, Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.required_spec_claims = HashSet::new();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;

    let data =
        jsonwebtoken::decode::<UnverifiedAudience>(token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(|e| Error::Malformed(format!("can't pre-parse token: {e}")))?;

    if data.claims.aud.trim().is_empty() {
        return Err(Error::Malformed("empty aud".into()));
    }
    Ok(data.claims.aud)
}

fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

#[cfg(test)]
mod tests {
    use axum::http::header::COOKIE;
    use time::Duration;

    use super::*;
    use crate::error::BoxError;
    use crate::token::StaticSecret;
    use crate::types::{Handshake, User};

    const RS256_HEADER: &str = "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9";
    const NONE_HEADER: &str = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0";

    fn service() -> TokenService {
        TokenService::new(TokenConfig::default(), StaticSecret::new("secret-a"))
    }

    fn bob(aud: &str) -> Claims {
        Claims::for_user(User::new("bob", "local_1234"), "", aud)
    }

    fn per_audience(map: &'static [(&'static str, &'static str)]) -> TokenService {
        let reader = move |aud: &str| -> Result<SecretString, BoxError> {
            map.iter()
                .find(|(a, _)| *a == aud)
                .map(|(_, s)| SecretString::from(s.to_string()))
                .ok_or_else(|| format!("no secret for {aud}").into())
        };
        TokenService::new(TokenConfig::default().with_aud_secrets(true), reader)
    }

    #[test]
    fn test_round_trip_preserves_identity() {
        let svc = service();
        let issued = svc.set(bob("acme")).unwrap();
        let parsed = svc.parse(&issued.token).unwrap();

        assert_eq!(parsed, issued.claims);
        assert_eq!(parsed.user.unwrap().name, "bob");
        assert_eq!(parsed.audience, "acme");
        assert_eq!(parsed.id.len(), 40);
    }

    #[test]
    fn test_generate_applies_defaults() {
        let svc = TokenService::new(
            TokenConfig::default()
                .with_issuer("acme-auth")
                .with_token_duration(Duration::minutes(5)),
            StaticSecret::new("s"),
        );
        let before = now_unix();
        let (_, claims) = svc.generate(bob("acme")).unwrap();

        assert_eq!(claims.issuer, "acme-auth");
        let exp = claims.expires_at.unwrap();
        assert!(exp >= before + 300 && exp <= now_unix() + 300);
        assert!(claims.issued_at.unwrap() >= before);
    }

    #[test]
    fn test_generate_keeps_explicit_values() {
        let mut claims = bob("acme");
        claims.id = "fixed-id".into();
        claims.expires_at = Some(42);

        let (_, claims) = service().generate(claims).unwrap();
        assert_eq!(claims.id, "fixed-id");
        assert_eq!(claims.expires_at, Some(42));
    }

    #[test]
    fn test_disable_iat() {
        let svc = TokenService::new(
            TokenConfig::default().with_disable_iat(true),
            StaticSecret::new("s"),
        );
        let (_, claims) = svc.generate(bob("acme")).unwrap();
        assert_eq!(claims.issued_at, None);
    }

    #[test]
    fn test_claims_updater_runs_before_signing() {
        let svc = service().with_claims_updater(|mut c: Claims| {
            if let Some(user) = c.user.as_mut() {
                user.attrs.insert("role".into(), "admin".into());
            }
            c
        });
        let issued = svc.set(bob("acme")).unwrap();
        let parsed = svc.parse(&issued.token).unwrap();

        assert_eq!(parsed.user.unwrap().attrs["role"], "admin");
    }

    #[test]
    fn test_audience_rejected_on_mint() {
        let svc = service().with_audience_reader(vec!["acme".to_string()]);

        assert!(svc.set(bob("ACME")).is_ok(), "match is case-insensitive");
        assert!(matches!(
            svc.set(bob("other")),
            Err(Error::AudienceRejected(_))
        ));
    }

    #[test]
    fn test_audience_rejected_on_parse() {
        let token = service().set(bob("other")).unwrap().token;
        let strict = service().with_audience_reader(vec!["acme".to_string()]);

        assert!(matches!(strict.parse(&token), Err(Error::AudienceRejected(_))));
    }

    #[test]
    fn test_audience_checked_before_secret() {
        let svc = TokenService::new(TokenConfig::default(), |_: &str| -> Result<SecretString, BoxError> {
            Err("vault down".into())
        })
        .with_audience_reader(vec!["acme".to_string()]);

        assert!(matches!(svc.set(bob("other")), Err(Error::AudienceRejected(_))));
        assert!(matches!(svc.set(bob("acme")), Err(Error::SecretUnavailable(_))));
    }

    #[test]
    fn test_audience_reader_failure() {
        let svc = service().with_audience_reader(|| -> Result<Vec<String>, BoxError> {
            Err("db down".into())
        });
        assert!(matches!(svc.set(bob("acme")), Err(Error::AudienceUnavailable(_))));
    }

    #[test]
    fn test_per_audience_secrets_isolate_tokens() {
        let signer = per_audience(&[("acme", "s1")]);
        let verifier = per_audience(&[("acme", "s2")]);
        let token = signer.set(bob("acme")).unwrap().token;

        assert!(signer.parse(&token).is_ok());
        assert!(matches!(verifier.parse(&token), Err(Error::Signature)));
    }

    #[test]
    fn test_per_audience_secrets_pick_secret_by_aud() {
        let svc = per_audience(&[("acme", "s1"), ("globex", "s2")]);
        let acme = svc.set(bob("acme")).unwrap().token;
        let globex = svc.set(bob("globex")).unwrap().token;

        assert_eq!(svc.parse(&acme).unwrap().audience, "acme");
        assert_eq!(svc.parse(&globex).unwrap().audience, "globex");
        assert!(matches!(svc.set(bob("initech")), Err(Error::SecretUnavailable(_))));
    }

    #[test]
    fn test_per_audience_secrets_reject_empty_aud() {
        let token = service().set(bob("")).unwrap().token;
        let svc = per_audience(&[("", "secret-a")]);

        assert!(matches!(svc.parse(&token), Err(Error::Malformed(_))));
        assert!(matches!(svc.set(bob("")), Err(Error::AudienceRejected(_))));
    }

    #[test]
    fn test_forged_signature() {
        let token = service().set(bob("acme")).unwrap().token;
        let other = TokenService::new(TokenConfig::default(), StaticSecret::new("secret-b"));

        assert!(matches!(other.parse(&token), Err(Error::Signature)));
    }

    #[test]
    fn test_non_hmac_algorithm_rejected() {
        let token = service().set(bob("acme")).unwrap().token;
        let (_, rest) = token.split_once('.').unwrap();

        let rs256 = format!("{RS256_HEADER}.{rest}");
        assert!(matches!(service().parse(&rs256), Err(Error::Algorithm(_))));

        let none = format!("{NONE_HEADER}.{rest}");
        assert!(matches!(
            service().parse(&none),
            Err(Error::Algorithm(_) | Error::Malformed(_))
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(service().parse("not-a-token"), Err(Error::Malformed(_))));
        assert!(matches!(service().parse(""), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_expired_token_still_parses() {
        let mut claims = bob("acme");
        claims.expires_at = Some(now_unix() - 3600);
        let svc = service();
        let token = svc.set(claims).unwrap().token;

        let parsed = svc.parse(&token).unwrap();
        assert!(svc.is_expired(&parsed));
    }

    #[test]
    fn test_is_expired_boundary() {
        let claims = Claims {
            expires_at: Some(1_000),
            ..Claims::default()
        };

        assert!(!TokenService::is_expired_at(&claims, 999));
        assert!(!TokenService::is_expired_at(&claims, 1_000));
        assert!(TokenService::is_expired_at(&claims, 1_001));
        assert!(TokenService::is_expired_at(&Claims::default(), 0));
    }

    #[test]
    fn test_structural_validation() {
        let svc = service();

        let mut both = bob("acme");
        both.handshake = Some(Handshake {
            id: "a::b".into(),
            ..Handshake::default()
        });
        let token = svc.generate(both).unwrap().0;
        assert!(matches!(svc.parse(&token), Err(Error::Invalid(_))));

        let mut foreign = bob("acme");
        foreign.issuer = "someone-else".into();
        let token = svc.generate(foreign).unwrap().0;
        assert!(matches!(svc.parse(&token), Err(Error::Invalid(_))));

        let mut early = bob("acme");
        early.not_before = Some(now_unix() + 3600);
        let token = svc.generate(early).unwrap().0;
        assert!(matches!(svc.parse(&token), Err(Error::Invalid(_))));

        let nameless = Claims::for_user(User::new("bob", ""), "", "acme");
        let token = svc.generate(nameless).unwrap().0;
        assert!(matches!(svc.parse(&token), Err(Error::Invalid(msg)) if msg == "user without id"));

        let anonymous_handshake = Claims {
            handshake: Some(Handshake::default()),
            ..Claims::default()
        };
        let token = svc.generate(anonymous_handshake).unwrap().0;
        assert!(matches!(svc.parse(&token), Err(Error::Invalid(msg)) if msg == "handshake without id"));
    }

    #[test]
    fn test_future_iat_beyond_leeway_rejected() {
        let signer = TokenService::new(
            TokenConfig::default().with_disable_iat(true),
            StaticSecret::new("secret-a"),
        );
        let mut claims = bob("acme");
        claims.issued_at = Some(now_unix() + 3600);
        let token = signer.generate(claims).unwrap().0;

        assert!(matches!(
            service().parse(&token),
            Err(Error::Invalid(msg)) if msg == "token issued in the future"
        ));

        let mut claims = bob("acme");
        claims.issued_at = Some(now_unix() + 1);
        let token = signer.generate(claims).unwrap().0;
        assert!(service().parse(&token).is_ok(), "within leeway");
    }

    #[test]
    fn test_overflowing_token_duration_is_config_error() {
        let svc = TokenService::new(
            TokenConfig::default().with_token_duration(Duration::seconds(i64::MAX)),
            StaticSecret::new("secret-a"),
        );
        assert!(matches!(svc.generate(bob("acme")), Err(Error::Config(_))));
    }

    #[test]
    fn test_service_token_without_user_parses() {
        let svc = service();
        let token = svc.generate(Claims::default()).unwrap().0;
        let claims = svc.parse(&token).unwrap();

        assert!(claims.user.is_none());
        assert!(claims.handshake.is_none());
    }

    #[test]
    fn test_set_cookie_lifetimes() {
        let svc = service();

        let persistent = svc.set(bob("acme")).unwrap();
        let jwt = persistent.jwt_cookie().unwrap();
        assert_eq!(jwt.max_age(), Some(Duration::days(31)));
        assert_eq!(jwt.value(), persistent.token);
        assert_eq!(persistent.xsrf_cookie().unwrap().value(), persistent.claims.id);

        let session = svc.set(bob("acme").with_session_only(true)).unwrap();
        assert_eq!(session.jwt_cookie().unwrap().max_age(), None);
        assert_eq!(session.xsrf_cookie().unwrap().max_age(), None);

        let handshake = svc
            .set(Claims {
                handshake: Some(Handshake {
                    id: "bob::bob@example.com".into(),
                    ..Handshake::default()
                }),
                ..Claims::default()
            })
            .unwrap();
        assert_eq!(handshake.jwt_cookie().unwrap().max_age(), None);
    }

    #[test]
    fn test_header_mode_skips_cookies() {
        let svc = TokenService::new(
            TokenConfig::default().with_send_jwt_header(true),
            StaticSecret::new("s"),
        );
        let issued = svc.set(bob("acme")).unwrap();

        assert!(issued.jwt_cookie().is_none());
        assert!(issued.xsrf_cookie().is_none());
        match &issued.delivery {
            Delivery::Header { name, value } => {
                assert_eq!(name.as_str(), "x-jwt");
                assert_eq!(value.to_str().unwrap(), issued.token);
            }
            Delivery::Cookies { .. } => panic!("expected header delivery"),
        }
    }

    #[test]
    fn test_reset_expires_both_cookies() {
        let jar = service().reset();

        for name in ["JWT", "XSRF-TOKEN"] {
            let cookie = jar.get(name).unwrap();
            assert_eq!(cookie.value(), "");
            assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        }
    }

    fn cookie_headers(token: &str, xsrf: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, format!("JWT={token}").parse().unwrap());
        if let Some(xsrf) = xsrf {
            headers.insert("X-XSRF-TOKEN", xsrf.parse().unwrap());
        }
        headers
    }

    #[test]
    fn test_get_from_cookie_requires_xsrf() {
        let svc = service();
        let issued = svc.set(bob("acme")).unwrap();
        let uri = Uri::from_static("/private");

        let ok = cookie_headers(&issued.token, Some(&issued.claims.id));
        assert_eq!(svc.get(&ok, &uri).unwrap().0, issued.claims);

        let missing = cookie_headers(&issued.token, None);
        assert!(matches!(svc.get(&missing, &uri), Err(Error::XsrfMismatch)));

        let wrong = cookie_headers(&issued.token, Some("nope"));
        assert!(matches!(svc.get(&wrong, &uri), Err(Error::XsrfMismatch)));
    }

    #[test]
    fn test_get_without_xsrf_protection() {
        let svc = TokenService::new(
            TokenConfig::default().with_disable_xsrf(true),
            StaticSecret::new("secret-a"),
        );
        let issued = svc.set(bob("acme")).unwrap();
        let headers = cookie_headers(&issued.token, None);

        assert!(svc.get(&headers, &Uri::from_static("/")).is_ok());
    }

    #[test]
    fn test_get_from_header_and_query() {
        let svc = service();
        let issued = svc.set(bob("acme")).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("X-JWT", issued.token.parse().unwrap());
        let (_, token) = svc.get(&headers, &Uri::from_static("/")).unwrap();
        assert_eq!(token, issued.token);

        let uri: Uri = format!("/private?token={}", issued.token).parse().unwrap();
        assert!(svc.get(&HeaderMap::new(), &uri).is_ok());
    }

    #[test]
    fn test_get_rejects_missing_and_expired() {
        let svc = service();
        let uri = Uri::from_static("/");
        assert!(matches!(svc.get(&HeaderMap::new(), &uri), Err(Error::NoToken)));

        let mut claims = bob("acme");
        claims.expires_at = Some(now_unix() - 10);
        let issued = svc.set(claims).unwrap();
        let headers = cookie_headers(&issued.token, Some(&issued.claims.id));
        assert!(matches!(svc.get(&headers, &uri), Err(Error::Expired)));
    }
}
