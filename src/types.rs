use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Separator between user and address inside a handshake id.
pub const HANDSHAKE_SEPARATOR: &str = "::";

/// Authenticated identity embedded into session tokens.
///
/// `id` is namespaced by provider (`<provider>_<hash>`), so the same login on
/// two providers never collides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, serde_json::Value>,
}

impl User {
    #[must_use]
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_picture(mut self, picture: impl Into<String>) -> Self {
        self.picture = Some(picture.into());
        self
    }

    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }
}

/// Payload of a confirmation (handshake) token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

impl Handshake {
    /// Builds the composite `<user>::<address>` id.
    ///
    /// Returns `None` when either part is empty or contains the separator,
    /// since such an id could not be split back unambiguously.
    #[must_use]
    pub fn confirmation_id(user: &str, address: &str) -> Option<String> {
        let valid = |s: &str| !s.is_empty() && !s.contains(HANDSHAKE_SEPARATOR);
        (valid(user) && valid(address)).then(|| format!("{user}{HANDSHAKE_SEPARATOR}{address}"))
    }

    /// Splits the id into `(user, address)`.
    ///
    /// Exactly one separator and two non-empty parts are required.
    #[must_use]
    pub fn split_id(&self) -> Option<(&str, &str)> {
        let mut parts = self.id.split(HANDSHAKE_SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(user), Some(address), None) if !user.is_empty() && !address.is_empty() => {
                Some((user, address))
            }
            _ => None,
        }
    }
}

/// Signed token payload.
///
/// Standard JWT claim names are used on the wire (`jti`, `iss`, `aud`, ...);
/// timestamps are unix seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(rename = "jti", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "iss", default, skip_serializing_if = "String::is_empty")]
    pub issuer: String,
    #[serde(rename = "aud", default, skip_serializing_if = "String::is_empty")]
    pub audience: String,
    #[serde(rename = "iat", default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<i64>,
    #[serde(rename = "exp", default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(rename = "nbf", default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<i64>,
    #[serde(rename = "sess_only", default, skip_serializing_if = "std::ops::Not::not")]
    pub session_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handshake: Option<Handshake>,
}

impl Claims {
    /// Session claims for an authenticated user.
    #[must_use]
    pub fn for_user(user: User, id: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            user: Some(user),
            id: id.into(),
            audience: audience.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_session_only(mut self, session_only: bool) -> Self {
        self.session_only = session_only;
        self
    }

    /// Whether this token is a confirmation token rather than a session.
    #[must_use]
    pub fn is_handshake(&self) -> bool {
        self.handshake.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmation_id_joins_with_separator() {
        assert_eq!(
            Handshake::confirmation_id("alice", "a@example.com").as_deref(),
            Some("alice::a@example.com")
        );
    }

    #[test]
    fn confirmation_id_refuses_ambiguous_parts() {
        assert!(Handshake::confirmation_id("al::ice", "a@example.com").is_none());
        assert!(Handshake::confirmation_id("alice", "a::b").is_none());
        assert!(Handshake::confirmation_id("", "a@example.com").is_none());
        assert!(Handshake::confirmation_id("alice", "").is_none());
    }

    #[test]
    fn split_id_requires_exactly_one_separator() {
        let hs = |id: &str| Handshake {
            id: id.into(),
            ..Handshake::default()
        };

        assert_eq!(
            hs("alice::a@example.com").split_id(),
            Some(("alice", "a@example.com"))
        );
        assert_eq!(hs("alice").split_id(), None);
        assert_eq!(hs("alice::a::b").split_id(), None);
        assert_eq!(hs("::a@example.com").split_id(), None);
        assert_eq!(hs("alice::").split_id(), None);
    }

    #[test]
    fn claims_use_jwt_field_names() {
        let claims = Claims::for_user(User::new("bob", "local_123"), "tid", "acme")
            .with_session_only(true);
        let json = serde_json::to_value(&claims).unwrap();

        assert_eq!(json["jti"], "tid");
        assert_eq!(json["aud"], "acme");
        assert_eq!(json["sess_only"], true);
        assert_eq!(json["user"]["name"], "bob");
        assert!(json.get("handshake").is_none());
        assert!(json.get("exp").is_none());
    }

    #[test]
    fn user_skips_empty_profile_fields() {
        let json = serde_json::to_string(&User::new("bob", "x_1")).unwrap();
        assert_eq!(json, r#"{"name":"bob","id":"x_1"}"#);
    }
}
