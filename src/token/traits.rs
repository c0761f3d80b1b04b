use secrecy::SecretString;

use crate::error::BoxError;
use crate::types::Claims;

/// Resolves the signing secret for an audience.
///
/// Called on every sign and verify. With per-audience secrets disabled the
/// audience is always [`SENTINEL_AUDIENCE`](super::SENTINEL_AUDIENCE).
/// Implementations that hit the network should cache internally.
///
/// Closures implement this trait:
///
/// ```rust,ignore
/// let reader = |aud: &str| -> Result<SecretString, BoxError> {
///     Ok(SecretString::from(format!("secret-for-{aud}")))
/// };
/// ```
pub trait SecretReader: Send + Sync + 'static {
    fn get(&self, audience: &str) -> Result<SecretString, BoxError>;
}

impl<F> SecretReader for F
where
    F: Fn(&str) -> Result<SecretString, BoxError> + Send + Sync + 'static,
{
    fn get(&self, audience: &str) -> Result<SecretString, BoxError> {
        self(audience)
    }
}

/// One secret for every audience.
#[derive(Clone)]
pub struct StaticSecret(SecretString);

impl StaticSecret {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(SecretString::from(secret.into()))
    }
}

impl SecretReader for StaticSecret {
    fn get(&self, _audience: &str) -> Result<SecretString, BoxError> {
        Ok(self.0.clone())
    }
}

/// Supplies the audiences a deployment accepts.
///
/// Without a reader every audience is accepted.
pub trait AudienceReader: Send + Sync + 'static {
    fn get(&self) -> Result<Vec<String>, BoxError>;
}

impl AudienceReader for Vec<String> {
    fn get(&self) -> Result<Vec<String>, BoxError> {
        Ok(self.clone())
    }
}

impl<F> AudienceReader for F
where
    F: Fn() -> Result<Vec<String>, BoxError> + Send + Sync + 'static,
{
    fn get(&self) -> Result<Vec<String>, BoxError> {
        self()
    }
}

/// Hook to adjust claims right before signing.
pub trait ClaimsUpdater: Send + Sync + 'static {
    fn update(&self, claims: Claims) -> Claims;
}

impl<F> ClaimsUpdater for F
where
    F: Fn(Claims) -> Claims + Send + Sync + 'static,
{
    fn update(&self, claims: Claims) -> Claims {
        self(claims)
    }
}
