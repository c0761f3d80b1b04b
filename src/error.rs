/// Boxed error returned by consumer-provided collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("can't get secret: {0}")]
    SecretUnavailable(String),

    #[error("can't get allowed audiences: {0}")]
    AudienceUnavailable(String),

    #[error("aud rejected: {0}")]
    AudienceRejected(String),

    #[error("can't sign token: {0}")]
    Signing(String),

    #[error("invalid token signature")]
    Signature,

    #[error("unexpected signing method: {0}")]
    Algorithm(String),

    #[error("can't parse token: {0}")]
    Malformed(String),

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("token expired")]
    Expired,

    #[error("token not found")]
    NoToken,

    #[error("xsrf mismatch")]
    XsrfMismatch,

    #[error("OAuth2 {operation} failed{}: {detail}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    OAuth {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },

    #[cfg(feature = "oauth")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match e.kind() {
            ErrorKind::InvalidSignature => Self::Signature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                Self::Algorithm(e.to_string())
            }
            _ => Self::Malformed(e.to_string()),
        }
    }
}
