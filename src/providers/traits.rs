use std::future::Future;
use std::pin::Pin;

use axum::http::HeaderMap;

use crate::error::BoxError;

/// Consumer-provided credential check for [`DirectProvider`](super::DirectProvider).
///
/// # Example
///
/// ```rust,ignore
/// impl CredChecker for MyUsers {
///     async fn check(&self, user: &str, password: &str) -> Result<bool, BoxError> {
///         let Some(hash) = self.repo.password_hash(user).await? else {
///             return Ok(false);
///         };
///         Ok(verify(password, &hash))
///     }
/// }
/// ```
pub trait CredChecker: Send + Sync + 'static {
    /// `Ok(false)` means wrong credentials; `Err` means the check itself failed.
    fn check(
        &self,
        user: &str,
        password: &str,
    ) -> impl Future<Output = Result<bool, BoxError>> + Send;
}

/// Consumer-provided delivery of confirmation messages (email, chat, ...).
pub trait Sender: Send + Sync + 'static {
    fn send(&self, address: &str, text: &str) -> impl Future<Output = Result<(), BoxError>> + Send;
}

/// Derives the hashed part of a user id from the login name and request
/// headers, for [`DirectProvider::with_user_id_func`](super::DirectProvider::with_user_id_func).
pub type UserIdFunc = dyn Fn(&str, &HeaderMap) -> String + Send + Sync;

/// Adapts a synchronous closure into a [`CredChecker`].
pub struct CredCheckerFunc<F>(F);

impl<F> CredCheckerFunc<F>
where
    F: Fn(&str, &str) -> Result<bool, BoxError> + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> CredChecker for CredCheckerFunc<F>
where
    F: Fn(&str, &str) -> Result<bool, BoxError> + Send + Sync + 'static,
{
    async fn check(&self, user: &str, password: &str) -> Result<bool, BoxError> {
        (self.0)(user, password)
    }
}

/// Adapts a synchronous closure into a [`Sender`].
pub struct SenderFunc<F>(F);

impl<F> SenderFunc<F>
where
    F: Fn(&str, &str) -> Result<(), BoxError> + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Sender for SenderFunc<F>
where
    F: Fn(&str, &str) -> Result<(), BoxError> + Send + Sync + 'static,
{
    async fn send(&self, address: &str, text: &str) -> Result<(), BoxError> {
        (self.0)(address, text)
    }
}

/// Object-safe wrapper for CredChecker (needed for Arc<dyn>).
pub(super) trait CredCheckerDyn: Send + Sync {
    fn check_dyn<'a>(
        &'a self,
        user: &'a str,
        password: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, BoxError>> + Send + 'a>>;
}

impl<T: CredChecker> CredCheckerDyn for T {
    fn check_dyn<'a>(
        &'a self,
        user: &'a str,
        password: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, BoxError>> + Send + 'a>> {
        Box::pin(self.check(user, password))
    }
}

/// Object-safe wrapper for Sender (needed for Arc<dyn>).
pub(super) trait SenderDyn: Send + Sync {
    fn send_dyn<'a>(
        &'a self,
        address: &'a str,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send + 'a>>;
}

impl<T: Sender> SenderDyn for T {
    fn send_dyn<'a>(
        &'a self,
        address: &'a str,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send + 'a>> {
        Box::pin(self.send(address, text))
    }
}
