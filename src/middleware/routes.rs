use std::collections::HashSet;
use std::sync::Arc;

use axum::Router;

use crate::error::Error;
use crate::providers::{Provider, logout_router};
use crate::token::TokenService;

/// Builder for the authentication router.
///
/// Every provider is mounted under `{auth_path}/{name}`; a shared
/// `{auth_path}/logout` clears the session cookies.
///
/// ```rust,ignore
/// let auth = AuthRoutes::new(tokens.clone())
///     .with_path("/auth")
///     .with_provider(DirectProvider::new("local", tokens.clone()).with_checker(checker))
///     .into_router();
/// ```
pub struct AuthRoutes {
    tokens: Arc<TokenService>,
    auth_path: String,
    providers: Vec<Arc<dyn Provider>>,
}

impl AuthRoutes {
    #[must_use]
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self {
            tokens,
            auth_path: "/auth".into(),
            providers: Vec::new(),
        }
    }

    /// Route prefix (default: `/auth`). `"/"` mounts at the root.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        let path = path.trim_matches('/');
        self.auth_path = if path.is_empty() {
            String::new()
        } else {
            format!("/{path}")
        };
        self
    }

    #[must_use]
    pub fn with_provider(mut self, provider: impl Provider) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Build the router.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty, non path-safe or duplicate
    /// provider name.
    pub fn try_into_router(self) -> Result<Router, Error> {
        self.build(true)
    }

    /// Build the router, skipping (and logging) providers with an invalid or
    /// duplicate name.
    #[must_use]
    pub fn into_router(self) -> Router {
        self.build(false).unwrap_or_default()
    }

    fn build(self, strict: bool) -> Result<Router, Error> {
        let mut seen = HashSet::new();
        let mut router = mount(Router::new(), &self.auth_path, logout_router(self.tokens));

        for provider in self.providers {
            let name = provider.name().to_string();
            let problem = if !is_valid_name(&name) {
                Some("invalid")
            } else if !seen.insert(name.clone()) {
                Some("duplicate")
            } else {
                None
            };

            if let Some(problem) = problem {
                if strict {
                    return Err(Error::Config(format!("{problem} provider name '{name}'")));
                }
                tracing::error!(provider = %name, "Skipping auth provider with {problem} name");
                continue;
            }

            tracing::debug!(provider = %name, "Mounting auth provider");
            let path = format!("{}/{name}", self.auth_path);
            router = mount(router, &path, provider.routes());
        }

        Ok(router)
    }
}

/// Names become a single path segment: ASCII letters, digits, `-` and `_`.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "logout"
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
}

fn mount(router: Router, path: &str, routes: Router) -> Router {
    if path.is_empty() {
        router.merge(routes)
    } else {
        router.nest(path, routes)
    }
}
