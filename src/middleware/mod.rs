//! Axum integration: router, extractor and HTTP errors.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tokengate::middleware::{AuthRoutes, AuthUser};
//!
//! let app = axum::Router::new()
//!     .route("/me", get(|user: AuthUser| async move { Json(user.user().clone()) }))
//!     .with_state(tokens.clone())
//!     .merge(AuthRoutes::new(tokens).with_provider(provider).into_router());
//! ```

mod error;
mod extractor;
mod routes;

pub use error::AuthError;
pub use extractor::AuthUser;
pub use routes::AuthRoutes;
