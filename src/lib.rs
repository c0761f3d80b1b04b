#![doc = include_str!("../README.md")]

pub mod error;
pub mod ident;
pub mod middleware;
pub mod providers;
pub mod token;
pub mod types;

// Re-exports for convenient access
pub use error::{BoxError, Error};
pub use middleware::{AuthError, AuthRoutes, AuthUser};
pub use token::{
    AudienceReader, ClaimsUpdater, Delivery, IssuedToken, SecretReader, StaticSecret, TokenConfig,
    TokenService,
};
pub use types::{Claims, Handshake, User};
