//! Token minting, verification and cookie transport.
//!
//! [`TokenService`] is the single place where tokens are signed and checked.
//! Every login provider goes through it, so all of them share the same
//! token contract, secrets and cookie layout.

mod config;
mod cookies;
mod service;
mod traits;

pub use config::TokenConfig;
pub use cookies::{Delivery, IssuedToken};
pub use service::{SENTINEL_AUDIENCE, TokenService};
pub use traits::{AudienceReader, ClaimsUpdater, SecretReader, StaticSecret};
