use rand::Rng;
use sha1::{Digest, Sha1};

/// Hashes a provider-specific key into the hex form used in user ids.
///
/// `HEX(SHA1(value))`. A value that already looks like a SHA-1 hex digest is
/// returned as is, so hashing twice is harmless.
#[must_use]
pub fn hash_id(value: &str) -> String {
    if is_sha1_hex(value) {
        return value.to_string();
    }
    hex::encode(Sha1::digest(value.as_bytes()))
}

/// Namespaced user id: `<provider>_<hash_id(key)>`.
#[must_use]
pub fn user_id(provider: &str, key: &str) -> String {
    format!("{provider}_{}", hash_id(key))
}

/// Generates a random token id (`jti`), also used as the XSRF value.
///
/// Returns a 40-character lowercase hex string (32 random bytes → SHA-1).
#[must_use]
pub fn random_token_id() -> String {
    let random_bytes: [u8; 32] = rand::rng().random();
    hex::encode(Sha1::digest(random_bytes))
}

fn is_sha1_hex(value: &str) -> bool {
    value.len() == 40 && value.bytes().all(|b| b.is_ascii_hexdigit())
}
