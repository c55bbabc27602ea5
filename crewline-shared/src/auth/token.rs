//! Invitation token generation and hashing
//!
//! The plaintext token is shown to the inviter once and then forgotten. The
//! store only ever sees the SHA-256 hex digest, so a leaked invitations table
//! does not leak usable tokens.
//!
//! # Token Format
//!
//! `inv_` followed by 40 base62 characters (44 chars total).
//!
//! # Example
//!
//! ```
//! use crewline_shared::auth::token::{generate_invitation_token, hash_token, is_well_formed};
//!
//! let (token, hash) = generate_invitation_token();
//! assert!(token.starts_with("inv_"));
//! assert_eq!(hash, hash_token(&token));
//! assert!(is_well_formed(&token));
//! ```

use rand::Rng;
use sha2::{Digest, Sha256};

const TOKEN_RANDOM_LENGTH: usize = 40;

const TOKEN_PREFIX: &str = "inv_";

/// Total length of an invitation token
pub const TOKEN_LENGTH: usize = TOKEN_PREFIX.len() + TOKEN_RANDOM_LENGTH;

/// Generates a new invitation token
///
/// # Returns
///
/// Tuple of (plaintext_token, sha256_hex)
pub fn generate_invitation_token() -> (String, String) {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    let random_part: String = (0..TOKEN_RANDOM_LENGTH)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();

    let token = format!("{TOKEN_PREFIX}{random_part}");
    let hash = hash_token(&token);
    (token, hash)
}

/// Hex-encoded SHA-256 of a token (64 characters)
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// True if `token` has the shape of an invitation token
///
/// Cheap pre-check before touching the store.
pub fn is_well_formed(token: &str) -> bool {
    token.len() == TOKEN_LENGTH
        && token.starts_with(TOKEN_PREFIX)
        && token[TOKEN_PREFIX.len()..]
            .chars()
            .all(|c| c.is_ascii_alphanumeric())
}
