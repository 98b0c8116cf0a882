//! Shared-secret token check for GitLab webhooks.
//!
//! GitLab sends the secret configured on the webhook verbatim in the
//! `X-Gitlab-Token` header. There is no payload signature, so the check is a
//! plain equality test. It runs before the body is parsed.
//!
//! The comparison goes through HMAC-SHA256: both tokens are MACed under the
//! same key and the digests are compared with the library's constant-time
//! verification, so timing does not reveal how much of a guess was right.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the shared token.
pub const TOKEN_HEADER: &str = "x-gitlab-token";

/// Key for the comparison MAC. Secrecy is not required; it only has to be
/// the same on both sides of the comparison.
const COMPARE_KEY: &[u8] = b"pipeline-hook token comparison";

/// Why a request failed authentication.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// A secret is configured but the request carried no token header.
    #[error("missing X-Gitlab-Token header")]
    MissingToken,

    /// The token header does not match the configured secret.
    #[error("X-Gitlab-Token does not match the configured secret")]
    InvalidToken,
}

fn token_mac(token: &[u8]) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(COMPARE_KEY).expect("HMAC can take key of any size");
    mac.update(token);
    mac
}

/// Compares two tokens without an early exit on the first differing byte.
pub fn tokens_match(provided: &[u8], expected: &[u8]) -> bool {
    let expected_digest = token_mac(expected).finalize().into_bytes();
    token_mac(provided).verify_slice(&expected_digest).is_ok()
}

/// Checks a request's token against the configured secret.
///
/// With no secret configured every request passes, whatever it carries.
///
/// `provided` is the raw header value. HTTP header values are bytes, and a
/// secret with non-ASCII characters arrives as its UTF-8 encoding.
///
/// # Examples
///
/// ```
/// use pipeline_hook::webhooks::{AuthError, authenticate};
///
/// assert_eq!(authenticate(None, None), Ok(()));
/// assert_eq!(authenticate(Some("s3cret"), Some("s3cret".as_bytes())), Ok(()));
/// assert_eq!(authenticate(Some("s3cret"), None), Err(AuthError::MissingToken));
/// assert_eq!(authenticate(Some("s3cret"), Some("guess".as_bytes())), Err(AuthError::InvalidToken));
/// ```
pub fn authenticate(secret: Option<&str>, provided: Option<&[u8]>) -> Result<(), AuthError> {
    let Some(secret) = secret else {
        return Ok(());
    };
    let provided = provided.ok_or(AuthError::MissingToken)?;

    if tokens_match(provided, secret.as_bytes()) {
        Ok(())
    } else {
        Err(AuthError::InvalidToken)
    }
}
