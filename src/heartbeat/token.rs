//! Shared-secret token check for inbound heartbeats.

use subtle::ConstantTimeEq;

use crate::config::Secret;

/// Header carrying the shared token on every heartbeat request.
pub const AUTH_HEADER: &str = "x-auth-token";

/// Whether `presented` exactly matches the configured secret.
///
/// Case-sensitive byte equality; a missing token never matches. The
/// comparison runs in constant time for equal-length inputs.
pub fn is_authorized(presented: Option<&str>, secret: &Secret) -> bool {
    match presented {
        Some(token) => token.as_bytes().ct_eq(secret.expose().as_bytes()).into(),
        None => false,
    }
}
