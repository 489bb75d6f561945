//! The session token pair.

use std::fmt;

use vaultic_proto::Jwt;

/// The token pair returned by a successful handshake.
///
/// Owned exclusively by the session actor: replaced wholesale on every
/// successful handshake or refresh, cleared entirely on sign-out. Expiry
/// is computed on demand from the JWT payload, never cached.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionTokens {
    /// The parsed, signature-verified access token.
    pub access_token: Jwt,
    /// Opaque refresh token.
    pub refresh_token: String,
}

impl SessionTokens {
    /// Whether the access token's expiry claim has elapsed as of `now`.
    ///
    /// Pure function of `(token, now)`; callers re-evaluate this on every
    /// use rather than caching the answer.
    #[must_use]
    pub fn is_access_token_expired(&self, now: u64) -> bool {
        self.access_token.is_expired(now)
    }
}

// The refresh token is a bearer credential; keep it out of Debug output.
impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens")
            .field("access_token_exp", &self.access_token.claims().exp)
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}
