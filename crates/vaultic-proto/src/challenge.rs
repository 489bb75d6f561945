//! Sign-in challenge construction.
//!
//! The challenge is a nonce-bearing JSON record that the client encrypts
//! and signs for the server; the server echoes the verification token in
//! its response to bind the two together and prevent replay.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Challenge validity window in seconds (120 seconds).
///
/// Doubles as the effective handshake timeout: a response arriving after
/// this window is rejected even if cryptographically valid.
pub const CHALLENGE_VALIDITY_SECS: u64 = 120;

/// Protocol version carried in every challenge.
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// The sign-in challenge payload, serialized to UTF-8 JSON before being
/// PGP-encrypted-and-signed into an armored message.
///
/// Single-use: the verification token must be generated fresh per attempt
/// and must match in the server's response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInChallenge {
    /// Protocol version string.
    pub version: String,
    /// Fresh random nonce echoed by the server.
    pub verification_token: Uuid,
    /// Server domain this challenge is addressed to.
    pub domain: String,
    /// Unix timestamp the challenge stops being valid at.
    pub expiration: u64,
}

impl SignInChallenge {
    /// Build a fresh challenge for `domain`, valid for `validity_secs`
    /// from `now`.
    #[must_use]
    pub fn new(domain: impl Into<String>, now: u64, validity_secs: u64) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            verification_token: Uuid::new_v4(),
            domain: domain.into(),
            expiration: now + validity_secs,
        }
    }

    /// Serialize to the UTF-8 JSON bytes that get encrypted and signed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ProtocolError::Encode`] when serialization fails;
    /// this is terminal for the attempt.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Whether the validity window has elapsed.
    ///
    /// `expiration == now` counts as expired: validity requires
    /// `now < expiration` strictly.
    #[must_use]
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expiration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_challenge_shape() {
        let challenge = SignInChallenge::new("example.org", 1_700_000_000, CHALLENGE_VALIDITY_SECS);
        assert_eq!(challenge.version, PROTOCOL_VERSION);
        assert_eq!(challenge.domain, "example.org");
        assert_eq!(challenge.expiration, 1_700_000_000 + 120);
    }

    #[test]
    fn test_verification_token_fresh_per_attempt() {
        let a = SignInChallenge::new("example.org", 0, 120);
        let b = SignInChallenge::new("example.org", 0, 120);
        assert_ne!(a.verification_token, b.verification_token);
    }

    #[test]
    fn test_encode_roundtrip() {
        let challenge = SignInChallenge::new("example.org", 1_700_000_000, 120);
        let bytes = challenge.encode().unwrap();
        let parsed: SignInChallenge = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed, challenge);
    }

    #[test]
    fn test_encoded_field_names() {
        let challenge = SignInChallenge::new("example.org", 1_700_000_000, 120);
        let json = String::from_utf8(challenge.encode().unwrap()).unwrap();
        assert!(json.contains("\"version\""));
        assert!(json.contains("\"verification_token\""));
        assert!(json.contains("\"domain\""));
        assert!(json.contains("\"expiration\""));
    }

    #[test]
    fn test_expiry_boundary() {
        let challenge = SignInChallenge::new("example.org", 1_000, 120);
        assert!(!challenge.is_expired(1_119));
        assert!(challenge.is_expired(1_120));
        assert!(challenge.is_expired(1_121));
    }
}
