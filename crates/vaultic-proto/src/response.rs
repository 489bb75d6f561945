//! Sign-in response payload parsing and the verification-token/expiry
//! contract.

use serde::{Deserialize, Serialize};

use crate::challenge::SignInChallenge;
use crate::error::{ProtocolError, Result};

/// The PGP-decrypted-and-verified JSON body of a sign-in response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInResponse {
    /// The access token, a JWT string signed by the server RSA key.
    pub access_token: String,
    /// Opaque refresh token.
    pub refresh_token: String,
    /// Echo of the challenge's verification token.
    pub verification_token: String,
}

impl SignInResponse {
    /// Parse the decrypted UTF-8 JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedResponse`] on any decode failure;
    /// terminal for the attempt.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| ProtocolError::MalformedResponse {
            reason: e.to_string(),
        })
    }

    /// Enforce the response/challenge binding, in order: the echoed
    /// verification token must equal the one sent, then the challenge
    /// validity window must not have elapsed (`now < expiration`).
    ///
    /// # Errors
    ///
    /// [`ProtocolError::VerificationTokenMismatch`] or
    /// [`ProtocolError::ChallengeExpired`]. Both are security failures;
    /// the challenge is never reused after either.
    pub fn verify_against(&self, challenge: &SignInChallenge, now: u64) -> Result<()> {
        if self.verification_token != challenge.verification_token.to_string() {
            return Err(ProtocolError::VerificationTokenMismatch);
        }
        if challenge.is_expired(now) {
            return Err(ProtocolError::ChallengeExpired {
                expired_at: challenge.expiration,
                now,
            });
        }
        Ok(())
    }
}
