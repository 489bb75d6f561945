//! Protocol error taxonomy.
//!
//! Every variant is terminal for the sign-in attempt it occurred in: the
//! pipeline never retries a challenge, and verification failures grant no
//! partial trust. Messages carry the failing step but never key material
//! or token contents.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while building or verifying the sign-in exchange.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The challenge record could not be serialized to JSON.
    #[error("failed to encode sign-in challenge: {0}")]
    Encode(#[from] serde_json::Error),

    /// The decrypted response was not a valid response payload.
    #[error("failed to parse sign-in response payload: {reason}")]
    MalformedResponse {
        /// Parser diagnostic, safe to log.
        reason: String,
    },

    /// The access token is not a structurally valid JWT.
    #[error("malformed JWT: {reason}")]
    MalformedJwt {
        /// Parser diagnostic, safe to log.
        reason: String,
    },

    /// The JWT payload carries no expiry claim.
    #[error("JWT payload is missing the exp claim")]
    MissingExpiryClaim,

    /// The response echoed a verification token other than the one sent.
    ///
    /// Treated as a security failure, not a transient one.
    #[error("verification token in response does not match the challenge")]
    VerificationTokenMismatch,

    /// The challenge validity window elapsed before verification.
    #[error("challenge expired at {expired_at} (now {now})")]
    ChallengeExpired {
        /// Unix timestamp the challenge expired at.
        expired_at: u64,
        /// Unix timestamp verification was attempted at.
        now: u64,
    },

    /// The server RSA public key could not be decoded from its armor.
    #[error("invalid armored RSA public key: {reason}")]
    InvalidRsaKey {
        /// Decoder diagnostic, safe to log.
        reason: String,
    },

    /// The RSA signature over the JWT payload did not verify.
    #[error("JWT signature rejected by server RSA key")]
    SignatureRejected,
}
