//! Session error taxonomy.
//!
//! Three collaborator error enums (network, crypto, store) plus the
//! umbrella [`SessionError`]. The session-state variants (`SessionMissing`,
//! `AuthorizationRequired`, `MfaRequired`) are expected control-flow
//! signals callers branch on for navigation; the rest are genuine
//! failures. Nothing here ever carries key material or token values.

use thiserror::Error;
use vaultic_proto::{AccountId, ProtocolError};

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Transport failures surfaced by the network collaborator.
///
/// Server rejections (4xx/5xx) are distinct from network-layer failures
/// so callers can redirect to re-authorization rather than retry.
#[derive(Debug, Clone, Error)]
pub enum NetworkError {
    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// Could not reach the server (DNS, connection refused, connection loss).
    #[error("cannot reach server: {0}")]
    ConnectionFailed(String),

    /// TLS negotiation or certificate failure.
    #[error("TLS failure: {0}")]
    Tls(String),

    /// HTTP 401: credentials not accepted.
    #[error("server rejected credentials (401)")]
    Unauthorized,

    /// HTTP 403: access forbidden for this account.
    #[error("server forbade access (403)")]
    Forbidden,

    /// Any other HTTP-level rejection.
    #[error("server rejected request ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Server-provided diagnostic, safe to log.
        message: String,
    },
}

/// Failures from the PGP/RSA crypto collaborator.
///
/// Each variant names the failing step for diagnostics; terminal for the
/// attempt, never retried.
#[derive(Debug, Clone, Error)]
pub enum CryptoError {
    /// Encrypting and signing the challenge failed.
    #[error("PGP encrypt-and-sign failed: {0}")]
    EncryptSign(String),

    /// Decrypting or verifying the response failed.
    #[error("PGP decrypt-and-verify failed: {0}")]
    DecryptVerify(String),

    /// The RSA verification primitive itself errored (distinct from a
    /// signature that cleanly fails to verify).
    #[error("RSA signature verification errored: {0}")]
    RsaVerify(String),
}

/// Failures from the encrypted store collaborator.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The database key could not be derived for the account.
    #[error("database key derivation failed: {0}")]
    KeyDerivation(String),

    /// Opening the store connection failed.
    #[error("failed to open store connection: {0}")]
    OpenConnection(String),
}

/// Umbrella error for the session core.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No session exists. Carries the last used account when one is
    /// known, for UI redirection.
    #[error("session missing")]
    SessionMissing {
        /// Last account a session existed for, if any.
        account: Option<AccountId>,
    },

    /// A session exists but is not yet unlocked; re-authentication is
    /// required for this account.
    #[error("authorization required for account {account}")]
    AuthorizationRequired {
        /// The account needing authorization.
        account: AccountId,
    },

    /// The session is authorized but withheld pending MFA completion.
    #[error("MFA required for account {account}")]
    MfaRequired {
        /// The account needing MFA verification.
        account: AccountId,
    },

    /// Refresh was requested with no refresh token held.
    #[error("no refresh token held for the current session")]
    NoRefreshToken,

    /// Wire-protocol or verification failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Transport failure from the network collaborator.
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Crypto collaborator failure.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Store collaborator failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SessionError {
    /// Whether this is an expected control-flow signal rather than a
    /// genuine failure. Callers recover these locally (redirect to
    /// sign-in or the MFA screen) instead of logging them as bugs.
    #[must_use]
    pub fn is_session_state_signal(&self) -> bool {
        matches!(
            self,
            Self::SessionMissing { .. }
                | Self::AuthorizationRequired { .. }
                | Self::MfaRequired { .. }
        )
    }
}
