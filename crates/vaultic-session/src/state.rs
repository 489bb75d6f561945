//! The session state machine.
//!
//! Exactly one [`SessionState`] value is live at a time, owned by the
//! session actor; transitions are the only way it changes. Consumers
//! observing the update stream must re-check current state before acting
//! on it — state may have moved again between notification and read.

use vaultic_proto::AccountId;

/// Which factors a pending MFA step accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MfaContext {
    /// Provider hints from the server (e.g. `totp`, `yubikey`).
    pub providers: Vec<String>,
}

impl MfaContext {
    /// Context accepting the given providers.
    #[must_use]
    pub fn new(providers: Vec<String>) -> Self {
        Self { providers }
    }
}

/// A second-factor verification input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MfaMethod {
    /// Time-based one-time password.
    Totp(String),
    /// Hardware-token OTP.
    HardwareToken(String),
    /// Single-use backup code.
    BackupCode(String),
}

/// Session lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No session. Remembers the last used account, when known, so the
    /// UI can preselect it.
    None {
        /// Account of the most recently closed session, if any.
        last_used_account: Option<AccountId>,
    },

    /// A stored account is selected but not yet unlocked.
    AuthorizationRequired {
        /// The selected account.
        account: AccountId,
    },

    /// Fully authorized session.
    Authorized {
        /// The authorized account.
        account: AccountId,
    },

    /// Primary authorization succeeded but the server requires a second
    /// factor before access is granted.
    AuthorizedMfaRequired {
        /// The authorized account.
        account: AccountId,
        /// What the pending MFA step accepts.
        context: MfaContext,
    },
}

impl SessionState {
    /// Initial state: no session, no remembered account.
    #[must_use]
    pub fn initial() -> Self {
        Self::None {
            last_used_account: None,
        }
    }

    /// The account a session exists for, in any pre- or post-authorization
    /// state.
    #[must_use]
    pub fn account(&self) -> Option<AccountId> {
        match self {
            Self::None { .. } => None,
            Self::AuthorizationRequired { account }
            | Self::Authorized { account }
            | Self::AuthorizedMfaRequired { account, .. } => Some(*account),
        }
    }

    /// Whether primary authorization has completed (MFA may still be
    /// pending).
    #[must_use]
    pub fn is_authorized(&self) -> bool {
        matches!(
            self,
            Self::Authorized { .. } | Self::AuthorizedMfaRequired { .. }
        )
    }
}
