//! Session configuration.

use serde::Deserialize;

use vaultic_proto::CHALLENGE_VALIDITY_SECS;

/// Tunables for the session core.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Challenge validity window in seconds.
    ///
    /// Doubles as the effective handshake timeout: responses landing
    /// after this window are rejected during verification.
    #[serde(default = "default_challenge_validity")]
    pub challenge_validity_secs: u64,
}

fn default_challenge_validity() -> u64 {
    CHALLENGE_VALIDITY_SECS
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            challenge_validity_secs: CHALLENGE_VALIDITY_SECS,
        }
    }
}

impl SessionConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let challenge_validity_secs = std::env::var("VAULTIC_CHALLENGE_VALIDITY_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(CHALLENGE_VALIDITY_SECS);

        Self {
            challenge_validity_secs,
        }
    }
}
