//! Collaborator traits.
//!
//! The session core consumes transport, cryptography, and the encrypted
//! store through these seams. Production wiring provides HTTP- and
//! PGP-backed implementations; tests provide concrete mocks.

use async_trait::async_trait;

use vaultic_proto::{AccountId, ArmoredPrivateKey, ArmoredPublicKey, Passphrase};

use crate::error::{CryptoError, NetworkError, StoreError};
use crate::state::MfaMethod;

/// Network operations the handshake and session lifecycle depend on.
///
/// Implementations map transport failures (timeout, DNS, TLS, connection
/// loss, HTTP 4xx/5xx) into [`NetworkError`]; a 401/403 is surfaced
/// distinctly from a network-layer failure. Nothing here retries
/// silently.
#[async_trait]
pub trait NetworkOperations: Send + Sync {
    /// Fetch the server's armored PGP public key.
    async fn fetch_server_pgp_public_key(&self) -> Result<ArmoredPublicKey, NetworkError>;

    /// Fetch the server's armored RSA public key.
    async fn fetch_server_rsa_public_key(&self) -> Result<ArmoredPublicKey, NetworkError>;

    /// POST the armored challenge message for `account`; returns the
    /// server's armored encrypted response (opaque at this level).
    async fn post_sign_in(
        &self,
        account: AccountId,
        armored_challenge: &str,
    ) -> Result<String, NetworkError>;

    /// Invalidate the session server-side.
    async fn post_sign_out(&self, refresh_token: &str) -> Result<(), NetworkError>;

    /// Exchange the refresh token for a fresh token pair; returns the
    /// JSON token-pair payload.
    async fn post_refresh(
        &self,
        account: AccountId,
        refresh_token: &str,
    ) -> Result<String, NetworkError>;

    /// Submit an MFA verification for `account`.
    async fn post_mfa_verify(
        &self,
        account: AccountId,
        method: &MfaMethod,
    ) -> Result<(), NetworkError>;
}

/// PGP/RSA primitives the handshake depends on.
///
/// Consumed, not reimplemented: the session core treats these as opaque
/// and only sequences them.
#[async_trait]
pub trait CryptoOperations: Send + Sync {
    /// Encrypt `plaintext` for `public_key` and sign it with the private
    /// key unlocked by `passphrase`; returns the armored message.
    async fn pgp_encrypt_and_sign(
        &self,
        plaintext: &[u8],
        passphrase: &Passphrase,
        private_key: &ArmoredPrivateKey,
        public_key: &ArmoredPublicKey,
    ) -> Result<String, CryptoError>;

    /// Decrypt `armored_message` with the private key unlocked by
    /// `passphrase` and verify its signature against `public_key`;
    /// returns the plaintext bytes.
    async fn pgp_decrypt_and_verify(
        &self,
        armored_message: &str,
        passphrase: &Passphrase,
        private_key: &ArmoredPrivateKey,
        public_key: &ArmoredPublicKey,
    ) -> Result<Vec<u8>, CryptoError>;

    /// Verify an RSA signature over `data` with the DER-encoded public
    /// key. Returns `Ok(false)` for a cleanly failing signature; `Err`
    /// only when the primitive itself cannot run.
    fn rsa_verify_signature(
        &self,
        data: &[u8],
        signature: &[u8],
        public_key_der: &[u8],
    ) -> Result<bool, CryptoError>;
}

/// The account's local encrypted store.
///
/// The derived database key and refresh token are the only values implied
/// to persist across restarts, and both live behind this seam; the
/// session core itself persists nothing.
#[async_trait]
pub trait VaultStore: Send + Sync {
    /// Handle to an open store connection. Cloning must be cheap; the
    /// gate caches one per account.
    type Connection: Clone + Send + Sync;

    /// Derive the database key for `account`. Requires an authorized
    /// session; the gate enforces that precondition.
    async fn derive_database_key(&self, account: AccountId) -> Result<Vec<u8>, StoreError>;

    /// Open a connection to the account's encrypted store.
    async fn open_connection(
        &self,
        account: AccountId,
        key: &[u8],
    ) -> Result<Self::Connection, StoreError>;
}
