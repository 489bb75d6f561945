//! Mock collaborators shared by the service and gate tests.
//!
//! The mock crypto scheme is deliberately trivial but structurally
//! faithful: "encryption" is a reversible armor wrapper so round-trips
//! are observable, and the fake RSA signature is a keyed checksum over
//! every byte of the signed payload, so flipping any byte of payload or
//! signature fails verification.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use tokio::sync::Notify;
use uuid::Uuid;

use vaultic_proto::{
    base64_url_decode, base64_url_encode, current_timestamp, AccountId, ArmoredPrivateKey,
    ArmoredPublicKey, Passphrase, SignInChallenge,
};

use crate::error::{CryptoError, NetworkError, StoreError};
use crate::state::MfaMethod;
use crate::traits::{CryptoOperations, NetworkOperations, VaultStore};

/// Deterministic stand-in for an RSA signature: a keyed FNV-1a checksum.
/// Any single-byte change to data, key, or signature breaks the match.
pub fn fake_rsa_sign(data: &[u8], key_der: &[u8]) -> Vec<u8> {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &byte in key_der.iter().chain(data.iter()) {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash.to_be_bytes().to_vec()
}

/// Assemble a signed mock JWT expiring at `exp`.
pub fn make_signed_jwt(exp: u64, signing_key: &[u8]) -> String {
    let header = base64_url_encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let claims = base64_url_encode(format!(r#"{{"exp":{exp}}}"#).as_bytes());
    let signed_payload = format!("{header}.{claims}");
    let signature = fake_rsa_sign(signed_payload.as_bytes(), signing_key);
    format!("{signed_payload}.{}", base64_url_encode(&signature))
}

// ============================================================================
// Crypto
// ============================================================================

/// Reversible mock PGP plus the fake RSA verifier.
#[derive(Default)]
pub struct MockCrypto {
    /// When set, encrypt/decrypt fail unless the passphrase matches.
    pub expected_passphrase: Option<String>,
}

const ARMOR_PREFIX: &str = "armored:";

impl MockCrypto {
    fn check_passphrase(&self, passphrase: &Passphrase, step: &str) -> Result<(), CryptoError> {
        if let Some(expected) = &self.expected_passphrase {
            if passphrase.expose() != expected {
                return Err(match step {
                    "encrypt" => CryptoError::EncryptSign("wrong passphrase".into()),
                    _ => CryptoError::DecryptVerify("wrong passphrase".into()),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CryptoOperations for MockCrypto {
    async fn pgp_encrypt_and_sign(
        &self,
        plaintext: &[u8],
        passphrase: &Passphrase,
        _private_key: &ArmoredPrivateKey,
        _public_key: &ArmoredPublicKey,
    ) -> Result<String, CryptoError> {
        self.check_passphrase(passphrase, "encrypt")?;
        Ok(format!("{ARMOR_PREFIX}{}", base64_url_encode(plaintext)))
    }

    async fn pgp_decrypt_and_verify(
        &self,
        armored_message: &str,
        passphrase: &Passphrase,
        _private_key: &ArmoredPrivateKey,
        _public_key: &ArmoredPublicKey,
    ) -> Result<Vec<u8>, CryptoError> {
        self.check_passphrase(passphrase, "decrypt")?;
        let body = armored_message
            .strip_prefix(ARMOR_PREFIX)
            .ok_or_else(|| CryptoError::DecryptVerify("not an armored message".into()))?;
        base64_url_decode(body).map_err(|e| CryptoError::DecryptVerify(e.to_string()))
    }

    fn rsa_verify_signature(
        &self,
        data: &[u8],
        signature: &[u8],
        public_key_der: &[u8],
    ) -> Result<bool, CryptoError> {
        Ok(fake_rsa_sign(data, public_key_der) == signature)
    }
}

/// Unwrap a mock-armored message back to its plaintext bytes.
pub fn unarmor(armored: &str) -> Vec<u8> {
    let body = armored.strip_prefix(ARMOR_PREFIX).expect("mock armor prefix");
    base64_url_decode(body).expect("mock armor base64")
}

// ============================================================================
// Network
// ============================================================================

/// Scripted server: echoes challenges into signed token responses and
/// records every call in order.
pub struct MockNetwork {
    /// Key the mock server signs JWTs with.
    pub rsa_signing_key: Vec<u8>,
    /// Key the mock server advertises to clients. Equal to
    /// `rsa_signing_key` unless a test wants verification to fail.
    pub advertised_rsa_der: Vec<u8>,
    /// Echo a random verification token instead of the challenge's.
    pub echo_wrong_token: bool,
    /// Offset of the issued JWT's expiry from now, in seconds.
    pub jwt_exp_offset: i64,
    /// Sign-out result override, for best-effort teardown tests.
    pub sign_out_fails: bool,
    /// MFA verification result override.
    pub mfa_rejects: bool,
    /// Ordered log of calls, e.g. `sign_in:<account>`.
    pub events: Mutex<Vec<String>>,
    /// Notified when `post_sign_in` is reached, for cancellation tests.
    pub sign_in_reached: Arc<Notify>,
    /// When set, `post_sign_in` never completes.
    pub stall_sign_in: bool,
}

pub const MOCK_RSA_DER: &[u8] = b"mock-server-rsa-der-v1";

impl Default for MockNetwork {
    fn default() -> Self {
        Self {
            rsa_signing_key: MOCK_RSA_DER.to_vec(),
            advertised_rsa_der: MOCK_RSA_DER.to_vec(),
            echo_wrong_token: false,
            jwt_exp_offset: 600,
            sign_out_fails: false,
            mfa_rejects: false,
            events: Mutex::new(Vec::new()),
            sign_in_reached: Arc::new(Notify::new()),
            stall_sign_in: false,
        }
    }
}

impl MockNetwork {
    fn log(&self, event: String) {
        self.events.lock().expect("event log lock").push(event);
    }

    /// Snapshot of the ordered call log.
    pub fn event_log(&self) -> Vec<String> {
        self.events.lock().expect("event log lock").clone()
    }

    fn issue_exp(&self) -> u64 {
        let now = current_timestamp() as i64;
        (now + self.jwt_exp_offset).max(0) as u64
    }
}

#[async_trait]
impl NetworkOperations for MockNetwork {
    async fn fetch_server_pgp_public_key(&self) -> Result<ArmoredPublicKey, NetworkError> {
        self.log("fetch_pgp_key".into());
        Ok(ArmoredPublicKey::new(
            "-----BEGIN PGP PUBLIC KEY BLOCK-----\nbW9jay1wZ3A=\n-----END PGP PUBLIC KEY BLOCK-----",
        ))
    }

    async fn fetch_server_rsa_public_key(&self) -> Result<ArmoredPublicKey, NetworkError> {
        self.log("fetch_rsa_key".into());
        Ok(ArmoredPublicKey::new(format!(
            "-----BEGIN PUBLIC KEY-----\n{}\n-----END PUBLIC KEY-----",
            STANDARD.encode(&self.advertised_rsa_der)
        )))
    }

    async fn post_sign_in(
        &self,
        account: AccountId,
        armored_challenge: &str,
    ) -> Result<String, NetworkError> {
        self.log(format!("sign_in:{account}"));
        self.sign_in_reached.notify_one();
        if self.stall_sign_in {
            std::future::pending::<()>().await;
        }

        let challenge: SignInChallenge = serde_json::from_slice(&unarmor(armored_challenge))
            .expect("mock server received malformed challenge");

        let echoed_token = if self.echo_wrong_token {
            Uuid::new_v4().to_string()
        } else {
            challenge.verification_token.to_string()
        };

        let response = serde_json::json!({
            "access_token": make_signed_jwt(self.issue_exp(), &self.rsa_signing_key),
            "refresh_token": format!("refresh-{account}"),
            "verification_token": echoed_token,
        });
        let bytes = serde_json::to_vec(&response).expect("mock response JSON");
        Ok(format!("{ARMOR_PREFIX}{}", base64_url_encode(&bytes)))
    }

    async fn post_sign_out(&self, refresh_token: &str) -> Result<(), NetworkError> {
        self.log(format!("sign_out:{refresh_token}"));
        if self.sign_out_fails {
            return Err(NetworkError::ConnectionFailed("mock outage".into()));
        }
        Ok(())
    }

    async fn post_refresh(
        &self,
        account: AccountId,
        refresh_token: &str,
    ) -> Result<String, NetworkError> {
        self.log(format!("refresh:{account}:{refresh_token}"));
        let response = serde_json::json!({
            "access_token": make_signed_jwt(self.issue_exp(), &self.rsa_signing_key),
            "refresh_token": format!("refresh-rotated-{account}"),
        });
        Ok(response.to_string())
    }

    async fn post_mfa_verify(
        &self,
        account: AccountId,
        _method: &MfaMethod,
    ) -> Result<(), NetworkError> {
        self.log(format!("mfa:{account}"));
        if self.mfa_rejects {
            return Err(NetworkError::Forbidden);
        }
        Ok(())
    }
}

// ============================================================================
// Store
// ============================================================================

/// Counting store: connections are just sequence numbers.
#[derive(Default)]
pub struct MockStore {
    /// Number of `open_connection` calls.
    pub open_count: AtomicU64,
    /// Accounts connections were opened for, in order.
    pub opened_for: Mutex<Vec<AccountId>>,
}

#[async_trait]
impl VaultStore for MockStore {
    type Connection = u64;

    async fn derive_database_key(&self, account: AccountId) -> Result<Vec<u8>, StoreError> {
        Ok(format!("key-{account}").into_bytes())
    }

    async fn open_connection(
        &self,
        account: AccountId,
        _key: &[u8],
    ) -> Result<Self::Connection, StoreError> {
        self.opened_for.lock().expect("opened_for lock").push(account);
        Ok(self.open_count.fetch_add(1, Ordering::SeqCst) + 1)
    }
}
