//! # vaultic-proto
//!
//! Wire protocol for the vaultic challenge-response sign-in exchange.
//!
//! This crate is pure data: challenge and response records, JWT parsing,
//! armored key material, and the protocol error taxonomy. It performs no
//! I/O and no cryptography of its own; encryption, signing, and RSA
//! verification are collaborator concerns of `vaultic-session`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod challenge;
pub mod error;
pub mod jwt;
pub mod keys;
pub mod response;
pub mod utils;

pub use challenge::{SignInChallenge, CHALLENGE_VALIDITY_SECS, PROTOCOL_VERSION};
pub use error::{ProtocolError, Result};
pub use jwt::{Jwt, JwtClaims, JwtHeader};
pub use keys::{
    decode_rsa_armor, AccountId, ArmoredPrivateKey, ArmoredPublicKey, Passphrase, ServerKeys,
};
pub use response::SignInResponse;
pub use utils::{base64_url_decode, base64_url_encode, current_timestamp};
