//! # vaultic-session
//!
//! The session authentication core: the challenge-response handshake,
//! session token model, session state machine, and the session-scoped
//! database gate.
//!
//! All session mutations serialize through [`SessionService`], the single
//! session actor; state changes are broadcast on a watch channel that the
//! store gate and UI subscribe to. Network transport, PGP/RSA crypto, and
//! the encrypted store itself are consumed through the collaborator
//! traits in [`traits`].

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod handshake;
pub mod service;
pub mod state;
pub mod store_gate;
pub mod tokens;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::SessionConfig;
pub use error::{CryptoError, NetworkError, Result, SessionError, StoreError};
pub use handshake::{RefreshResponse, SignInRequest};
pub use service::SessionService;
pub use state::{MfaContext, MfaMethod, SessionState};
pub use store_gate::StoreGate;
pub use tokens::SessionTokens;
pub use traits::{CryptoOperations, NetworkOperations, VaultStore};
