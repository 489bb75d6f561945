//! The session-scoped database gate.
//!
//! Hands out a connection to the authorized account's encrypted store.
//! The database key itself requires an authorized session to derive, so
//! the gate snapshots session state at the start of each access and
//! refuses anything short of authorized. Backgrounding drops the cached
//! connection — a deliberate security measure, not an optimization.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::debug;

use vaultic_proto::AccountId;

use crate::error::{Result, SessionError};
use crate::state::SessionState;
use crate::traits::VaultStore;

/// Session-scoped access to the account's encrypted store.
///
/// Serializes store access through its own lock, distinct from the
/// session actor's; session state is read as a snapshot from the watch
/// channel, never assumed to hold across the derive/open awaits.
pub struct StoreGate<S: VaultStore> {
    store: Arc<S>,
    state_rx: watch::Receiver<SessionState>,
    /// At most one live connection, bound to the account it was opened
    /// for. An account mismatch on the next access invalidates it.
    cache: Mutex<Option<(AccountId, S::Connection)>>,
}

impl<S: VaultStore> StoreGate<S> {
    /// Build a gate over `store`, observing session state on `state_rx`
    /// (from [`crate::SessionService::session_state_updates`]).
    pub fn new(store: Arc<S>, state_rx: watch::Receiver<SessionState>) -> Self {
        Self {
            store,
            state_rx,
            cache: Mutex::new(None),
        }
    }

    /// A connection to the current account's encrypted store.
    ///
    /// On an authorized session (MFA-pending included), returns the
    /// cached connection when it is bound to the same account, otherwise
    /// derives the database key, opens a fresh connection, and caches it.
    ///
    /// # Errors
    ///
    /// [`SessionError::AuthorizationRequired`] (carrying the account for
    /// UI redirection) while the session awaits unlock;
    /// [`SessionError::SessionMissing`] when there is no session — the
    /// cached connection is dropped in that case; store collaborator
    /// failures while deriving or opening.
    pub async fn current_connection(&self) -> Result<S::Connection> {
        // Snapshot once; anything after an await must not assume it held.
        let snapshot = self.state_rx.borrow().clone();

        match snapshot {
            SessionState::Authorized { account }
            | SessionState::AuthorizedMfaRequired { account, .. } => {
                let mut cache = self.cache.lock().await;
                if let Some((cached_account, connection)) = cache.as_ref() {
                    if *cached_account == account {
                        return Ok(connection.clone());
                    }
                    debug!(
                        cached = %cached_account,
                        current = %account,
                        "cached store connection bound to a different account, reopening"
                    );
                }

                let key = self.store.derive_database_key(account).await?;
                let connection = self.store.open_connection(account, &key).await?;
                *cache = Some((account, connection.clone()));
                debug!(account = %account, "opened store connection");
                Ok(connection)
            }
            SessionState::AuthorizationRequired { account } => {
                Err(SessionError::AuthorizationRequired { account })
            }
            SessionState::None { last_used_account } => {
                self.cache.lock().await.take();
                Err(SessionError::SessionMissing {
                    account: last_used_account,
                })
            }
        }
    }

    /// The application entered the background: drop the cached
    /// connection so the next access re-derives the key. Never blocks on
    /// anything but the cache lock and never errors.
    pub async fn enter_background(&self) {
        if self.cache.lock().await.take().is_some() {
            debug!("dropped cached store connection on backgrounding");
        }
    }
}
