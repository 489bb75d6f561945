//! The session actor.
//!
//! [`SessionService`] owns the one live [`SessionState`] and the current
//! token pair. Every mutating operation (handshake, MFA verification,
//! refresh, close, account switch) serializes through a single mutation
//! lock, so concurrent callers queue and none observes a half-updated
//! state: tokens and state always change together, inside one commit.
//!
//! Reads never take the mutation lock; they snapshot the state container
//! through its own short-lived lock. Consumers must treat any snapshot as
//! stale after an await point and re-check before acting.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use vaultic_proto::{decode_rsa_armor, AccountId, Jwt, ProtocolError};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::handshake::{self, RefreshResponse, SignInRequest};
use crate::state::{MfaContext, MfaMethod, SessionState};
use crate::tokens::SessionTokens;
use crate::traits::{CryptoOperations, NetworkOperations};

#[cfg(test)]
mod service_tests;

/// The state container: state and tokens live together so one lock
/// acquisition observes or commits both.
struct SessionInner {
    state: SessionState,
    tokens: Option<SessionTokens>,
}

/// The single serialization point for session mutations.
///
/// Generic over the network and crypto collaborators, in the same shape
/// the rest of the workspace uses for its service seams.
pub struct SessionService<N, C> {
    network: Arc<N>,
    crypto: Arc<C>,
    config: SessionConfig,
    /// Serializes mutating operations end to end. Held across the awaits
    /// of a handshake so at most one mutation is ever in flight.
    mutation: tokio::sync::Mutex<()>,
    /// Short-critical-section container; never held across an await.
    inner: Mutex<SessionInner>,
    state_tx: watch::Sender<SessionState>,
}

impl<N, C> SessionService<N, C>
where
    N: NetworkOperations,
    C: CryptoOperations,
{
    /// Create a service with no session.
    pub fn new(network: Arc<N>, crypto: Arc<C>, config: SessionConfig) -> Self {
        let initial = SessionState::initial();
        let (state_tx, _) = watch::channel(initial.clone());
        Self {
            network,
            crypto,
            config,
            mutation: tokio::sync::Mutex::new(()),
            inner: Mutex::new(SessionInner {
                state: initial,
                tokens: None,
            }),
            state_tx,
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Snapshot of the current session state.
    pub fn current_state(&self) -> SessionState {
        self.lock_inner().state.clone()
    }

    /// Subscribe to state changes. Latest-value semantics: consumers
    /// re-check [`Self::current_state`] before acting, never carrying an
    /// "authorized" assumption across an await.
    pub fn session_state_updates(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// The account of the authorized session.
    ///
    /// # Errors
    ///
    /// [`SessionError::SessionMissing`] when no session exists,
    /// [`SessionError::AuthorizationRequired`] when the selected account
    /// is not yet unlocked. Both are expected control-flow signals.
    pub fn current_account(&self) -> Result<AccountId> {
        match self.lock_inner().state.clone() {
            SessionState::Authorized { account }
            | SessionState::AuthorizedMfaRequired { account, .. } => Ok(account),
            SessionState::AuthorizationRequired { account } => {
                Err(SessionError::AuthorizationRequired { account })
            }
            SessionState::None { last_used_account } => Err(SessionError::SessionMissing {
                account: last_used_account,
            }),
        }
    }

    /// The current token pair, when one has been published.
    ///
    /// May be `None` for a brief window after the state turns authorized;
    /// callers treat absence as "not yet usable".
    pub fn current_tokens(&self) -> Option<SessionTokens> {
        self.lock_inner().tokens.clone()
    }

    /// Whether the access token is absent or expired as of `now`.
    /// Recomputed on every call; never cached.
    pub fn is_session_expired(&self, now: u64) -> bool {
        self.lock_inner()
            .tokens
            .as_ref()
            .map_or(true, |t| t.is_access_token_expired(now))
    }

    // ========================================================================
    // Mutations (all serialized through the mutation lock)
    // ========================================================================

    /// Select a stored account for authentication: `None →
    /// AuthorizationRequired`. If another account is currently
    /// authorized, its session is closed first — no two accounts are ever
    /// authorized simultaneously.
    pub async fn select_account(&self, account: AccountId) -> Result<()> {
        let _guard = self.mutation.lock().await;

        let current = self.lock_inner().state.clone();
        match current {
            SessionState::Authorized { account: prior, .. }
            | SessionState::AuthorizedMfaRequired { account: prior, .. }
                if prior != account =>
            {
                self.close_locked(prior).await;
            }
            SessionState::Authorized { account: prior }
            | SessionState::AuthorizedMfaRequired { account: prior, .. }
                if prior == account =>
            {
                // Already unlocked for this account; nothing to select.
                return Ok(());
            }
            _ => {}
        }

        self.commit(|inner| {
            inner.state = SessionState::AuthorizationRequired { account };
            inner.tokens = None;
        });
        debug!(account = %account, "account selected, authorization required");
        Ok(())
    }

    /// Perform one complete sign-in handshake and publish the resulting
    /// tokens atomically.
    ///
    /// The pipeline runs without touching session state; the single
    /// token-store write happens only after full verification, together
    /// with the transition to `Authorized`. Failure or cancellation at
    /// any point leaves tokens and state exactly as they were (except
    /// that switching away from a different authorized account closes
    /// that session first, as its own completed mutation).
    pub async fn create_session(&self, request: SignInRequest) -> Result<SessionTokens> {
        let _guard = self.mutation.lock().await;

        let current = self.lock_inner().state.clone();
        if let SessionState::Authorized { account: prior }
        | SessionState::AuthorizedMfaRequired { account: prior, .. } = current
        {
            if prior != request.account {
                info!(prior = %prior, next = %request.account, "switching accounts, closing prior session");
                self.close_locked(prior).await;
            }
        }

        info!(account = %request.account, domain = %request.domain, "starting sign-in handshake");
        let tokens = handshake::run(
            self.network.as_ref(),
            self.crypto.as_ref(),
            &self.config,
            &request,
        )
        .await
        .map_err(|e| {
            warn!(account = %request.account, error = %e, "sign-in handshake failed");
            e
        })?;

        self.commit(|inner| {
            inner.state = SessionState::Authorized {
                account: request.account,
            };
            inner.tokens = Some(tokens.clone());
        });
        info!(account = %request.account, "session authorized");
        Ok(tokens)
    }

    /// Record the server's signal that a second factor is required:
    /// `Authorized → AuthorizedMfaRequired`. Access through the store
    /// gate stays available; callers withhold domain features until
    /// [`Self::authorize_mfa`] completes.
    pub async fn require_mfa(&self, context: MfaContext) -> Result<()> {
        let _guard = self.mutation.lock().await;

        let account = match self.lock_inner().state.clone() {
            SessionState::Authorized { account } => account,
            SessionState::AuthorizedMfaRequired { account, .. } => {
                // Already pending; refresh the context.
                account
            }
            SessionState::AuthorizationRequired { account } => {
                return Err(SessionError::AuthorizationRequired { account })
            }
            SessionState::None { last_used_account } => {
                return Err(SessionError::SessionMissing {
                    account: last_used_account,
                })
            }
        };

        self.commit(|inner| {
            inner.state = SessionState::AuthorizedMfaRequired { account, context };
        });
        info!(account = %account, "MFA required");
        Ok(())
    }

    /// Verify a second factor: `AuthorizedMfaRequired → Authorized`.
    pub async fn authorize_mfa(&self, method: MfaMethod) -> Result<()> {
        let _guard = self.mutation.lock().await;

        let account = match self.lock_inner().state.clone() {
            SessionState::AuthorizedMfaRequired { account, .. } => account,
            SessionState::Authorized { account } => {
                debug!(account = %account, "MFA verification requested but none pending");
                return Ok(());
            }
            SessionState::AuthorizationRequired { account } => {
                return Err(SessionError::AuthorizationRequired { account })
            }
            SessionState::None { last_used_account } => {
                return Err(SessionError::SessionMissing {
                    account: last_used_account,
                })
            }
        };

        self.network.post_mfa_verify(account, &method).await?;

        self.commit(|inner| {
            inner.state = SessionState::Authorized { account };
        });
        info!(account = %account, "MFA verified");
        Ok(())
    }

    /// Replace only the token pair, leaving the state machine untouched.
    ///
    /// Narrower than a full handshake but under the same serialization
    /// discipline: requires an authorized session and a held refresh
    /// token; the returned JWT is RSA-verified against a freshly fetched
    /// server key before the swap.
    pub async fn refresh_session(&self) -> Result<SessionTokens> {
        let _guard = self.mutation.lock().await;

        let (account, refresh_token) = {
            let inner = self.lock_inner();
            let account = match &inner.state {
                SessionState::Authorized { account }
                | SessionState::AuthorizedMfaRequired { account, .. } => *account,
                SessionState::AuthorizationRequired { account } => {
                    return Err(SessionError::AuthorizationRequired { account: *account })
                }
                SessionState::None { last_used_account } => {
                    return Err(SessionError::SessionMissing {
                        account: *last_used_account,
                    })
                }
            };
            let refresh_token = inner
                .tokens
                .as_ref()
                .map(|t| t.refresh_token.clone())
                .ok_or(SessionError::NoRefreshToken)?;
            (account, refresh_token)
        };

        let rsa_public_key = self.network.fetch_server_rsa_public_key().await?;
        let body = self.network.post_refresh(account, &refresh_token).await?;

        let response: RefreshResponse =
            serde_json::from_str(&body).map_err(|e| ProtocolError::MalformedResponse {
                reason: e.to_string(),
            })?;
        let jwt = Jwt::parse(&response.access_token)?;
        let rsa_der = decode_rsa_armor(&rsa_public_key)?;
        let verified =
            self.crypto
                .rsa_verify_signature(jwt.signed_payload(), jwt.signature(), &rsa_der)?;
        if !verified {
            return Err(ProtocolError::SignatureRejected.into());
        }

        let tokens = SessionTokens {
            access_token: jwt,
            refresh_token: response.refresh_token,
        };
        self.commit(|inner| {
            inner.tokens = Some(tokens.clone());
        });
        info!(account = %account, "session tokens refreshed");
        Ok(tokens)
    }

    /// Close the session: post the sign-out best-effort, clear tokens,
    /// publish `None` remembering the account.
    ///
    /// With an explicit `account` that does not match the current
    /// session, this is a no-op — the session it meant to close is
    /// already gone.
    pub async fn close_session(&self, account: Option<AccountId>) -> Result<()> {
        let _guard = self.mutation.lock().await;

        let current_account = self.lock_inner().state.account();
        let Some(current) = current_account else {
            debug!("close requested with no session");
            return Ok(());
        };
        if let Some(requested) = account {
            if requested != current {
                debug!(requested = %requested, current = %current, "close requested for a different account, ignoring");
                return Ok(());
            }
        }

        self.close_locked(current).await;
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Tear down the current session. Caller holds the mutation lock.
    ///
    /// The server-side sign-out is best-effort: a transport failure must
    /// not leave a local session alive.
    async fn close_locked(&self, account: AccountId) {
        let refresh_token = self.lock_inner().tokens.as_ref().map(|t| t.refresh_token.clone());
        if let Some(token) = refresh_token {
            if let Err(e) = self.network.post_sign_out(&token).await {
                warn!(account = %account, error = %e, "server sign-out failed, clearing local session anyway");
            }
        }

        self.commit(|inner| {
            inner.state = SessionState::None {
                last_used_account: Some(account),
            };
            inner.tokens = None;
        });
        info!(account = %account, "session closed");
    }

    /// Apply a mutation to the state container and broadcast the
    /// resulting state, all under one lock acquisition so no reader sees
    /// tokens and state disagree.
    fn commit(&self, mutate: impl FnOnce(&mut SessionInner)) {
        let mut inner = self.lock_inner();
        mutate(&mut inner);
        self.state_tx.send_replace(inner.state.clone());
    }

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, SessionInner> {
        // The container lock is never held across an await, so poisoning
        // can only follow a panic in a pure closure; propagate it.
        self.inner.lock().expect("session state lock poisoned")
    }
}
