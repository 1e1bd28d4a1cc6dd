use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::credentials::{Credentials, Profile};
use super::principal::{Identity, Role};
use super::provider::{gen_token, CredentialVerifier};
use crate::error::{AppError, AppResult};
use crate::notify::{Notice, SharedSink};
use crate::storage::{SharedStore, IDENTITY_KEY, TOKEN_KEY};
use crate::tprintln;

/// Point-in-time view of who is signed in.
/// `authenticated` is true exactly when `identity` is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: Option<Identity>,
    pub authenticated: bool,
    pub loading: bool,
}

impl Session {
    pub fn unauthenticated() -> Self { Self { identity: None, authenticated: false, loading: false } }

    pub fn authenticated(identity: Identity) -> Self { Self { identity: Some(identity), authenticated: true, loading: false } }

    /// Not yet decidable: startup restore has not run or an operation is in flight.
    pub fn pending() -> Self { Self { identity: None, authenticated: false, loading: true } }

    pub fn role(&self) -> Option<Role> {
        if !self.authenticated { return None; }
        self.identity.as_ref().map(|i| i.role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated(Identity),
    /// A later login or a logout was issued before this attempt resolved; its result was dropped.
    Superseded,
}

#[derive(Debug, Default)]
struct SessionState {
    identity: Option<Identity>,
    restored: bool,
    pending: usize,
}

/// Decrements the in-flight counter however the operation ends, including cancellation.
struct PendingGuard<'a> {
    state: &'a RwLock<SessionState>,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let mut st = self.state.write();
        st.pending = st.pending.saturating_sub(1);
    }
}

/// Single owner of the console's session.
pub struct SessionStore {
    state: RwLock<SessionState>,
    storage: SharedStore,
    verifier: Arc<dyn CredentialVerifier>,
    notifier: SharedSink,
    // Highest login sequence number issued; logout bumps it too so in-flight logins go stale.
    issued: AtomicU64,
}

impl SessionStore {
    pub fn new(storage: SharedStore, verifier: Arc<dyn CredentialVerifier>, notifier: SharedSink) -> Self {
        Self {
            state: RwLock::new(SessionState::default()),
            storage,
            verifier,
            notifier,
            issued: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> Session {
        let st = self.state.read();
        Session {
            identity: st.identity.clone(),
            authenticated: st.identity.is_some(),
            loading: !st.restored || st.pending > 0,
        }
    }

    pub fn identity(&self) -> Option<Identity> { self.state.read().identity.clone() }

    pub fn role(&self) -> Option<Role> { self.state.read().identity.as_ref().map(|i| i.role) }

    pub fn is_authenticated(&self) -> bool { self.state.read().identity.is_some() }

    /// Rebuild the session from durable storage. Missing or unreadable data yields
    /// an unauthenticated session; that is the normal first-run state, not an error.
    /// Stored identities are trusted as-is.
    pub fn restore(&self) -> bool {
        let restored = self.read_persisted();
        let authenticated = restored.is_some();
        {
            let mut st = self.state.write();
            if let Some(ident) = &restored {
                info!(target: "mmms::session", "restored session for {} as {}", ident.email, ident.role);
            } else {
                debug!(target: "mmms::session", "no stored session");
            }
            st.identity = restored;
            st.restored = true;
        }
        authenticated
    }

    fn read_persisted(&self) -> Option<Identity> {
        let token = match self.storage.get(TOKEN_KEY) {
            Ok(Some(t)) if !t.trim().is_empty() => t,
            Ok(_) => return None,
            Err(e) => {
                warn!(target: "mmms::session", "session token unreadable: {}", e);
                return None;
            }
        };
        let raw = match self.storage.get(IDENTITY_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                warn!(target: "mmms::session", "token without identity; clearing");
                self.clear_persisted();
                return None;
            }
            Err(e) => {
                warn!(target: "mmms::session", "stored identity unreadable: {}", e);
                return None;
            }
        };
        // Unknown role strings fail deserialization, so corrupted roles never authenticate.
        match serde_json::from_str::<Identity>(&raw) {
            Ok(ident) => {
                tprintln!("session.restore token_len={} user={}", token.len(), ident.id);
                Some(ident)
            }
            Err(e) => {
                warn!(target: "mmms::session", "stored identity malformed ({}); clearing", e);
                self.clear_persisted();
                None
            }
        }
    }

    fn persist(&self, ident: &Identity) -> AppResult<()> {
        let token = gen_token()?;
        let body = serde_json::to_string(ident)
            .map_err(|e| AppError::internal("identity_encode".to_string(), e.to_string()))?;
        self.storage.set(TOKEN_KEY, &token)?;
        self.storage.set(IDENTITY_KEY, &body)?;
        Ok(())
    }

    fn clear_persisted(&self) {
        for key in [TOKEN_KEY, IDENTITY_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!(target: "mmms::session", "could not remove '{}': {}", key, e);
            }
        }
    }

    fn begin_pending(&self) -> PendingGuard<'_> {
        self.state.write().pending += 1;
        PendingGuard { state: &self.state }
    }

    /// Authenticate. Input is checked before anything else happens.
    /// Only the most recently issued attempt may change the session; older attempts
    /// resolve to `LoginOutcome::Superseded` whatever their verifier said.
    pub async fn login(&self, creds: Credentials) -> AppResult<LoginOutcome> {
        creds.validate()?;
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let _pending = self.begin_pending();
        debug!(target: "mmms::session", "login attempt #{} for {}", seq, creds.identifier);

        let verdict = self.verifier.verify(&creds).await;

        let mut st = self.state.write();
        if self.issued.load(Ordering::SeqCst) != seq {
            debug!(target: "mmms::session", "login attempt #{} superseded; result dropped", seq);
            return Ok(LoginOutcome::Superseded);
        }
        match verdict {
            Ok(ident) => {
                if let Err(e) = self.persist(&ident) {
                    // The current process stays signed in; a restart comes back signed out,
                    // never as whoever was stored before.
                    warn!(target: "mmms::session", "session not persisted: {}", e);
                    self.clear_persisted();
                }
                st.identity = Some(ident.clone());
                st.restored = true;
                drop(st);
                info!(target: "mmms::session", "login #{} accepted for {} as {}", seq, ident.email, ident.role);
                self.notifier.notify(Notice::success("Login successful"));
                Ok(LoginOutcome::Authenticated(ident))
            }
            Err(e) => {
                drop(st);
                warn!(target: "mmms::session", "login #{} rejected: {}", seq, e);
                self.notifier.notify(Notice::error("Login failed. Please check your credentials."));
                Err(AppError::auth("invalid_credentials", "authentication failed"))
            }
        }
    }

    /// Submit a registration. Never signs the caller in.
    pub async fn register(&self, profile: Profile) -> AppResult<()> {
        profile.validate()?;
        let _pending = self.begin_pending();
        match self.verifier.enroll(&profile).await {
            Ok(()) => {
                info!(target: "mmms::session", "registration accepted for {}", profile.email);
                self.notifier.notify(Notice::success("Registration successful! You can now log in."));
                Ok(())
            }
            Err(e) => {
                warn!(target: "mmms::session", "registration rejected for {}: {}", profile.email, e);
                self.notifier.notify(Notice::error("Registration failed. Please try again."));
                Err(AppError::auth("registration_failed", "registration was not accepted"))
            }
        }
    }

    /// Sign out unconditionally. Safe to call repeatedly.
    pub fn logout(&self) {
        let previous = {
            let mut st = self.state.write();
            self.issued.fetch_add(1, Ordering::SeqCst);
            self.clear_persisted();
            st.restored = true;
            st.identity.take()
        };
        match previous {
            Some(ident) => info!(target: "mmms::session", "logged out {}", ident.email),
            None => debug!(target: "mmms::session", "logout with no active session"),
        }
        self.notifier.notify(Notice::success("Logged out successfully"));
    }
}
