//! Session store integration tests: restore, login sequencing, registration and logout.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use mmms_access::access::{guard, Capability, RolePolicy, RouteTable};
use mmms_access::identity::{CredentialVerifier, DemoVerifier};
use mmms_access::navigation::{standard_menu, CommandPalette};
use mmms_access::notify::RecordingSink;
use mmms_access::storage::{DurableStore, FileStore, MemoryStore, IDENTITY_KEY, TOKEN_KEY};
use mmms_access::{AccessShell, AppError, AppResult, Credentials, Identity, LoginOutcome, Profile, RenderDecision, Role, SessionStore};

/// Verifier whose answers are released by the test, one gate per identifier.
struct GatedVerifier {
    gates: Mutex<HashMap<String, oneshot::Receiver<AppResult<Identity>>>>,
    entered: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl CredentialVerifier for GatedVerifier {
    async fn verify(&self, creds: &Credentials) -> AppResult<Identity> {
        let rx = self.gates.lock().remove(&creds.identifier);
        let _ = self.entered.send(creds.identifier.clone());
        match rx {
            Some(rx) => rx.await.unwrap_or_else(|_| Err(AppError::internal("gate_dropped", "gate dropped"))),
            None => Err(AppError::auth("no_gate", "no gate registered")),
        }
    }

    async fn enroll(&self, _profile: &Profile) -> AppResult<()> { Ok(()) }
}

struct Harness {
    store: Arc<SessionStore>,
    storage: MemoryStore,
    sink: RecordingSink,
    senders: HashMap<String, oneshot::Sender<AppResult<Identity>>>,
    entered: mpsc::UnboundedReceiver<String>,
}

fn gated(ids: &[&str]) -> Harness {
    let mut gates = HashMap::new();
    let mut senders = HashMap::new();
    for id in ids {
        let (tx, rx) = oneshot::channel();
        gates.insert(id.to_string(), rx);
        senders.insert(id.to_string(), tx);
    }
    let (etx, erx) = mpsc::unbounded_channel();
    let storage = MemoryStore::new();
    let sink = RecordingSink::new();
    let verifier = GatedVerifier { gates: Mutex::new(gates), entered: etx };
    let store = Arc::new(SessionStore::new(Arc::new(storage.clone()), Arc::new(verifier), Arc::new(sink.clone())));
    store.restore();
    Harness { store, storage, sink, senders, entered: erx }
}

fn demo_store(storage: Arc<dyn DurableStore>) -> (SessionStore, RecordingSink) {
    let sink = RecordingSink::new();
    let store = SessionStore::new(storage, Arc::new(DemoVerifier::default()), Arc::new(sink.clone()));
    (store, sink)
}

fn ident(id: &str, role: Role) -> Identity {
    let email = format!("{}@plant.io", id);
    Identity::new(id, "Someone", email.as_str(), role)
}

async fn spawn_login(h: &mut Harness, id: &str) -> tokio::task::JoinHandle<AppResult<LoginOutcome>> {
    let store = h.store.clone();
    let creds = Credentials::new(id, "pw");
    let handle = tokio::spawn(async move { store.login(creds).await });
    // wait until the attempt has taken its sequence number and reached the verifier
    let got = h.entered.recv().await;
    assert_eq!(got.as_deref(), Some(id));
    handle
}

#[tokio::test]
async fn stale_login_discarded_when_it_finishes_last() -> Result<()> {
    let mut h = gated(&["a", "b"]);
    let la = spawn_login(&mut h, "a").await;
    let lb = spawn_login(&mut h, "b").await;

    let _ = h.senders.remove("b").unwrap().send(Ok(ident("b", Role::Technician)));
    assert!(matches!(lb.await?, Ok(LoginOutcome::Authenticated(_))));
    let _ = h.senders.remove("a").unwrap().send(Ok(ident("a", Role::Admin)));
    assert_eq!(la.await?, Ok(LoginOutcome::Superseded));

    let s = h.store.snapshot();
    assert_eq!(s.identity.map(|i| i.id), Some("b".to_string()));
    assert!(!s.loading);
    Ok(())
}

#[tokio::test]
async fn stale_login_discarded_when_it_finishes_first() -> Result<()> {
    let mut h = gated(&["a", "b"]);
    let la = spawn_login(&mut h, "a").await;
    let lb = spawn_login(&mut h, "b").await;

    let _ = h.senders.remove("a").unwrap().send(Ok(ident("a", Role::Admin)));
    assert_eq!(la.await?, Ok(LoginOutcome::Superseded));
    // A resolving must not have signed anyone in
    assert!(!h.store.is_authenticated());
    assert!(h.store.snapshot().loading, "b is still in flight");

    let _ = h.senders.remove("b").unwrap().send(Ok(ident("b", Role::Viewer)));
    assert!(matches!(lb.await?, Ok(LoginOutcome::Authenticated(_))));
    assert_eq!(h.store.role(), Some(Role::Viewer));
    Ok(())
}

#[tokio::test]
async fn stale_rejection_does_not_notify_or_fail_session() -> Result<()> {
    let mut h = gated(&["a", "b"]);
    let la = spawn_login(&mut h, "a").await;
    let lb = spawn_login(&mut h, "b").await;
    let _ = h.senders.remove("b").unwrap().send(Ok(ident("b", Role::Admin)));
    lb.await??;
    let _ = h.senders.remove("a").unwrap().send(Err(AppError::auth("wrong_secret", "nope")));
    assert_eq!(la.await?, Ok(LoginOutcome::Superseded));
    assert_eq!(h.store.role(), Some(Role::Admin));
    assert_eq!(h.sink.messages(), vec!["Login successful".to_string()]);
    Ok(())
}

#[tokio::test]
async fn logout_during_login_discards_the_login() -> Result<()> {
    let mut h = gated(&["a"]);
    let la = spawn_login(&mut h, "a").await;
    h.store.logout();
    let _ = h.senders.remove("a").unwrap().send(Ok(ident("a", Role::Admin)));
    assert_eq!(la.await?, Ok(LoginOutcome::Superseded));
    assert!(!h.store.is_authenticated());
    assert_eq!(h.storage.get(TOKEN_KEY)?, None);
    Ok(())
}

#[tokio::test]
async fn in_flight_login_defers_guard() -> Result<()> {
    let mut h = gated(&["a"]);
    let policy = RolePolicy::standard("/dashboard")?;
    let la = spawn_login(&mut h, "a").await;
    let s = h.store.snapshot();
    assert!(s.loading);
    assert_eq!(guard(&s, &policy, &Capability::new("dashboard"), "/login"), RenderDecision::Defer);
    let _ = h.senders.remove("a").unwrap().send(Ok(ident("a", Role::Admin)));
    la.await??;
    let s = h.store.snapshot();
    assert_eq!(guard(&s, &policy, &Capability::new("dashboard"), "/login"), RenderDecision::RenderPrimary("AdminDashboard".into()));
    Ok(())
}

#[tokio::test]
async fn navigation_is_withheld_while_a_login_resolves() -> Result<()> {
    let mut h = gated(&["a", "b"]);
    let policy = RolePolicy::standard("/dashboard")?;
    let menu = standard_menu(&policy);
    let shell = AccessShell::new(
        h.store.clone(),
        policy,
        RouteTable::standard("/dashboard", "/login"),
        menu,
        CommandPalette::standard()?,
        "/login",
    );

    let la = spawn_login(&mut h, "a").await;
    let _ = h.senders.remove("a").unwrap().send(Ok(ident("a", Role::Admin)));
    la.await??;
    assert!(!shell.menu().is_empty());

    let lb = spawn_login(&mut h, "b").await;
    assert_eq!(h.store.role(), Some(Role::Admin));
    assert!(shell.menu().is_empty());
    assert!(shell.palette_search("").is_empty());

    let _ = h.senders.remove("b").unwrap().send(Ok(ident("b", Role::Viewer)));
    lb.await??;
    let labels: Vec<String> = shell.menu().into_iter().map(|e| e.label).collect();
    assert!(!labels.contains(&"User Management".to_string()));
    assert!(!labels.is_empty());
    Ok(())
}

#[tokio::test]
async fn rejected_login_leaves_session_unchanged() -> Result<()> {
    let mut h = gated(&["a", "b"]);
    let la = spawn_login(&mut h, "a").await;
    let _ = h.senders.remove("a").unwrap().send(Ok(ident("a", Role::Technician)));
    la.await??;
    let before = h.store.snapshot();

    let lb = spawn_login(&mut h, "b").await;
    let _ = h.senders.remove("b").unwrap().send(Err(AppError::auth("unknown_identifier", "no such account")));
    let err = lb.await?.unwrap_err();
    assert!(err.is_auth());
    assert_eq!(err.code_str(), "invalid_credentials");
    assert!(!err.message().contains("account"));
    assert_eq!(h.store.snapshot(), before);
    assert_eq!(
        h.sink.messages(),
        vec!["Login successful".to_string(), "Login failed. Please check your credentials.".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn invalid_credentials_rejected_before_side_effects() -> Result<()> {
    let storage = MemoryStore::new();
    let (store, sink) = demo_store(Arc::new(storage.clone()));
    store.restore();
    let err = store.login(Credentials::new("", "pw")).await.unwrap_err();
    assert!(err.is_user_input());
    let err = store.login(Credentials::new("admin@plant.io", "")).await.unwrap_err();
    assert!(err.is_user_input());
    assert!(storage.is_empty());
    assert!(sink.messages().is_empty());
    assert!(!store.is_authenticated());
    Ok(())
}

#[tokio::test]
async fn login_persists_and_restores_after_reload() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("session.json");
    {
        let (store, sink) = demo_store(Arc::new(FileStore::open(&path)));
        assert!(!store.restore());
        let out = store.login(Credentials::new("tech.lead@plant.io", "pw")).await?;
        assert!(matches!(out, LoginOutcome::Authenticated(ref i) if i.role == Role::Technician));
        assert_eq!(sink.messages(), vec!["Login successful".to_string()]);
    }
    let (reloaded, _) = demo_store(Arc::new(FileStore::open(&path)));
    assert!(reloaded.snapshot().loading, "loading until restore runs");
    assert!(reloaded.restore());
    let s = reloaded.snapshot();
    assert!(!s.loading);
    assert!(s.authenticated);
    let who = s.identity.unwrap();
    assert_eq!(who.display_name, "Technician User");
    assert_eq!(who.email, "tech.lead@plant.io");
    Ok(())
}

#[tokio::test]
async fn restore_without_data_is_unauthenticated() -> Result<()> {
    let (store, _) = demo_store(Arc::new(MemoryStore::new()));
    assert!(!store.restore());
    let s = store.snapshot();
    assert!(!s.authenticated && !s.loading && s.identity.is_none());
    Ok(())
}

#[tokio::test]
async fn restore_with_unknown_role_fails_closed_and_clears() -> Result<()> {
    let storage = MemoryStore::new();
    storage.set(TOKEN_KEY, "tok")?;
    storage.set(IDENTITY_KEY, r#"{"id":"9","name":"Mallory","email":"m@plant.io","role":"superadmin"}"#)?;
    let (store, _) = demo_store(Arc::new(storage.clone()));
    assert!(!store.restore());
    assert!(!store.is_authenticated());
    assert_eq!(storage.get(TOKEN_KEY)?, None);
    assert_eq!(storage.get(IDENTITY_KEY)?, None);
    Ok(())
}

#[tokio::test]
async fn restore_with_token_but_no_identity_is_unauthenticated() -> Result<()> {
    let storage = MemoryStore::new();
    storage.set(TOKEN_KEY, "tok")?;
    let (store, _) = demo_store(Arc::new(storage.clone()));
    assert!(!store.restore());
    assert!(storage.is_empty());
    Ok(())
}

#[tokio::test]
async fn identity_without_token_is_ignored() -> Result<()> {
    let storage = MemoryStore::new();
    storage.set(IDENTITY_KEY, r#"{"id":"1","name":"Admin User","email":"admin@plant.io","role":"admin"}"#)?;
    let (store, _) = demo_store(Arc::new(storage));
    assert!(!store.restore());
    Ok(())
}

/// Storage that refuses every operation.
struct BrokenStore;

impl DurableStore for BrokenStore {
    fn get(&self, _key: &str) -> AppResult<Option<String>> { Err(AppError::storage("kv_io", "unreadable")) }
    fn set(&self, _key: &str, _value: &str) -> AppResult<()> { Err(AppError::storage("kv_io", "read-only")) }
    fn remove(&self, _key: &str) -> AppResult<()> { Err(AppError::storage("kv_io", "read-only")) }
}

#[tokio::test]
async fn storage_failures_are_not_fatal() -> Result<()> {
    let (store, _) = demo_store(Arc::new(BrokenStore));
    assert!(!store.restore());
    let out = store.login(Credentials::new("admin@plant.io", "pw")).await?;
    assert!(matches!(out, LoginOutcome::Authenticated(_)));
    assert_eq!(store.role(), Some(Role::Admin));
    store.logout();
    assert!(!store.is_authenticated());
    Ok(())
}

/// Memory storage whose identity writes can be switched off mid-test.
struct IdentityWriteFails {
    inner: MemoryStore,
    failing: Mutex<bool>,
}

impl DurableStore for IdentityWriteFails {
    fn get(&self, key: &str) -> AppResult<Option<String>> { self.inner.get(key) }
    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        if key == IDENTITY_KEY && *self.failing.lock() {
            return Err(AppError::storage("kv_io", "disk full"));
        }
        self.inner.set(key, value)
    }
    fn remove(&self, key: &str) -> AppResult<()> { self.inner.remove(key) }
}

#[tokio::test]
async fn half_written_login_never_restores_the_previous_user() -> Result<()> {
    let storage = Arc::new(IdentityWriteFails { inner: MemoryStore::new(), failing: Mutex::new(false) });
    let (store, _) = demo_store(storage.clone());
    store.restore();
    store.login(Credentials::new("admin@plant.io", "pw")).await?;
    assert_eq!(store.role(), Some(Role::Admin));

    *storage.failing.lock() = true;
    store.login(Credentials::new("ops@plant.io", "pw")).await?;
    assert_eq!(store.role(), Some(Role::Viewer));
    assert!(storage.inner.is_empty());

    let (reloaded, _) = demo_store(storage.clone());
    assert!(!reloaded.restore());
    assert_eq!(reloaded.role(), None);
    Ok(())
}

#[tokio::test]
async fn logout_is_idempotent() -> Result<()> {
    let storage = MemoryStore::new();
    let (store, sink) = demo_store(Arc::new(storage.clone()));
    store.restore();
    store.login(Credentials::new("admin@plant.io", "pw")).await?;
    assert!(!storage.is_empty());

    store.logout();
    let once = store.snapshot();
    store.logout();
    let twice = store.snapshot();
    assert_eq!(once, twice);
    assert!(!twice.authenticated && twice.identity.is_none());
    assert!(storage.is_empty());
    assert_eq!(sink.messages().iter().filter(|m| m.as_str() == "Logged out successfully").count(), 2);
    Ok(())
}

#[tokio::test]
async fn register_never_signs_in() -> Result<()> {
    let (store, sink) = demo_store(Arc::new(MemoryStore::new()));
    store.restore();
    store.register(Profile::new("Ana", "ana@plant.io", "pw")).await?;
    assert!(!store.is_authenticated());
    assert!(!store.snapshot().loading);
    assert_eq!(sink.messages(), vec!["Registration successful! You can now log in.".to_string()]);

    let err = store.register(Profile::new("Ana", "not-an-email", "pw")).await.unwrap_err();
    assert_eq!(err.code_str(), "malformed_email");
    assert_eq!(sink.messages().len(), 1);
    Ok(())
}

struct RefusingVerifier;

#[async_trait]
impl CredentialVerifier for RefusingVerifier {
    async fn verify(&self, _creds: &Credentials) -> AppResult<Identity> { Err(AppError::auth("down", "verifier offline")) }
    async fn enroll(&self, _profile: &Profile) -> AppResult<()> { Err(AppError::internal("down", "verifier offline")) }
}

#[tokio::test]
async fn register_failure_is_generic() -> Result<()> {
    let sink = RecordingSink::new();
    let store = SessionStore::new(Arc::new(MemoryStore::new()), Arc::new(RefusingVerifier), Arc::new(sink.clone()));
    store.restore();
    let err = store.register(Profile::new("Ana", "ana@plant.io", "pw")).await.unwrap_err();
    assert_eq!(err.code_str(), "registration_failed");
    assert_eq!(sink.messages(), vec!["Registration failed. Please try again.".to_string()]);
    assert!(!store.snapshot().loading);
    Ok(())
}
