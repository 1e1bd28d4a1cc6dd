use std::sync::Arc;

use tracing::debug;

use super::policy::{Capability, Decision, RolePolicy};
use crate::identity::{Session, SessionStore};

/// What the rendering layer should do for a protected destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderDecision {
    /// Session state is still resolving; render nothing protected yet.
    Defer,
    RenderPrimary(String),
    RenderAlternate(String),
    Redirect(String),
}

impl RenderDecision {
    pub fn is_redirect(&self) -> bool { matches!(self, RenderDecision::Redirect(_)) }

    pub fn view(&self) -> Option<&str> {
        match self {
            RenderDecision::RenderPrimary(v) | RenderDecision::RenderAlternate(v) => Some(v.as_str()),
            RenderDecision::Defer | RenderDecision::Redirect(_) => None,
        }
    }
}

/// Two-stage check: authentication gate, then role policy.
/// Holds no memory between calls.
pub fn guard(session: &Session, policy: &RolePolicy, capability: &Capability, login_path: &str) -> RenderDecision {
    if session.loading {
        return RenderDecision::Defer;
    }
    let Some(role) = session.role() else {
        return RenderDecision::Redirect(login_path.to_string());
    };
    let decision = match policy.resolve(role, capability) {
        Decision::Primary => match policy.primary_view(capability) {
            Some(view) => RenderDecision::RenderPrimary(view.to_string()),
            None => RenderDecision::Redirect(policy.default_landing().to_string()),
        },
        Decision::Alternate(view) => RenderDecision::RenderAlternate(view),
        Decision::Redirect(path) => RenderDecision::Redirect(path),
    };
    debug!(target: "mmms::guard", "{} -> {} => {:?}", role, capability, decision);
    decision
}

/// Guard bound to the live session store.
#[derive(Clone)]
pub struct RouteGuard {
    store: Arc<SessionStore>,
    policy: Arc<RolePolicy>,
    login_path: String,
}

impl RouteGuard {
    pub fn new<S: Into<String>>(store: Arc<SessionStore>, policy: Arc<RolePolicy>, login_path: S) -> Self {
        Self { store, policy, login_path: login_path.into() }
    }

    pub fn check(&self, capability: &Capability) -> RenderDecision {
        guard(&self.store.snapshot(), &self.policy, capability, &self.login_path)
    }

    pub fn policy(&self) -> &RolePolicy { &self.policy }

    pub fn login_path(&self) -> &str { &self.login_path }
}
