//! Composition root: one session store, one policy, and the surfaces that read them.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::access::{Capability, Destination, RenderDecision, RolePolicy, RouteGuard, RouteTable};
use crate::config::AccessConfig;
use crate::error::{AppError, AppResult};
use crate::identity::{DemoVerifier, Role, Session, SessionStore};
use crate::navigation::{standard_menu, visible_entries, CommandPalette, NavigationEntry, PaletteGroup, PaletteItem};
use crate::notify::SharedSink;
use crate::storage::{FileStore, MemoryStore, SharedStore};

const MAX_REDIRECT_HOPS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Public { view: String },
    Guarded { capability: Capability, params: BTreeMap<String, String>, decision: RenderDecision },
    Redirect { to: String },
    NotFound,
}

impl Navigation {
    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            Navigation::Redirect { to } => Some(to.as_str()),
            Navigation::Guarded { decision: RenderDecision::Redirect(to), .. } => Some(to.as_str()),
            _ => None,
        }
    }
}

/// Where a navigation ends up after following redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settled {
    pub path: String,
    pub navigation: Navigation,
    pub hops: usize,
}

pub struct AccessShell {
    store: Arc<SessionStore>,
    guard: RouteGuard,
    routes: RouteTable,
    menu: Vec<NavigationEntry>,
    palette: CommandPalette,
}

impl AccessShell {
    pub fn new(
        store: Arc<SessionStore>,
        policy: RolePolicy,
        routes: RouteTable,
        menu: Vec<NavigationEntry>,
        palette: CommandPalette,
        login_path: &str,
    ) -> Self {
        let guard = RouteGuard::new(store.clone(), Arc::new(policy), login_path);
        Self { store, guard, routes, menu, palette }
    }

    /// Standard console wiring with the demo verifier; restores any stored session.
    pub fn from_config(cfg: &AccessConfig, notifier: SharedSink) -> AppResult<Self> {
        cfg.validate()?;
        let storage: SharedStore = match &cfg.store_path {
            Some(p) => Arc::new(FileStore::open(p)),
            None => Arc::new(MemoryStore::new()),
        };
        let verifier = DemoVerifier::new(
            Duration::from_millis(cfg.login_latency_ms),
            Duration::from_millis(cfg.register_latency_ms),
        );
        let store = Arc::new(SessionStore::new(storage, Arc::new(verifier), notifier));
        let policy = RolePolicy::standard(&cfg.landing_path)?;
        let routes = RouteTable::standard(&cfg.landing_path, &cfg.login_path);
        let menu = standard_menu(&policy);
        let palette = CommandPalette::standard()?;
        let shell = Self::new(store, policy, routes, menu, palette, &cfg.login_path);
        let authenticated = shell.store.restore();
        info!(target: "mmms::shell", "console ready (authenticated={})", authenticated);
        Ok(shell)
    }

    pub fn store(&self) -> &Arc<SessionStore> { &self.store }

    pub fn session(&self) -> Session { self.store.snapshot() }

    pub fn policy(&self) -> &RolePolicy { self.guard.policy() }

    pub fn routes(&self) -> &RouteTable { &self.routes }

    pub fn palette_mut(&mut self) -> &mut CommandPalette { &mut self.palette }

    pub fn navigate(&self, path: &str) -> Navigation {
        let Some(m) = self.routes.resolve(path) else { return Navigation::NotFound; };
        match m.destination {
            Destination::Public(view) => Navigation::Public { view },
            Destination::Redirect(to) => Navigation::Redirect { to },
            Destination::Protected(capability) => {
                let decision = self.guard.check(&capability);
                Navigation::Guarded { capability, params: m.params, decision }
            }
        }
    }

    /// Follow redirects until something renders. A cycle is a policy authoring error.
    pub fn settle(&self, path: &str) -> AppResult<Settled> {
        let mut current = path.to_string();
        let mut seen = vec![current.clone()];
        for hops in 0..=MAX_REDIRECT_HOPS {
            let navigation = self.navigate(&current);
            let Some(next) = navigation.redirect_target().map(str::to_string) else {
                return Ok(Settled { path: current, navigation, hops });
            };
            if seen.contains(&next) {
                return Err(AppError::policy("redirect_loop".to_string(), format!("{} redirects back to {}", current, next)));
            }
            seen.push(next.clone());
            current = next;
        }
        Err(AppError::policy("redirect_chain".to_string(), format!("more than {} redirects from {}", MAX_REDIRECT_HOPS, path)))
    }

    /// Would `role` be shown something at `path`?
    pub fn admits_path(&self, role: Role, path: &str) -> bool {
        match self.routes.resolve(path).map(|m| m.destination) {
            Some(Destination::Public(_)) => true,
            Some(Destination::Protected(cap)) => self.policy().admits(role, &cap),
            Some(Destination::Redirect(to)) => match self.routes.resolve(&to).map(|m| m.destination) {
                Some(Destination::Protected(cap)) => self.policy().admits(role, &cap),
                Some(Destination::Public(_)) => true,
                _ => false,
            },
            None => false,
        }
    }

    /// Role to build navigation for. None while signed out or while the guard would defer.
    fn settled_role(&self) -> Option<Role> {
        let session = self.session();
        if session.loading { None } else { session.role() }
    }

    /// Sidebar for the signed-in role; nothing while signed out or resolving.
    pub fn menu(&self) -> Vec<NavigationEntry> {
        match self.settled_role() {
            Some(role) => visible_entries(role, &self.menu),
            None => Vec::new(),
        }
    }

    /// Palette results: matching pages from the visible menu, then quick-jump items.
    pub fn palette_search(&self, query: &str) -> Vec<PaletteGroup> {
        let Some(role) = self.settled_role() else { return Vec::new(); };
        let needle = query.trim().to_lowercase();
        let mut pages = Vec::new();
        flatten(&visible_entries(role, &self.menu), &mut pages);
        pages.retain(|p: &PaletteItem| needle.is_empty() || p.label.to_lowercase().contains(&needle));

        let mut out = Vec::new();
        if !pages.is_empty() { out.push(PaletteGroup::new("Pages".to_string(), pages)); }
        out.extend(self.palette.search(query, |path| self.admits_path(role, path)));
        out
    }
}

fn flatten(entries: &[NavigationEntry], out: &mut Vec<PaletteItem>) {
    for e in entries {
        out.push(PaletteItem::new(e.label.as_str(), e.path.as_str()));
        flatten(&e.children, out);
    }
}
