use std::collections::BTreeSet;

use crate::access::{Capability, RolePolicy};
use crate::identity::Role;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationEntry {
    pub label: String,
    pub path: String,
    pub destination: Capability,
    pub required_roles: BTreeSet<Role>,
    pub children: Vec<NavigationEntry>,
}

impl NavigationEntry {
    /// Entry with explicitly declared roles. Prefer [`NavigationEntry::for_capability`];
    /// hand-declared roles can drift from the policy (see [`audit`]).
    pub fn new<S: Into<String>>(label: S, path: S, destination: Capability, roles: &[Role]) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
            destination,
            required_roles: roles.iter().copied().collect(),
            children: Vec::new(),
        }
    }

    /// Entry whose visibility is derived from the policy, so it matches the guard by construction.
    pub fn for_capability<S: Into<String>>(label: S, path: S, destination: &str, policy: &RolePolicy) -> Self {
        let destination = Capability::new(destination);
        let required_roles = policy.roles_admitted(&destination).into_iter().collect();
        Self { label: label.into(), path: path.into(), destination, required_roles, children: Vec::new() }
    }

    pub fn with_children(mut self, children: Vec<NavigationEntry>) -> Self {
        self.children = children;
        self
    }

    pub fn is_visible_to(&self, role: Role) -> bool { self.required_roles.contains(&role) }
}

/// Entries the role may see, children filtered recursively, configuration order kept.
/// A hidden parent hides its whole subtree.
pub fn visible_entries(role: Role, entries: &[NavigationEntry]) -> Vec<NavigationEntry> {
    entries
        .iter()
        .filter(|e| e.is_visible_to(role))
        .map(|e| NavigationEntry {
            label: e.label.clone(),
            path: e.path.clone(),
            destination: e.destination.clone(),
            required_roles: e.required_roles.clone(),
            children: visible_entries(role, &e.children),
        })
        .collect()
}

/// An entry whose declared roles disagree with what the policy admits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuDrift {
    pub label: String,
    pub destination: Capability,
    pub declared: BTreeSet<Role>,
    pub admitted: BTreeSet<Role>,
}

pub fn audit(policy: &RolePolicy, entries: &[NavigationEntry]) -> Vec<MenuDrift> {
    let mut out = Vec::new();
    for e in entries {
        let admitted: BTreeSet<Role> = policy.roles_admitted(&e.destination).into_iter().collect();
        if admitted != e.required_roles {
            out.push(MenuDrift {
                label: e.label.clone(),
                destination: e.destination.clone(),
                declared: e.required_roles.clone(),
                admitted,
            });
        }
        out.extend(audit(policy, &e.children));
    }
    out
}

/// Sidebar of the maintenance console. Dashboard points at the policy's landing path.
pub fn standard_menu(policy: &RolePolicy) -> Vec<NavigationEntry> {
    let entry = |label: &str, path: &str, cap: &str| NavigationEntry::for_capability(label, path, cap, policy);
    vec![
        entry("Dashboard", policy.default_landing(), "dashboard"),
        entry("Machines", "/machines", "machines"),
        entry("Maintenance", "/maintenance", "maintenance").with_children(vec![
            entry("Tasks", "/maintenance/tasks", "maintenance/tasks"),
            entry("Schedules", "/maintenance/schedules", "maintenance/schedules"),
        ]),
        entry("Parts Inventory", "/inventory", "inventory"),
        entry("Reports", "/reports", "reports"),
        entry("Alerts", "/alerts", "alerts"),
        entry("Analytics", "/analytics", "analytics"),
        entry("User Management", "/users", "users"),
        entry("Settings", "/settings", "settings"),
        entry("Help", "/help", "help"),
    ]
}
