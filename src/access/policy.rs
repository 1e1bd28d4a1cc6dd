//! Declarative role policy: for every capability, what each role gets to see.

use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::identity::Role;

/// A guarded destination or action, named by slash-separated path, e.g. `machines/add`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Capability(String);

impl Capability {
    pub fn new<S: Into<String>>(name: S) -> Self { Capability(name.into()) }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl From<&str> for Capability {
    fn from(s: &str) -> Self { Capability(s.to_string()) }
}

impl Display for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(&self.0) }
}

/// Result of a policy lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Primary,
    Alternate(String),
    Redirect(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Primary,
    Alternate(String),
    /// `None` sends the role to the policy's default landing path.
    Redirect(Option<String>),
}

/// Behavior of one capability for every role.
#[derive(Debug, Clone)]
pub struct CapabilityGrant {
    capability: Capability,
    primary_view: String,
    outcomes: BTreeMap<Role, Outcome>,
}

impl CapabilityGrant {
    pub fn new<C: Into<Capability>, V: Into<String>>(capability: C, primary_view: V) -> Self {
        Self { capability: capability.into(), primary_view: primary_view.into(), outcomes: BTreeMap::new() }
    }

    /// Every role gets the primary view.
    pub fn open<C: Into<Capability>, V: Into<String>>(capability: C, primary_view: V) -> Self {
        Role::ALL.iter().fold(Self::new(capability, primary_view), |g, r| g.allow(*r))
    }

    /// `allowed` roles get the primary view; everyone else is sent to `fallback`.
    pub fn restricted<C: Into<Capability>, V: Into<String>>(capability: C, primary_view: V, allowed: &[Role], fallback: &str) -> Self {
        Role::ALL.iter().fold(Self::new(capability, primary_view), |g, r| {
            if allowed.contains(r) { g.allow(*r) } else { g.redirect(*r, fallback) }
        })
    }

    pub fn allow(mut self, role: Role) -> Self {
        self.outcomes.insert(role, Outcome::Primary);
        self
    }

    pub fn alternate<V: Into<String>>(mut self, role: Role, view: V) -> Self {
        self.outcomes.insert(role, Outcome::Alternate(view.into()));
        self
    }

    pub fn redirect<P: Into<String>>(mut self, role: Role, path: P) -> Self {
        self.outcomes.insert(role, Outcome::Redirect(Some(path.into())));
        self
    }

    pub fn redirect_default(mut self, role: Role) -> Self {
        self.outcomes.insert(role, Outcome::Redirect(None));
        self
    }

    pub fn capability(&self) -> &Capability { &self.capability }

    pub fn primary_view(&self) -> &str { &self.primary_view }

    fn missing_roles(&self) -> Vec<Role> {
        Role::ALL.iter().copied().filter(|r| !self.outcomes.contains_key(r)).collect()
    }
}

/// Immutable policy table. Construct through [`RolePolicy::builder`].
#[derive(Debug, Clone)]
pub struct RolePolicy {
    grants: HashMap<Capability, CapabilityGrant>,
    default_landing: String,
}

pub struct RolePolicyBuilder {
    default_landing: String,
    grants: Vec<CapabilityGrant>,
}

impl RolePolicyBuilder {
    pub fn grant(mut self, grant: CapabilityGrant) -> Self {
        self.grants.push(grant);
        self
    }

    /// Reject authoring mistakes up front: a grant that leaves a role undefined,
    /// a capability declared twice, or a redirect that is not an absolute path.
    pub fn build(self) -> AppResult<RolePolicy> {
        if !self.default_landing.starts_with('/') {
            return Err(AppError::policy("bad_landing".to_string(), format!("default landing '{}' must be an absolute path", self.default_landing)));
        }
        let mut grants: HashMap<Capability, CapabilityGrant> = HashMap::with_capacity(self.grants.len());
        for g in self.grants {
            let missing = g.missing_roles();
            if !missing.is_empty() {
                let names: Vec<&str> = missing.iter().map(|r| r.as_str()).collect();
                return Err(AppError::policy("incomplete_grant".to_string(), format!("capability '{}' has no behavior for: {}", g.capability, names.join(", "))));
            }
            for outcome in g.outcomes.values() {
                if let Outcome::Redirect(Some(path)) = outcome {
                    if !path.starts_with('/') {
                        return Err(AppError::policy("bad_redirect".to_string(), format!("capability '{}' redirects to relative path '{}'", g.capability, path)));
                    }
                }
            }
            if grants.contains_key(&g.capability) {
                return Err(AppError::policy("duplicate_grant".to_string(), format!("capability '{}' declared twice", g.capability)));
            }
            grants.insert(g.capability.clone(), g);
        }
        Ok(RolePolicy { grants, default_landing: self.default_landing })
    }
}

impl RolePolicy {
    pub fn builder<S: Into<String>>(default_landing: S) -> RolePolicyBuilder {
        RolePolicyBuilder { default_landing: default_landing.into(), grants: Vec::new() }
    }

    pub fn default_landing(&self) -> &str { &self.default_landing }

    /// Pure lookup. Unknown capabilities and undefined roles fail closed to the default landing.
    pub fn resolve(&self, role: Role, capability: &Capability) -> Decision {
        let Some(grant) = self.grants.get(capability) else {
            return Decision::Redirect(self.default_landing.clone());
        };
        match grant.outcomes.get(&role) {
            Some(Outcome::Primary) => Decision::Primary,
            Some(Outcome::Alternate(view)) => Decision::Alternate(view.clone()),
            Some(Outcome::Redirect(Some(path))) => Decision::Redirect(path.clone()),
            Some(Outcome::Redirect(None)) | None => Decision::Redirect(self.default_landing.clone()),
        }
    }

    pub fn primary_view(&self, capability: &Capability) -> Option<&str> {
        self.grants.get(capability).map(|g| g.primary_view())
    }

    /// True when the role is shown something at this capability rather than sent away.
    pub fn admits(&self, role: Role, capability: &Capability) -> bool {
        !matches!(self.resolve(role, capability), Decision::Redirect(_))
    }

    pub fn roles_admitted(&self, capability: &Capability) -> Vec<Role> {
        Role::ALL.iter().copied().filter(|r| self.admits(*r, capability)).collect()
    }

    pub fn capabilities(&self) -> Vec<&Capability> {
        let mut caps: Vec<&Capability> = self.grants.keys().collect();
        caps.sort();
        caps
    }

    /// The maintenance console's policy table.
    pub fn standard(default_landing: &str) -> AppResult<RolePolicy> {
        use Role::*;
        let editors = [Admin, Technician];
        RolePolicy::builder(default_landing)
            .grant(CapabilityGrant::new("dashboard", "AdminDashboard")
                .allow(Admin)
                .alternate(Technician, "TechnicianDashboard")
                .allow(Viewer))
            .grant(CapabilityGrant::open("machines", "MachinesPage"))
            .grant(CapabilityGrant::open("machines/detail", "MachineDetailPage"))
            .grant(CapabilityGrant::restricted("machines/add", "AddMachinePage", &[Admin], default_landing))
            .grant(CapabilityGrant::restricted("machines/edit", "EditMachinePage", &editors, "/machines"))
            .grant(CapabilityGrant::open("maintenance", "MaintenancePage"))
            .grant(CapabilityGrant::open("maintenance/tasks", "MaintenanceTasksPage"))
            .grant(CapabilityGrant::restricted("maintenance/tasks/create", "CreateTaskPage", &editors, "/maintenance/tasks"))
            .grant(CapabilityGrant::open("maintenance/schedules", "MaintenanceSchedulesPage"))
            .grant(CapabilityGrant::restricted("maintenance/schedules/create", "CreateSchedulePage", &editors, "/maintenance/schedules"))
            .grant(CapabilityGrant::open("inventory", "InventoryPage"))
            .grant(CapabilityGrant::restricted("inventory/add", "AddPartPage", &editors, "/inventory"))
            .grant(CapabilityGrant::restricted("inventory/edit", "EditPartPage", &editors, "/inventory"))
            .grant(CapabilityGrant::open("reports", "ReportsPage"))
            .grant(CapabilityGrant::restricted("reports/generate", "GenerateReportPage", &editors, "/reports"))
            .grant(CapabilityGrant::open("alerts", "AlertsPage"))
            .grant(CapabilityGrant::new("analytics", "AnalyticsPage")
                .allow(Admin)
                .redirect_default(Technician)
                .redirect_default(Viewer))
            .grant(CapabilityGrant::new("users", "UsersPage")
                .allow(Admin)
                .redirect_default(Technician)
                .redirect_default(Viewer))
            .grant(CapabilityGrant::new("users/add", "AddUserPage")
                .allow(Admin)
                .alternate(Technician, "RestrictedAccess")
                .alternate(Viewer, "RestrictedAccess"))
            .grant(CapabilityGrant::open("settings", "SettingsPage"))
            .grant(CapabilityGrant::open("help", "HelpPage"))
            .grant(CapabilityGrant::open("profile", "ProfilePage"))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard() -> RolePolicy { RolePolicy::standard("/dashboard").unwrap() }

    #[test]
    fn unknown_capability_fails_closed_for_every_role() {
        let p = standard();
        let cap = Capability::new("reactor/override");
        for role in Role::ALL {
            assert_eq!(p.resolve(role, &cap), Decision::Redirect("/dashboard".into()));
            assert!(!p.admits(role, &cap));
        }
    }

    #[test]
    fn incomplete_grant_is_rejected_at_build() {
        let err = RolePolicy::builder("/dashboard")
            .grant(CapabilityGrant::new("machines", "MachinesPage").allow(Role::Admin).allow(Role::Viewer))
            .build()
            .unwrap_err();
        assert_eq!(err.code_str(), "incomplete_grant");
        assert!(err.message().contains("technician"));
    }

    #[test]
    fn duplicate_and_relative_redirects_rejected() {
        let dup = RolePolicy::builder("/dashboard")
            .grant(CapabilityGrant::open("help", "HelpPage"))
            .grant(CapabilityGrant::open("help", "HelpPage"))
            .build()
            .unwrap_err();
        assert_eq!(dup.code_str(), "duplicate_grant");

        let rel = RolePolicy::builder("/dashboard")
            .grant(CapabilityGrant::restricted("users", "UsersPage", &[Role::Admin], "dashboard"))
            .build()
            .unwrap_err();
        assert_eq!(rel.code_str(), "bad_redirect");

        assert_eq!(RolePolicy::builder("home").build().unwrap_err().code_str(), "bad_landing");
    }

    #[test]
    fn dashboard_branches_by_role() {
        let p = standard();
        let cap = Capability::new("dashboard");
        assert_eq!(p.resolve(Role::Admin, &cap), Decision::Primary);
        assert_eq!(p.resolve(Role::Technician, &cap), Decision::Alternate("TechnicianDashboard".into()));
        assert_eq!(p.resolve(Role::Viewer, &cap), Decision::Primary);
        assert_eq!(p.primary_view(&cap), Some("AdminDashboard"));
    }

    #[test]
    fn add_machine_is_admin_only() {
        let p = standard();
        let cap = Capability::new("machines/add");
        assert_eq!(p.resolve(Role::Admin, &cap), Decision::Primary);
        assert_eq!(p.resolve(Role::Technician, &cap), Decision::Redirect("/dashboard".into()));
        assert_eq!(p.resolve(Role::Viewer, &cap), Decision::Redirect("/dashboard".into()));
        assert_eq!(p.roles_admitted(&cap), vec![Role::Admin]);
    }

    #[test]
    fn redirect_default_follows_configured_landing() {
        let p = RolePolicy::standard("/home").unwrap();
        assert_eq!(p.resolve(Role::Viewer, &Capability::new("users")), Decision::Redirect("/home".into()));
        assert_eq!(p.resolve(Role::Viewer, &Capability::new("inventory/add")), Decision::Redirect("/inventory".into()));
    }

    #[test]
    fn restricted_alternate_still_admits() {
        let p = standard();
        let cap = Capability::new("users/add");
        assert_eq!(p.resolve(Role::Viewer, &cap), Decision::Alternate("RestrictedAccess".into()));
        assert_eq!(p.roles_admitted(&cap), Role::ALL.to_vec());
    }

    #[test]
    fn every_standard_grant_is_total() {
        let p = standard();
        assert!(p.capabilities().len() >= 20);
        for cap in p.capabilities() {
            for role in Role::ALL {
                // resolve must be defined and deterministic for every pair
                assert_eq!(p.resolve(role, cap), p.resolve(role, cap));
            }
        }
    }
}
