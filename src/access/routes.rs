//! Path -> destination table. Patterns use `:name` for a single dynamic segment.

use std::collections::BTreeMap;

use super::policy::Capability;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Reachable without a session (login, registration).
    Public(String),
    Protected(Capability),
    Redirect(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone)]
struct RouteEntry {
    pattern: String,
    segments: Vec<Segment>,
    destination: Destination,
}

impl RouteEntry {
    fn literal_count(&self) -> usize {
        self.segments.iter().filter(|s| matches!(s, Segment::Literal(_))).count()
    }

    fn capture(&self, parts: &[&str]) -> Option<BTreeMap<String, String>> {
        if parts.len() != self.segments.len() { return None; }
        let mut params = BTreeMap::new();
        for (seg, part) in self.segments.iter().zip(parts) {
            match seg {
                Segment::Literal(lit) if lit.as_str() == *part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => { params.insert(name.clone(), (*part).to_string()); }
            }
        }
        Some(params)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub pattern: String,
    pub destination: Destination,
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RouteEntry>,
}

fn split_path(path: &str) -> Vec<&str> {
    let path = path.split(['?', '#']).next().unwrap_or("");
    path.split('/').filter(|s| !s.is_empty()).collect()
}

impl RouteTable {
    pub fn new() -> Self { Self::default() }

    pub fn route(mut self, pattern: &str, destination: Destination) -> Self {
        let segments = split_path(pattern)
            .into_iter()
            .map(|s| match s.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(s.to_string()),
            })
            .collect();
        self.routes.push(RouteEntry { pattern: pattern.to_string(), segments, destination });
        self
    }

    pub fn protected(self, pattern: &str, capability: &str) -> Self {
        self.route(pattern, Destination::Protected(Capability::new(capability)))
    }

    /// Most specific match wins (more literal segments); ties go to the earlier route.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch> {
        let parts = split_path(path);
        let mut best: Option<(&RouteEntry, BTreeMap<String, String>)> = None;
        for entry in &self.routes {
            if let Some(params) = entry.capture(&parts) {
                let better = match &best {
                    Some((cur, _)) => entry.literal_count() > cur.literal_count(),
                    None => true,
                };
                if better { best = Some((entry, params)); }
            }
        }
        best.map(|(e, params)| RouteMatch { pattern: e.pattern.clone(), destination: e.destination.clone(), params })
    }

    /// First parameter-free pattern leading to `capability`.
    pub fn path_for(&self, capability: &Capability) -> Option<&str> {
        self.routes
            .iter()
            .filter(|e| e.segments.iter().all(|s| matches!(s, Segment::Literal(_))))
            .find(|e| matches!(&e.destination, Destination::Protected(c) if c == capability))
            .map(|e| e.pattern.as_str())
    }

    pub fn patterns(&self) -> impl Iterator<Item = (&str, &Destination)> {
        self.routes.iter().map(|e| (e.pattern.as_str(), &e.destination))
    }

    /// The maintenance console's routes. The dashboard is mounted at `landing_path`.
    pub fn standard(landing_path: &str, login_path: &str) -> Self {
        RouteTable::new()
            .route(login_path, Destination::Public("LoginPage".into()))
            .route("/register", Destination::Public("RegisterPage".into()))
            .route("/", Destination::Redirect(landing_path.to_string()))
            .protected(landing_path, "dashboard")
            .protected("/machines", "machines")
            .protected("/machines/add", "machines/add")
            .protected("/machines/:id", "machines/detail")
            .protected("/machines/:id/edit", "machines/edit")
            .protected("/maintenance", "maintenance")
            .protected("/maintenance/tasks", "maintenance/tasks")
            .protected("/maintenance/tasks/create", "maintenance/tasks/create")
            .protected("/maintenance/schedules", "maintenance/schedules")
            .protected("/maintenance/schedules/create", "maintenance/schedules/create")
            .protected("/inventory", "inventory")
            .protected("/inventory/add", "inventory/add")
            .protected("/inventory/:id/edit", "inventory/edit")
            .protected("/reports", "reports")
            .protected("/reports/generate", "reports/generate")
            .protected("/alerts", "alerts")
            .protected("/analytics", "analytics")
            .protected("/users", "users")
            .protected("/users/add", "users/add")
            .protected("/settings", "settings")
            .protected("/help", "help")
            .protected("/profile", "profile")
    }
}
