//! Authorization: role policy, the per-navigation guard and the route table feeding it.

pub mod policy;
pub mod guard;
pub mod routes;

pub use policy::{Capability, CapabilityGrant, Decision, RolePolicy, RolePolicyBuilder};
pub use guard::{guard, RenderDecision, RouteGuard};
pub use routes::{Destination, RouteMatch, RouteTable};
