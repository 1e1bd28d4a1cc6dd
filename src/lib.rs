pub mod error;
pub mod config;
pub mod storage;
pub mod identity;
pub mod access;
pub mod navigation;
pub mod notify;
pub mod shell;

pub use access::{guard, Capability, RenderDecision, RolePolicy, RouteGuard};
pub use error::{AppError, AppResult};
pub use identity::{Credentials, Identity, LoginOutcome, Profile, Role, Session, SessionStore};
pub use navigation::{visible_entries, NavigationEntry};
pub use shell::{AccessShell, Navigation};

// Test-only printing helper: expands to eprintln! during tests and debug builds.
// Usage: tprintln!("debug: {}", value);
#[cfg(any(test, debug_assertions))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ( eprintln!($($arg)*) );
}

// In release builds, provide a no-op tprintln! so calls compile without effect.
#[cfg(not(any(test, debug_assertions)))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ({
        // Preserve formatting checks in release without producing code
        if false { let _ = format!($($arg)*); }
    });
}
