//! Who is signed in, and as what.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod credentials;
mod provider;
mod session;

pub use principal::{Identity, Role};
pub use credentials::{Credentials, Profile};
pub use provider::{gen_token, CredentialVerifier, DemoVerifier};
pub use session::{LoginOutcome, Session, SessionStore};

#[cfg(test)]
#[path = "identity_tests.rs"]
mod identity_tests;
