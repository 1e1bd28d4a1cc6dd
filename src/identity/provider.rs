use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::credentials::{Credentials, Profile};
use super::principal::{Identity, Role};
use crate::error::AppResult;

/// Establishes trust for raw credentials. The session store treats the result as opaque.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, creds: &Credentials) -> AppResult<Identity>;
    async fn enroll(&self, profile: &Profile) -> AppResult<()>;
}

/// Stand-in verifier for the demo console: accepts any well-formed credentials and
/// picks the role from the identifier (`admin` before `tech`, anything else views).
#[derive(Debug, Clone, Default)]
pub struct DemoVerifier {
    pub login_latency: Duration,
    pub register_latency: Duration,
}

impl DemoVerifier {
    pub fn new(login_latency: Duration, register_latency: Duration) -> Self {
        Self { login_latency, register_latency }
    }

    pub fn role_for(identifier: &str) -> Role {
        let lower = identifier.to_ascii_lowercase();
        if lower.contains("admin") {
            Role::Admin
        } else if lower.contains("tech") {
            Role::Technician
        } else {
            Role::Viewer
        }
    }
}

#[async_trait]
impl CredentialVerifier for DemoVerifier {
    async fn verify(&self, creds: &Credentials) -> AppResult<Identity> {
        if !self.login_latency.is_zero() { tokio::time::sleep(self.login_latency).await; }
        let role = Self::role_for(&creds.identifier);
        let (id, name) = match role {
            Role::Admin => ("1", "Admin User"),
            Role::Technician => ("2", "Technician User"),
            Role::Viewer => ("3", "Viewer User"),
        };
        debug!(target: "mmms::identity", "demo verifier accepted {} as {}", creds.identifier, role);
        Ok(Identity::new(id, name, creds.identifier.as_str(), role))
    }

    async fn enroll(&self, profile: &Profile) -> AppResult<()> {
        if !self.register_latency.is_zero() { tokio::time::sleep(self.register_latency).await; }
        debug!(target: "mmms::identity", "demo verifier enrolled {}", profile.email);
        Ok(())
    }
}

/// 256-bit random token, base64url without padding.
pub fn gen_token() -> AppResult<String> {
    use base64::Engine;
    let mut buf = [0u8; 32];
    getrandom::getrandom(&mut buf)
        .map_err(|e| crate::error::AppError::internal("token_entropy".to_string(), e.to_string()))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}
