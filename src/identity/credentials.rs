use std::fmt::{Debug, Formatter};

use crate::error::{AppError, AppResult};

/// Login input.
#[derive(Clone)]
pub struct Credentials {
    pub identifier: String,
    pub secret: String,
}

impl Credentials {
    pub fn new<S: Into<String>>(identifier: S, secret: S) -> Self {
        Self { identifier: identifier.into(), secret: secret.into() }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.identifier.trim().is_empty() {
            return Err(AppError::user("empty_identifier", "identifier must not be empty"));
        }
        if self.secret.is_empty() {
            return Err(AppError::user("empty_secret", "secret must not be empty"));
        }
        Ok(())
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Registration input.
#[derive(Clone)]
pub struct Profile {
    pub display_name: String,
    pub email: String,
    pub secret: String,
}

impl Profile {
    pub fn new<S: Into<String>>(display_name: S, email: S, secret: S) -> Self {
        Self { display_name: display_name.into(), email: email.into(), secret: secret.into() }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.display_name.trim().is_empty() {
            return Err(AppError::user("empty_name", "name must not be empty"));
        }
        let email = self.email.trim();
        if email.is_empty() {
            return Err(AppError::user("empty_email", "email must not be empty"));
        }
        // local@domain, both halves present
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
            _ => return Err(AppError::user("malformed_email", "email must look like name@domain")),
        }
        if self.secret.is_empty() {
            return Err(AppError::user("empty_secret", "secret must not be empty"));
        }
        Ok(())
    }
}

impl Debug for Profile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profile")
            .field("display_name", &self.display_name)
            .field("email", &self.email)
            .field("secret", &"<redacted>")
            .finish()
    }
}
