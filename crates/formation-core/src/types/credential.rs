use std::fmt;

use crate::error::{FormationError, Result};

/// The shared secret authenticating every administrative call
#[derive(Clone, PartialEq, Eq)]
pub struct AdminCredential {
    username: String,
    password: String,
}

impl AdminCredential {
    /// Build a credential, rejecting empty parts
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let username = username.into();
        let password = password.into();
        if username.is_empty() {
            return Err(FormationError::MissingCredential("admin username"));
        }
        if password.is_empty() {
            return Err(FormationError::MissingCredential("admin password"));
        }
        Ok(Self { username, password })
    }

    /// Admin username
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Admin password
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for AdminCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
