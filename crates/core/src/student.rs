//! Student account creation payload.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Body of `POST /admin/student`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudent {
    pub name: String,
    pub username: String,
    pub password: String,
}

impl NewStudent {
    /// Reject blank fields. Passwords are sent as entered.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (field, value) in [
            ("name", &self.name),
            ("username", &self.username),
            ("password", &self.password),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::Validation(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for NewStudent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewStudent")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
