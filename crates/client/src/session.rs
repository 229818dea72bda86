//! Session context: the submitter identity and the admin bearer credential.
//!
//! Collaborators receive these explicitly instead of reading ambient storage.
//! The credential file plays the role of the browser's local storage.

use std::fmt;
use std::path::Path;

use visitlog_core::error::CoreError;

/// Admin bearer credential. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw credential, rejecting blank values.
    pub fn new(raw: impl Into<String>) -> Result<Self, CoreError> {
        let raw = raw.into().trim().to_string();
        if raw.is_empty() {
            return Err(CoreError::Validation("Credential must not be empty".into()));
        }
        Ok(Self(raw))
    }

    /// The secret, for attaching to a request header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Read a credential from `path`. A missing or blank file yields `None`.
    pub async fn load(path: &Path) -> std::io::Result<Option<Self>> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => Ok(Self::new(contents).ok()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Persist the credential to `path`, creating parent directories.
    pub async fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &self.0).await
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Per-user session state owned by the client views.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    credential: Option<Credential>,
    student_id: Option<String>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn with_student_id(mut self, student_id: impl Into<String>) -> Self {
        self.student_id = Some(student_id.into());
        self
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn student_id(&self) -> Option<&str> {
        self.student_id.as_deref()
    }
}
