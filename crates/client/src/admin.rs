//! Admin console: token issuance, organization and student creation.
//!
//! Keeps the generation state between "generate" and "add company", and a
//! status line that every operation overwrites with a user-facing message.

use visitlog_core::error::CoreError;
use visitlog_core::messages;
use visitlog_core::organization::Organization;
use visitlog_core::student::NewStudent;
use visitlog_core::token::{self, Token, TOKEN_LENGTH};

use crate::api::{BackendApi, BackendApiError};
use crate::registry::{OrganizationRegistry, RegistryError};
use crate::session::SessionContext;

/// Shown when a token cannot be issued.
pub const TOKEN_GENERATION_FAILED: &str = "Error generating QR code";

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    /// Organization creation attempted before a token was generated.
    #[error("No token has been generated")]
    TokenNotGenerated,

    #[error("Token generation failed: {0}")]
    Generation(#[source] CoreError),

    #[error("Invalid student: {0}")]
    InvalidStudent(#[source] CoreError),

    /// Student creation needs the admin bearer credential.
    #[error("No admin credential in session")]
    MissingCredential,

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Student creation failed: {0}")]
    Student(#[source] BackendApiError),
}

impl AdminError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::TokenNotGenerated => messages::TOKEN_REQUIRED,
            Self::Generation(_) => TOKEN_GENERATION_FAILED,
            Self::InvalidStudent(_) | Self::MissingCredential | Self::Student(_) => {
                messages::STUDENT_ADD_FAILED
            }
            Self::Registry(e) => e.user_message(),
        }
    }
}

/// Admin-side view state.
#[derive(Debug)]
pub struct AdminConsole {
    api: BackendApi,
    registry: OrganizationRegistry,
    session: SessionContext,
    pending_token: Option<Token>,
    status: String,
}

impl AdminConsole {
    pub fn new(api: BackendApi, session: SessionContext) -> Self {
        Self {
            registry: OrganizationRegistry::new(api.clone()),
            api,
            session,
            pending_token: None,
            status: String::new(),
        }
    }

    /// Latest user-facing status message.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Token awaiting an "add company".
    pub fn pending_token(&self) -> Option<&Token> {
        self.pending_token.as_ref()
    }

    pub fn organizations(&self) -> &[Organization] {
        self.registry.organizations()
    }

    /// Load the registry. Only failures change the status line.
    pub async fn refresh(&mut self) -> Result<(), AdminError> {
        match self.registry.fetch_all().await {
            Ok(_) => Ok(()),
            Err(e) => {
                let err = AdminError::from(e);
                self.status = err.user_message().to_string();
                Err(err)
            }
        }
    }

    /// Issue a fresh token that is not used by any cached organization.
    pub fn generate_token(&mut self) -> Result<&Token, AdminError> {
        let generated = token::generate_unique(TOKEN_LENGTH, self.registry.tokens())
            .map_err(AdminError::Generation);
        let token = self.settle(generated, messages::TOKEN_GENERATED)?;

        tracing::info!(token = %token, "Token generated");
        Ok(&*self.pending_token.insert(token))
    }

    /// Use an externally supplied token instead of generating one.
    pub fn adopt_token(&mut self, raw: &str) -> Result<&Token, AdminError> {
        let adopted = Token::parse(raw).and_then(|token| {
            if self.registry.tokens().any(|t| *t == token) {
                Err(CoreError::Conflict(format!(
                    "Token '{token}' is already assigned"
                )))
            } else {
                Ok(token)
            }
        });
        let token = self.settle(adopted.map_err(AdminError::Generation), messages::TOKEN_GENERATED)?;
        Ok(&*self.pending_token.insert(token))
    }

    /// Create an organization under the pending token.
    ///
    /// Without a pending token nothing is sent to the backend. The token is
    /// consumed once the backend has accepted the organization.
    pub async fn add_company(&mut self, name: &str) -> Result<(), AdminError> {
        let Some(token) = self.pending_token.clone() else {
            tracing::debug!("Add company rejected: no token generated");
            return self.settle(Err(AdminError::TokenNotGenerated), messages::COMPANY_ADDED);
        };

        let result = self.registry.create(name, token).await;
        if matches!(result, Ok(()) | Err(RegistryError::RefreshAfterCreate(_))) {
            self.pending_token = None;
        }
        self.settle(result.map_err(AdminError::from), messages::COMPANY_ADDED)
    }

    /// Create a student account with the session's admin credential.
    pub async fn add_student(&mut self, student: NewStudent) -> Result<(), AdminError> {
        let result = self.create_student(&student).await;
        if result.is_ok() {
            tracing::info!(username = %student.username, "Student created");
        }
        self.settle(result, messages::STUDENT_ADDED)
    }

    async fn create_student(&self, student: &NewStudent) -> Result<(), AdminError> {
        student.validate().map_err(AdminError::InvalidStudent)?;
        let credential = self
            .session
            .credential()
            .ok_or(AdminError::MissingCredential)?;

        self.api
            .create_student(student, credential)
            .await
            .map_err(|e| {
                tracing::warn!(username = %student.username, error = %e, "Student creation failed");
                AdminError::Student(e)
            })
    }

    /// Record the status message for an operation result.
    fn settle<T>(&mut self, result: Result<T, AdminError>, success: &str) -> Result<T, AdminError> {
        self.status = match &result {
            Ok(_) => success.to_string(),
            Err(e) => e.user_message().to_string(),
        };
        result
    }
}
