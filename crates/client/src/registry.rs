//! Client-side cache of the organization registry.
//!
//! The backend is authoritative: after every creation the whole registry is
//! re-fetched to pick up backend-assigned ids. A failed call leaves the
//! previous cache in place.

use visitlog_core::error::CoreError;
use visitlog_core::messages;
use visitlog_core::organization::{NewOrganization, Organization};
use visitlog_core::token::Token;

use crate::api::{BackendApi, BackendApiError};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Invalid organization: {0}")]
    Invalid(#[from] CoreError),

    #[error("Failed to fetch organizations: {0}")]
    Fetch(#[source] BackendApiError),

    #[error("Failed to create organization: {0}")]
    Create(#[source] BackendApiError),

    /// The organization was created but the follow-up fetch failed; the
    /// cache does not include it yet.
    #[error("Organization created but refresh failed: {0}")]
    RefreshAfterCreate(#[source] BackendApiError),
}

impl RegistryError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Invalid(_) | Self::Create(_) => messages::COMPANY_ADD_FAILED,
            Self::Fetch(_) | Self::RefreshAfterCreate(_) => messages::COMPANIES_FETCH_FAILED,
        }
    }
}

/// Single-owner cache of organization records.
#[derive(Debug)]
pub struct OrganizationRegistry {
    api: BackendApi,
    cache: Vec<Organization>,
}

impl OrganizationRegistry {
    pub fn new(api: BackendApi) -> Self {
        Self {
            api,
            cache: Vec::new(),
        }
    }

    /// The last successfully fetched records.
    pub fn organizations(&self) -> &[Organization] {
        &self.cache
    }

    /// Tokens currently known to be in use.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.cache.iter().map(|org| &org.company_qr)
    }

    /// Replace the cache with the backend's current registry.
    pub async fn fetch_all(&mut self) -> Result<&[Organization], RegistryError> {
        let organizations = self.api.list_companies().await.map_err(|e| {
            tracing::warn!(error = %e, cached = self.cache.len(), "Registry fetch failed");
            RegistryError::Fetch(e)
        })?;

        tracing::debug!(count = organizations.len(), "Registry refreshed");
        self.cache = organizations;
        Ok(&self.cache)
    }

    /// Create an organization, then re-fetch the registry.
    pub async fn create(&mut self, name: &str, token: Token) -> Result<(), RegistryError> {
        let input = NewOrganization::new(name, token)?;

        self.api.create_company(&input).await.map_err(|e| {
            tracing::warn!(
                company_name = %input.company_name,
                error = %e,
                "Organization creation failed",
            );
            RegistryError::Create(e)
        })?;

        tracing::info!(
            company_name = %input.company_name,
            token = %input.qr_code,
            "Organization created",
        );

        match self.fetch_all().await {
            Ok(_) => Ok(()),
            Err(RegistryError::Fetch(e)) => Err(RegistryError::RefreshAfterCreate(e)),
            Err(other) => Err(other),
        }
    }
}
