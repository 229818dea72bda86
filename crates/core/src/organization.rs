//! Organization records and creation payloads.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::token::Token;
use crate::types::DbId;

/// Maximum accepted length of an organization display name.
pub const MAX_COMPANY_NAME_LENGTH: usize = 200;

/// An organization as returned by `GET /admin/companies`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub company_id: DbId,
    pub company_name: String,
    pub company_qr: Token,
}

/// Body of `POST /admin/company`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrganization {
    pub company_name: String,
    pub qr_code: Token,
}

impl NewOrganization {
    /// Build a creation payload, trimming and validating the name.
    pub fn new(company_name: &str, qr_code: Token) -> Result<Self, CoreError> {
        let company_name = company_name.trim();
        validate_company_name(company_name)?;
        Ok(Self {
            company_name: company_name.to_string(),
            qr_code,
        })
    }
}

/// Validate an organization display name.
pub fn validate_company_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation("companyName must not be empty".into()));
    }
    if name.chars().count() > MAX_COMPANY_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "companyName must be at most {MAX_COMPANY_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}
