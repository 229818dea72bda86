//! In-memory record store for organizations, students, and visits.
//!
//! Enforces the registry invariants the clients rely on: organization tokens
//! are unique, student usernames are unique, and a visit submitted twice
//! under the same idempotency key is recorded once.

use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;
use visitlog_core::error::CoreError;
use visitlog_core::messages;
use visitlog_core::organization::{NewOrganization, Organization};
use visitlog_core::student::NewStudent;
use visitlog_core::types::{DbId, Timestamp};
use visitlog_core::visit::{VisitAck, VisitEvent};

/// A student account. The password is not retained.
#[derive(Debug, Clone, Serialize)]
pub struct StudentRecord {
    pub student_id: DbId,
    pub name: String,
    pub username: String,
    pub created_at: Timestamp,
}

/// A recorded visit.
#[derive(Debug, Clone, Serialize)]
pub struct VisitRecord {
    pub visit_id: DbId,
    pub student_id: String,
    pub company_id: DbId,
    pub company_qr: String,
    pub scan_time: Timestamp,
    pub recorded_at: Timestamp,
    pub idempotency_key: Option<String>,
}

/// Result of [`VisitStore::record_visit`].
#[derive(Debug, Clone)]
pub struct RecordedVisit {
    pub visit_id: DbId,
    pub ack: VisitAck,
    /// `true` when the idempotency key had already been seen and no new
    /// visit was written.
    pub replayed: bool,
}

/// Snapshot of record counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub organizations: usize,
    pub students: usize,
    pub visits: usize,
}

#[derive(Default)]
struct StoreInner {
    next_id: DbId,
    companies: Vec<Organization>,
    students: Vec<StudentRecord>,
    visits: Vec<VisitRecord>,
    /// Idempotency key -> (visit id, original acknowledgment).
    replays: HashMap<String, (DbId, VisitAck)>,
}

impl StoreInner {
    fn allocate_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }
}

/// Process-local record store shared by all handlers.
pub struct VisitStore {
    inner: RwLock<StoreInner>,
}

impl Default for VisitStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VisitStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
        }
    }

    /// Create an organization. Rejects a token already assigned to another
    /// organization.
    pub async fn create_organization(
        &self,
        input: NewOrganization,
    ) -> Result<Organization, CoreError> {
        let mut inner = self.inner.write().await;

        if inner
            .companies
            .iter()
            .any(|c| c.company_qr == input.qr_code)
        {
            return Err(CoreError::Conflict(format!(
                "Token '{}' is already assigned to another company",
                input.qr_code
            )));
        }

        let company = Organization {
            company_id: inner.allocate_id(),
            company_name: input.company_name,
            company_qr: input.qr_code,
        };
        inner.companies.push(company.clone());
        Ok(company)
    }

    /// All organizations in creation order.
    pub async fn list_organizations(&self) -> Vec<Organization> {
        self.inner.read().await.companies.clone()
    }

    /// Create a student account. Usernames are unique.
    pub async fn create_student(&self, input: NewStudent) -> Result<StudentRecord, CoreError> {
        let mut inner = self.inner.write().await;

        if inner.students.iter().any(|s| s.username == input.username) {
            return Err(CoreError::Conflict(format!(
                "Username '{}' is already taken",
                input.username
            )));
        }

        let student = StudentRecord {
            student_id: inner.allocate_id(),
            name: input.name,
            username: input.username,
            created_at: Utc::now(),
        };
        inner.students.push(student.clone());
        Ok(student)
    }

    /// Record a visit for a known organization token.
    ///
    /// A repeated `idempotency_key` returns the original acknowledgment
    /// without writing a second visit.
    pub async fn record_visit(
        &self,
        event: VisitEvent,
        idempotency_key: Option<&str>,
    ) -> Result<RecordedVisit, CoreError> {
        let mut inner = self.inner.write().await;

        if let Some((visit_id, ack)) = idempotency_key.and_then(|key| inner.replays.get(key)) {
            return Ok(RecordedVisit {
                visit_id: *visit_id,
                ack: ack.clone(),
                replayed: true,
            });
        }

        let company_id = inner
            .companies
            .iter()
            .find(|c| c.company_qr.as_str() == event.company_qr)
            .map(|c| c.company_id)
            .ok_or_else(|| CoreError::NotFound {
                entity: "Company QR code",
                key: event.company_qr.clone(),
            })?;

        let visit_id = inner.allocate_id();
        let ack = VisitAck {
            message: messages::VISIT_RECORDED.to_string(),
        };

        inner.visits.push(VisitRecord {
            visit_id,
            student_id: event.student_id,
            company_id,
            company_qr: event.company_qr,
            scan_time: event.scan_time,
            recorded_at: Utc::now(),
            idempotency_key: idempotency_key.map(str::to_string),
        });
        if let Some(key) = idempotency_key {
            inner.replays.insert(key.to_string(), (visit_id, ack.clone()));
        }

        Ok(RecordedVisit {
            visit_id,
            ack,
            replayed: false,
        })
    }

    /// All recorded visits in arrival order.
    pub async fn list_visits(&self) -> Vec<VisitRecord> {
        self.inner.read().await.visits.clone()
    }

    /// Record counts, for the health endpoint.
    pub async fn stats(&self) -> StoreStats {
        let inner = self.inner.read().await;
        StoreStats {
            organizations: inner.companies.len(),
            students: inner.students.len(),
            visits: inner.visits.len(),
        }
    }
}
