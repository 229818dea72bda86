//! Admin console workflows against the reference backend.

mod common;

use assert_matches::assert_matches;
use visitlog_client::admin::{AdminConsole, AdminError};
use visitlog_client::registry::RegistryError;
use visitlog_client::session::SessionContext;
use visitlog_core::messages;
use visitlog_core::organization::NewOrganization;
use visitlog_core::student::NewStudent;
use visitlog_core::token::Token;

fn student(username: &str) -> NewStudent {
    NewStudent {
        name: "Ada Lovelace".into(),
        username: username.into(),
        password: "analytical".into(),
    }
}

#[tokio::test]
async fn created_organization_appears_in_next_fetch() {
    let backend = common::spawn_backend().await;
    let mut console = AdminConsole::new(backend.api(), SessionContext::new());

    let token = console.generate_token().unwrap().clone();
    assert_eq!(token.as_str().len(), 10);
    assert_eq!(console.status(), messages::TOKEN_GENERATED);

    console.add_company("Acme Co").await.unwrap();
    assert_eq!(console.status(), messages::COMPANY_ADDED);
    assert!(console.pending_token().is_none());

    let orgs = console.organizations();
    assert_eq!(orgs.len(), 1);
    assert_eq!(orgs[0].company_name, "Acme Co");
    assert_eq!(orgs[0].company_qr, token);
}

#[tokio::test]
async fn add_company_without_token_sends_nothing() {
    let backend = common::spawn_backend().await;
    let mut console = AdminConsole::new(backend.api(), SessionContext::new());

    let err = console.add_company("Acme Co").await.unwrap_err();

    assert_matches!(err, AdminError::TokenNotGenerated);
    assert_eq!(console.status(), messages::TOKEN_REQUIRED);
    assert!(backend.store.list_organizations().await.is_empty());
}

#[tokio::test]
async fn adopted_token_is_registered_verbatim() {
    let backend = common::spawn_backend().await;
    let mut console = AdminConsole::new(backend.api(), SessionContext::new());

    console.adopt_token("aZ3kLm9Pqr").unwrap();
    console.add_company("Acme Co").await.unwrap();

    let stored = backend.store.list_organizations().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].company_qr.as_str(), "aZ3kLm9Pqr");
}

#[tokio::test]
async fn adopting_a_registered_token_is_rejected() {
    let backend = common::spawn_backend().await;
    backend
        .store
        .create_organization(
            NewOrganization::new("Acme Co", Token::parse("aZ3kLm9Pqr").unwrap()).unwrap(),
        )
        .await
        .unwrap();

    let mut console = AdminConsole::new(backend.api(), SessionContext::new());
    console.refresh().await.unwrap();

    assert_matches!(console.adopt_token("aZ3kLm9Pqr"), Err(AdminError::Generation(_)));
    assert!(console.pending_token().is_none());
}

#[tokio::test]
async fn invalid_name_keeps_pending_token() {
    let backend = common::spawn_backend().await;
    let mut console = AdminConsole::new(backend.api(), SessionContext::new());
    console.generate_token().unwrap();

    // Blank names never reach the backend.
    let err = console.add_company("   ").await.unwrap_err();

    assert_matches!(err, AdminError::Registry(RegistryError::Invalid(_)));
    assert_eq!(console.status(), messages::COMPANY_ADD_FAILED);
    assert!(console.pending_token().is_some());
}

#[tokio::test]
async fn unreachable_backend_reports_fetch_failure() {
    let mut console = AdminConsole::new(common::unreachable_api(), SessionContext::new());

    let err = console.refresh().await.unwrap_err();

    assert_matches!(err, AdminError::Registry(RegistryError::Fetch(_)));
    assert_eq!(console.status(), messages::COMPANIES_FETCH_FAILED);
    assert!(console.organizations().is_empty());
}

#[tokio::test]
async fn company_created_but_list_refresh_fails() {
    let backend = common::spawn_backend().await;
    let mut console = AdminConsole::new(backend.api(), SessionContext::new());
    console.refresh().await.unwrap();
    console.generate_token().unwrap();

    backend.set_fault(common::Fault::ListFails);
    let err = console.add_company("Acme Co").await.unwrap_err();

    assert_matches!(err, AdminError::Registry(RegistryError::RefreshAfterCreate(_)));
    assert_eq!(console.status(), messages::COMPANIES_FETCH_FAILED);
    // The backend accepted it, so the token is spent.
    assert!(console.pending_token().is_none());
    assert_eq!(backend.store.list_organizations().await.len(), 1);
    assert!(console.organizations().is_empty());
}

#[tokio::test]
async fn add_student_with_admin_credential() {
    let backend = common::spawn_backend().await;
    let mut console = AdminConsole::new(backend.api(), common::admin_session());

    console.add_student(student("ada")).await.unwrap();

    assert_eq!(console.status(), messages::STUDENT_ADDED);
}

#[tokio::test]
async fn add_student_without_credential_fails_locally() {
    let backend = common::spawn_backend().await;
    let mut console = AdminConsole::new(backend.api(), SessionContext::new());

    let err = console.add_student(student("ada")).await.unwrap_err();

    assert_matches!(err, AdminError::MissingCredential);
    assert_eq!(console.status(), messages::STUDENT_ADD_FAILED);
}

#[tokio::test]
async fn duplicate_username_is_rejected_by_backend() {
    let backend = common::spawn_backend().await;
    let mut console = AdminConsole::new(backend.api(), common::admin_session());
    console.add_student(student("ada")).await.unwrap();

    let err = console.add_student(student("ada")).await.unwrap_err();

    assert_matches!(err, AdminError::Student(_));
    assert_eq!(console.status(), messages::STUDENT_ADD_FAILED);
}
