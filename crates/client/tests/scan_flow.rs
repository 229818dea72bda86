//! Student scan flow: dispatcher, scan loop, and the full admin-to-student
//! round trip against the reference backend.

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use visitlog_client::admin::AdminConsole;
use visitlog_client::decoder::LineFrameSource;
use visitlog_client::dispatcher::{SubmissionDispatcher, SubmissionError};
use visitlog_client::scanner::{spawn_frame_poller, FrameEvent, ScannerConfig, Scanner};
use visitlog_client::session::SessionContext;
use visitlog_core::messages;
use visitlog_core::organization::NewOrganization;
use visitlog_core::scan::{DecodeAttempt, ScanSession};
use visitlog_core::token::Token;

const ACME_TOKEN: &str = "aZ3kLm9Pqr";
const GLOBEX_TOKEN: &str = "Q7wErTy2Ui";

async fn register(backend: &common::TestBackend, name: &str, token: &str) {
    backend
        .store
        .create_organization(NewOrganization::new(name, Token::parse(token).unwrap()).unwrap())
        .await
        .unwrap();
}

fn text(code: &str) -> FrameEvent {
    Ok(DecodeAttempt::DecodedText(code.to_string()))
}

fn empty() -> FrameEvent {
    Ok(DecodeAttempt::Empty)
}

fn scanner_for(backend: &common::TestBackend) -> Scanner {
    let dispatcher = Arc::new(SubmissionDispatcher::new(backend.api()));
    Scanner::new(dispatcher, "123", Duration::ZERO)
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dispatcher_returns_backend_message() {
    let backend = common::spawn_backend().await;
    register(&backend, "Acme Co", ACME_TOKEN).await;
    let dispatcher = SubmissionDispatcher::new(backend.api());

    let candidate = ScanSession::new()
        .observe(DecodeAttempt::from_text(ACME_TOKEN))
        .unwrap();
    let ack = dispatcher.submit(&candidate, "123").await.unwrap();

    assert_eq!(ack.message, messages::VISIT_RECORDED);
    let visits = backend.store.list_visits().await;
    assert_eq!(visits.len(), 1);
    assert_eq!(visits[0].student_id, "123");
    assert_eq!(visits[0].company_qr, ACME_TOKEN);
}

#[tokio::test]
async fn dispatcher_network_failure_is_generic() {
    let dispatcher = SubmissionDispatcher::new(common::unreachable_api());
    let candidate = ScanSession::new()
        .observe(DecodeAttempt::from_text(ACME_TOKEN))
        .unwrap();

    let err = dispatcher.submit(&candidate, "123").await.unwrap_err();

    assert_matches!(err, SubmissionError::Backend(_));
    assert_eq!(err.user_message(), messages::SUBMISSION_FAILED);
}

#[tokio::test]
async fn dispatcher_unknown_code_fails() {
    let backend = common::spawn_backend().await;
    let dispatcher = SubmissionDispatcher::new(backend.api());
    let candidate = ScanSession::new()
        .observe(DecodeAttempt::from_text("not-a-token"))
        .unwrap();

    let err = dispatcher.submit(&candidate, "123").await.unwrap_err();

    assert_eq!(err.user_message(), messages::SUBMISSION_FAILED);
    assert!(backend.store.list_visits().await.is_empty());
}

#[tokio::test]
async fn resubmitting_a_candidate_records_one_visit() {
    let backend = common::spawn_backend().await;
    register(&backend, "Acme Co", ACME_TOKEN).await;
    let dispatcher = SubmissionDispatcher::new(backend.api());
    let candidate = ScanSession::new()
        .observe(DecodeAttempt::from_text(ACME_TOKEN))
        .unwrap();

    let first = dispatcher.submit(&candidate, "123").await.unwrap();
    let second = dispatcher.submit(&candidate, "123").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(backend.store.list_visits().await.len(), 1);
}

#[tokio::test]
async fn blank_submitter_is_rejected_before_sending() {
    let backend = common::spawn_backend().await;
    register(&backend, "Acme Co", ACME_TOKEN).await;
    let dispatcher = SubmissionDispatcher::new(backend.api());
    let candidate = ScanSession::new()
        .observe(DecodeAttempt::from_text(ACME_TOKEN))
        .unwrap();

    let err = dispatcher.submit(&candidate, "  ").await.unwrap_err();

    assert_matches!(err, SubmissionError::Invalid(_));
    assert!(backend.store.list_visits().await.is_empty());
}

// ---------------------------------------------------------------------------
// Scan loop
// ---------------------------------------------------------------------------

#[tokio::test]
async fn repeated_frames_of_one_presentation_submit_once() {
    let backend = common::spawn_backend().await;
    register(&backend, "Acme Co", ACME_TOKEN).await;
    let scanner = scanner_for(&backend);
    let status = scanner.subscribe();
    let (tx, rx) = mpsc::channel(32);

    for _ in 0..10 {
        tx.send(text(ACME_TOKEN)).await.unwrap();
    }
    for _ in 0..5 {
        tx.send(empty()).await.unwrap();
    }
    drop(tx);

    let report = scanner.run(rx, CancellationToken::new()).await;

    assert_eq!(report.frames, 15);
    assert_eq!(report.dispatched, 1);
    assert_eq!(report.succeeded, 1);
    assert_eq!(backend.store.list_visits().await.len(), 1);
    assert_eq!(*status.borrow(), "Time in done!");
}

#[tokio::test]
async fn different_code_after_outcome_is_submitted() {
    let backend = common::spawn_backend().await;
    register(&backend, "Acme Co", ACME_TOKEN).await;
    register(&backend, "Globex", GLOBEX_TOKEN).await;
    let scanner = scanner_for(&backend);
    let mut status = scanner.subscribe();
    let (tx, rx) = mpsc::channel(8);
    let run = tokio::spawn(scanner.run(rx, CancellationToken::new()));

    tx.send(text(ACME_TOKEN)).await.unwrap();
    status.wait_for(|s| s == "Time in done!").await.unwrap();
    tx.send(text(GLOBEX_TOKEN)).await.unwrap();
    drop(tx);

    let report = run.await.unwrap();

    assert_eq!(report.dispatched, 2);
    let visits = backend.store.list_visits().await;
    let codes: Vec<_> = visits.iter().map(|v| v.company_qr.as_str()).collect();
    assert_eq!(codes, vec![ACME_TOKEN, GLOBEX_TOKEN]);
}

#[tokio::test]
async fn same_code_presented_again_after_leaving_view() {
    let backend = common::spawn_backend().await;
    register(&backend, "Acme Co", ACME_TOKEN).await;
    let scanner = scanner_for(&backend);
    let mut status = scanner.subscribe();
    let (tx, rx) = mpsc::channel(8);
    let run = tokio::spawn(scanner.run(rx, CancellationToken::new()));

    tx.send(text(ACME_TOKEN)).await.unwrap();
    status.wait_for(|s| s == "Time in done!").await.unwrap();
    // Still in view: ignored.
    tx.send(text(ACME_TOKEN)).await.unwrap();
    tx.send(empty()).await.unwrap();
    tx.send(text(ACME_TOKEN)).await.unwrap();
    drop(tx);

    let report = run.await.unwrap();

    assert_eq!(report.dispatched, 2);
    assert_eq!(backend.store.list_visits().await.len(), 2);
}

#[tokio::test]
async fn unknown_code_renders_submission_failure() {
    let backend = common::spawn_backend().await;
    let scanner = scanner_for(&backend);
    let status = scanner.subscribe();
    let (tx, rx) = mpsc::channel(4);

    tx.send(text("not-a-token")).await.unwrap();
    drop(tx);

    let report = scanner.run(rx, CancellationToken::new()).await;

    assert_eq!(report.failed, 1);
    assert_eq!(*status.borrow(), messages::SUBMISSION_FAILED);
}

#[tokio::test]
async fn cancel_stops_an_idle_scanner() {
    let backend = common::spawn_backend().await;
    let scanner = scanner_for(&backend);
    let (_tx, rx) = mpsc::channel::<FrameEvent>(4);
    let cancel = CancellationToken::new();

    let run = tokio::spawn(scanner.run(rx, cancel.clone()));
    cancel.cancel();

    let report = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("scanner did not stop")
        .unwrap();
    assert_eq!(report.dispatched, 0);
}

#[tokio::test]
async fn cancel_with_report_in_flight_returns_and_report_lands_once() {
    let backend = common::spawn_backend_with_scan_delay(Duration::from_millis(500)).await;
    register(&backend, "Acme Co", ACME_TOKEN).await;
    let scanner = scanner_for(&backend);
    let (tx, rx) = mpsc::channel(8);
    let cancel = CancellationToken::new();
    let run = tokio::spawn(scanner.run(rx, cancel.clone()));

    tx.send(text(ACME_TOKEN)).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        while backend.scan_requests() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("scan report never reached the backend");

    cancel.cancel();
    let report = tokio::time::timeout(Duration::from_millis(250), run)
        .await
        .expect("scanner waited for the in-flight report")
        .unwrap();
    assert_eq!(report.dispatched, 1);
    assert_eq!(report.succeeded + report.failed, 0);

    // The detached request still completes on the backend, exactly once.
    tokio::time::timeout(Duration::from_secs(5), async {
        while backend.store.list_visits().await.is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("detached report never landed");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(backend.store.list_visits().await.len(), 1);
    assert_eq!(backend.scan_requests(), 1);
}

#[tokio::test]
async fn settle_delay_holds_outcome_before_next_code() {
    let backend = common::spawn_backend().await;
    register(&backend, "Acme Co", ACME_TOKEN).await;
    register(&backend, "Globex", GLOBEX_TOKEN).await;
    let dispatcher = Arc::new(SubmissionDispatcher::new(backend.api()));
    let scanner = Scanner::new(dispatcher, "123", Duration::from_secs(60));
    let mut status = scanner.subscribe();
    let (tx, rx) = mpsc::channel(8);
    let cancel = CancellationToken::new();
    let run = tokio::spawn(scanner.run(rx, cancel.clone()));

    tx.send(text(ACME_TOKEN)).await.unwrap();
    status.wait_for(|s| s == "Time in done!").await.unwrap();
    // Arrives while the outcome is held.
    tx.send(text(GLOBEX_TOKEN)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();

    let report = run.await.unwrap();

    assert_eq!(report.frames, 2);
    assert_eq!(report.dispatched, 1);
    assert_eq!(backend.store.list_visits().await.len(), 1);
}

// ---------------------------------------------------------------------------
// End to end
// ---------------------------------------------------------------------------

#[tokio::test]
async fn admin_registers_company_and_student_checks_in() {
    let backend = common::spawn_backend().await;

    let mut console = AdminConsole::new(backend.api(), SessionContext::new());
    console.adopt_token(ACME_TOKEN).unwrap();
    console.add_company("Acme Co").await.unwrap();
    assert_eq!(console.status(), messages::COMPANY_ADDED);

    let config = ScannerConfig {
        poll_interval: Duration::from_millis(1),
        settle_delay: Duration::ZERO,
        ..ScannerConfig::default()
    };
    let feed = format!("{ACME_TOKEN}\n{ACME_TOKEN}\n{{\"text\": \"{ACME_TOKEN}\"}}\n\n");
    let source = LineFrameSource::new(std::io::Cursor::new(feed.into_bytes()));
    let cancel = CancellationToken::new();
    let (frames, poller) = spawn_frame_poller(source, &config, cancel.clone());

    let dispatcher = Arc::new(SubmissionDispatcher::new(backend.api()));
    let scanner = Scanner::new(dispatcher, "123", config.settle_delay);
    let status = scanner.subscribe();

    let report = scanner.run(frames, cancel).await;
    poller.await.unwrap();

    assert_eq!(report.frames, 4);
    assert_eq!(report.dispatched, 1);
    assert_eq!(*status.borrow(), "Time in done!");

    let visits = backend.store.list_visits().await;
    assert_eq!(visits.len(), 1);
    assert_eq!(visits[0].student_id, "123");
    assert_eq!(visits[0].company_qr, ACME_TOKEN);
}
